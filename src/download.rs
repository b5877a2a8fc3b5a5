//! Saving encoded images to the local filesystem

use crate::codec::{encode_raster, CapturedImage, ImageFormat};
use crate::{now_millis, Error, Result};
use log::info;
use std::path::{Path, PathBuf};

/// Writes images into a download directory.
#[derive(Debug, Clone)]
pub struct Downloads {
    dir: PathBuf,
}

impl Downloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `image` as `filename` (or `screenshot_<ms>.<ext>`) and return the
    /// path. Only the final component of `filename` is used.
    pub fn save(&self, image: &CapturedImage, filename: Option<&str>) -> Result<PathBuf> {
        if image.format == ImageFormat::Pdf {
            return Err(Error::UnsupportedFormat("PDF download is not available".into()));
        }
        let name = match filename.and_then(sanitize) {
            Some(name) => name,
            None => default_filename(image.format),
        };
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, &image.data)?;
        info!("downloaded {}x{} {} to {}", image.width, image.height, image.format, path.display());
        Ok(path)
    }

    /// Re-encode `image` in `format` before saving it, e.g. PNG history
    /// entries downloaded as JPEG.
    pub fn save_as(&self, image: &CapturedImage, format: ImageFormat, quality: f32, filename: Option<&str>) -> Result<PathBuf> {
        if image.format == format {
            return self.save(image, filename);
        }
        let raster = image.decode()?;
        let converted = CapturedImage {
            data: encode_raster(&raster, format, quality)?,
            width: image.width,
            height: image.height,
            format,
        };
        self.save(&converted, filename)
    }
}

pub fn default_filename(format: ImageFormat) -> String {
    format!("screenshot_{}.{}", now_millis(), format.extension())
}

fn sanitize(filename: &str) -> Option<String> {
    let name = Path::new(filename.trim()).file_name()?.to_str()?.to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png() -> CapturedImage {
        let raster = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        CapturedImage::encode(&raster, ImageFormat::Png, 1.0).unwrap()
    }

    #[test]
    fn default_names_use_format_extension() {
        let name = default_filename(ImageFormat::Jpeg);
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn filenames_cannot_escape_directory() {
        assert_eq!(sanitize("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize("shot.png").as_deref(), Some("shot.png"));
        assert_eq!(sanitize(".."), None);
        assert_eq!(sanitize("  "), None);
    }

    #[test]
    fn save_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let shot = png();
        let path = Downloads::new(dir.path()).save(&shot, Some("a/b.png")).unwrap();
        assert_eq!(path, dir.path().join("b.png"));
        assert_eq!(std::fs::read(&path).unwrap(), shot.data);
    }

    #[test]
    fn save_as_converts() {
        let dir = tempfile::tempdir().unwrap();
        let path = Downloads::new(dir.path())
            .save_as(&png(), ImageFormat::Jpeg, 0.8, None)
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let res = Downloads::new(dir.path()).save_as(&png(), ImageFormat::Pdf, 0.9, None);
        assert!(matches!(res, Err(Error::UnsupportedFormat(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
