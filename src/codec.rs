//! Image formats, encoding/decoding and `data:` URLs

use crate::{Error, Result};
use base64::Engine as Base64Engine;
use image::{ColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Output formats a capture can be saved in.
///
/// `Pdf` is accepted in settings so existing configurations keep loading,
/// but every encode path rejects it with [`Error::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Pdf => "application/pdf",
        }
    }

    fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Pdf => "pdf",
        })
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "pdf" => Ok(ImageFormat::Pdf),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// An encoded image together with its pixel dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl CapturedImage {
    /// Encode an RGBA raster. `quality` applies to JPEG only.
    pub fn encode(raster: &RgbaImage, format: ImageFormat, quality: f32) -> Result<Self> {
        let data = encode_raster(raster, format, quality)?;
        Ok(Self {
            data,
            width: raster.width(),
            height: raster.height(),
            format,
        })
    }

    pub fn decode(&self) -> Result<RgbaImage> {
        decode_raster(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }

    /// Parse a `data:` URL produced by [`CapturedImage::to_data_url`]. The
    /// dimensions are read from the decoded image.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (format, data) = parse_data_url(url)?;
        let raster = decode_raster(&data)?;
        Ok(Self {
            data,
            width: raster.width(),
            height: raster.height(),
            format,
        })
    }

    /// Hex SHA-256 of the encoded bytes
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.data))
    }
}

/// Encode `raster` in `format`.
pub fn encode_raster(raster: &RgbaImage, format: ImageFormat, quality: f32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Png => {
            image::codecs::png::PngEncoder::new(&mut out)
                .write_image(raster.as_raw(), raster.width(), raster.height(), ColorType::Rgba8)
                .map_err(|e| Error::EncodeError(format!("PNG: {}", e)))?;
        }
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = image::DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality))
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
                .map_err(|e| Error::EncodeError(format!("JPEG: {}", e)))?;
        }
        ImageFormat::Pdf => {
            return Err(Error::UnsupportedFormat(
                "PDF export is not available; choose png or jpeg".into(),
            ))
        }
    }
    Ok(out)
}

/// Decode any supported encoded image into RGBA.
pub fn decode_raster(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::DecodeError(e.to_string()))
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

fn parse_data_url(url: &str) -> Result<(ImageFormat, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::DecodeError("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::DecodeError("data URL has no payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| Error::DecodeError("data URL is not base64 encoded".into()))?;
    let format = ImageFormat::from_mime_type(mime)
        .ok_or_else(|| Error::UnsupportedFormat(mime.to_string()))?;
    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::DecodeError(format!("base64: {}", e)))?;
    Ok((format, data))
}
