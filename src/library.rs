//! Screenshot history and persisted settings on top of a [`KeyValueStore`]

use crate::codec::{CapturedImage, ImageFormat};
use crate::i18n::Catalog;
use crate::service::CaptureOutcome;
use crate::store::KeyValueStore;
use crate::{now_millis, Error, Result};
use chrono::{Local, TimeZone};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of every key holding a screenshot
pub const CAPTURE_KEY_PREFIX: &str = "canvas_";

/// Key holding [`Settings`]
pub const SETTINGS_KEY: &str = "settings";

/// A capture as it is kept in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRecord {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub url: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: u64,
}

impl ScreenshotRecord {
    pub fn image(&self) -> Result<CapturedImage> {
        CapturedImage::from_data_url(&self.data_url)
    }
}

/// A listed screenshot with its key
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotEntry {
    pub id: String,
    pub record: ScreenshotRecord,
}

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default = "default_quality")]
    pub quality: f32,
    #[serde(default)]
    pub auto_download: bool,
}

fn default_quality() -> f32 {
    0.9
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: default_quality(),
            auto_download: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(Error::ConfigError(format!(
                "quality must be within 0.0..=1.0, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// A fresh correlation id of the form `canvas_<ms>_<seq>`. The sequence
/// keeps ids unique within a process even inside the same millisecond.
pub fn new_capture_id() -> String {
    format!(
        "{}{}_{}",
        CAPTURE_KEY_PREFIX,
        now_millis(),
        ID_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

pub struct ScreenshotLibrary<S> {
    store: S,
}

impl<S: KeyValueStore> ScreenshotLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persist a finished capture under its correlation id.
    pub fn save_capture(&mut self, outcome: &CaptureOutcome) -> Result<ScreenshotRecord> {
        let record = ScreenshotRecord {
            data_url: outcome.image.to_data_url(),
            width: outcome.image.width,
            height: outcome.image.height,
            url: Some(outcome.url.clone()),
            timestamp: outcome.timestamp,
        };
        self.put(&outcome.id, &record)?;
        info!("saved {} ({}x{}) from {}", outcome.id, record.width, record.height, outcome.url);
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<ScreenshotRecord> {
        let value = self
            .store
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Replace the image of an existing screenshot, e.g. with editor output,
    /// and bump its timestamp.
    pub fn update_image(&mut self, id: &str, image: &CapturedImage) -> Result<ScreenshotRecord> {
        let mut record = self.get(id)?;
        record.data_url = image.to_data_url();
        record.width = image.width;
        record.height = image.height;
        record.timestamp = now_millis();
        self.put(id, &record)?;
        Ok(record)
    }

    /// Screenshots newest first. Keys without the capture prefix and values
    /// that are not screenshot records are skipped.
    pub fn list(&self) -> Result<Vec<ScreenshotEntry>> {
        let mut entries: Vec<ScreenshotEntry> = self
            .store
            .get_all()?
            .into_iter()
            .filter(|(key, _)| key.starts_with(CAPTURE_KEY_PREFIX))
            .filter_map(|(id, value)| {
                serde_json::from_value::<ScreenshotRecord>(value)
                    .ok()
                    .filter(|r| !r.data_url.is_empty())
                    .map(|record| ScreenshotEntry { id, record })
            })
            .collect();
        entries.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        Ok(entries)
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        if self.store.get(id)?.is_none() {
            return Err(Error::NotFound(id.to_string()));
        }
        self.store.remove(&[id])
    }

    /// Remove every screenshot, keeping settings. Returns how many were removed.
    pub fn clear_all(&mut self) -> Result<usize> {
        let keys: Vec<String> = self
            .store
            .get_all()?
            .into_keys()
            .filter(|key| key.starts_with(CAPTURE_KEY_PREFIX))
            .collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.store.remove(&refs)?;
        Ok(keys.len())
    }

    pub fn settings(&self) -> Result<Settings> {
        match self.store.get(SETTINGS_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Settings::default()),
        }
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        self.store.set(SETTINGS_KEY, serde_json::to_value(settings)?)
    }

    pub fn reset_settings(&mut self) -> Result<Settings> {
        let settings = Settings::default();
        self.save_settings(&settings)?;
        Ok(settings)
    }

    fn put(&mut self, id: &str, record: &ScreenshotRecord) -> Result<()> {
        self.store.set(id, serde_json::to_value(record)?)
    }
}

/// Human-readable age of a timestamp: "just now", minutes, hours, days,
/// then the local calendar date once it is a week old.
pub fn describe_age(catalog: &Catalog, timestamp: u64, now: u64) -> String {
    const MINUTE: u64 = 60_000;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if timestamp == 0 {
        return catalog.get("unknownTime");
    }
    let diff = now.saturating_sub(timestamp);
    if diff < MINUTE {
        catalog.get("justNow")
    } else if diff < HOUR {
        catalog.get_with("minutesAgo", &[(diff / MINUTE).to_string().as_str()])
    } else if diff < DAY {
        catalog.get_with("hoursAgo", &[(diff / HOUR).to_string().as_str()])
    } else if diff < 7 * DAY {
        catalog.get_with("daysAgo", &[(diff / DAY).to_string().as_str()])
    } else {
        calendar_date(&Local, timestamp).unwrap_or_else(|| catalog.get("unknownTime"))
    }
}

/// `YYYY-MM-DD` of a millisecond timestamp in `tz`.
fn calendar_date<Tz: TimeZone>(tz: &Tz, timestamp: u64) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let millis = i64::try_from(timestamp).ok()?;
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn settings_default_when_missing() {
        let lib = ScreenshotLibrary::new(MemoryStore::new());
        assert_eq!(lib.settings().unwrap(), Settings::default());
    }

    #[test]
    fn settings_use_camel_case() {
        let mut lib = ScreenshotLibrary::new(MemoryStore::new());
        lib.save_settings(&Settings {
            format: ImageFormat::Jpeg,
            quality: 0.5,
            auto_download: true,
        })
        .unwrap();
        assert_eq!(
            lib.store().get(SETTINGS_KEY).unwrap(),
            Some(json!({"format": "jpeg", "quality": 0.5, "autoDownload": true}))
        );
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let mut lib = ScreenshotLibrary::new(MemoryStore::new());
        let bad = Settings {
            quality: 2.0,
            ..Default::default()
        };
        assert!(matches!(lib.save_settings(&bad), Err(Error::ConfigError(_))));
    }

    #[test]
    fn capture_ids_are_unique() {
        let a = new_capture_id();
        let b = new_capture_id();
        assert!(a.starts_with(CAPTURE_KEY_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn ages() {
        let c = Catalog::builtin("en");
        let now = 1_700_000_000_000;
        assert_eq!(describe_age(&c, now - 5_000, now), "just now");
        assert_eq!(describe_age(&c, now - 5 * 60_000, now), "5 minutes ago");
        assert_eq!(describe_age(&c, now - 3 * 3_600_000, now), "3 hours ago");
        assert_eq!(describe_age(&c, now - 2 * 86_400_000, now), "2 days ago");
        assert_eq!(describe_age(&c, 0, now), "Unknown");
        assert_eq!(
            describe_age(&c, now, now + 30 * 86_400_000),
            calendar_date(&Local, now).unwrap()
        );
    }

    #[test]
    fn old_captures_show_the_date_in_the_given_zone() {
        // 2023-11-14T22:13:20Z
        let ts = 1_700_000_000_000;
        assert_eq!(calendar_date(&chrono::Utc, ts).as_deref(), Some("2023-11-14"));
        let shanghai = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(calendar_date(&shanghai, ts).as_deref(), Some("2023-11-15"));
        let new_york = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(calendar_date(&new_york, ts).as_deref(), Some("2023-11-14"));
        assert_eq!(calendar_date(&chrono::Utc, u64::MAX), None);
    }
}
