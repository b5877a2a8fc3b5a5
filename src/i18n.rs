//! Message catalogs in the `_locales/<locale>/messages.json` layout

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

const EN: &str = include_str!("../_locales/en/messages.json");
const ZH_CN: &str = include_str!("../_locales/zh_CN/messages.json");

#[derive(Deserialize)]
struct Entry {
    message: String,
}

/// Localized UI strings. Lookups never fail: unknown keys resolve to the
/// key itself.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    /// Parse a `messages.json` document (`{"key": {"message": "..."}}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, Entry> = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("invalid message catalog: {}", e)))?;
        Ok(Self {
            messages: entries.into_iter().map(|(k, v)| (k, v.message)).collect(),
        })
    }

    /// Bundled catalog for `locale` (`en`, `zh_CN`; `zh` and `zh-CN` are
    /// accepted). Anything else gets English.
    pub fn builtin(locale: &str) -> Self {
        let source = match locale.replace('-', "_").as_str() {
            "zh" | "zh_CN" => ZH_CN,
            _ => EN,
        };
        Self::from_json(source).unwrap_or_default()
    }

    /// Pick a bundled catalog from `LC_ALL` / `LANG`, e.g. `zh_CN.UTF-8`.
    pub fn from_env() -> Self {
        let lang = std::env::var("LC_ALL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var("LANG").ok())
            .unwrap_or_default();
        let locale = lang.split('.').next().unwrap_or("en");
        Self::builtin(locale)
    }

    pub fn get(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Like [`Catalog::get`], replacing `$1`, `$2`, … with `subs`.
    pub fn get_with(&self, key: &str, subs: &[&str]) -> String {
        let mut message = self.get(key);
        // highest first so `$1` does not eat the prefix of `$10`
        for (i, sub) in subs.iter().enumerate().rev() {
            message = message.replace(&format!("${}", i + 1), sub);
        }
        message
    }

    /// Localized message for an error, falling back to its English text.
    pub fn error_message(&self, err: &Error) -> String {
        match err.message_key() {
            Some(key) if self.messages.contains_key(key) => self.get(key),
            _ => err.to_string(),
        }
    }
}
