//! Privileged page schemes that are never captured

use crate::{Error, Result};

/// URL prefixes of browser-internal pages
pub const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "edge://",
    "about:",
];

/// Whether `url` points at a browser-internal page. Scheme matching is
/// case-insensitive; surrounding whitespace is ignored.
pub fn is_restricted_url(url: &str) -> bool {
    let url = url.trim();
    RESTRICTED_PREFIXES.iter().any(|prefix| {
        url.len() >= prefix.len()
            && url.is_char_boundary(prefix.len())
            && url[..prefix.len()].eq_ignore_ascii_case(prefix)
    })
}

/// Fail with [`Error::PageNotAccessible`] for restricted URLs.
pub fn ensure_capturable(url: &str) -> Result<()> {
    if is_restricted_url(url) {
        return Err(Error::PageNotAccessible(url.to_string()));
    }
    Ok(())
}
