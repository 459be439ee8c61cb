//! URL handling module
//!
//! This module provides link normalization (resolving hrefs against the page they
//! were found on and canonicalizing the result) and seed URL validation.

mod normalize;

pub use normalize::{canonicalize, normalize};

use crate::{UrlError, UrlResult};
use url::Url;

/// Validates a seed URL given at startup
///
/// The seed must literally start with `http://` or `https://`, parse as a URL,
/// and name a host. The returned URL is already canonical.
///
/// # Examples
///
/// ```
/// use spindle_crawl::url::validate_seed;
///
/// let seed = validate_seed("http://example.com").unwrap();
/// assert_eq!(seed.as_str(), "http://example.com/");
/// assert!(validate_seed("example.com").is_err());
/// ```
pub fn validate_seed(seed: &str) -> UrlResult<Url> {
    let seed = seed.trim();

    if !(seed.starts_with("http://") || seed.starts_with("https://")) {
        return Err(UrlError::InvalidScheme(format!(
            "seed must start with http:// or https://, got '{}'",
            seed
        )));
    }

    let url = Url::parse(seed).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    canonicalize(url).ok_or(UrlError::MissingHost)
}
