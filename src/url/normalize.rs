use url::Url;

/// Resolves a raw href against the page it was found on and canonicalizes it
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; skip empty and fragment-only hrefs
/// 2. Resolve against `base` (dot segments, default ports and host case are
///    handled by the URL parser)
/// 3. Reject anything that is not `http` or `https`
/// 4. Reject URLs without a host
/// 5. Remove the fragment
/// 6. Remove an empty query string (trailing `?`)
///
/// Rejections are silent: the caller simply gets `None`. The same
/// `(base, raw_href)` pair always yields the same string, so the result can be
/// used directly as a visited-set key.
///
/// # Examples
///
/// ```
/// use spindle_crawl::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("http://example.com").unwrap();
/// let url = normalize(&base, "/a#section").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a");
/// assert!(normalize(&base, "mailto:someone@example.com").is_none());
/// ```
pub fn normalize(base: &Url, raw_href: &str) -> Option<Url> {
    let href = raw_href.trim();

    // Same-page anchors and empty hrefs point back at the page itself
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base.join(href).ok()?;
    canonicalize(resolved)
}

/// Canonicalizes an already-absolute URL
///
/// Returns `None` if the scheme is not HTTP(S) or the URL has no host.
pub fn canonicalize(mut url: Url) -> Option<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Some(url)
}
