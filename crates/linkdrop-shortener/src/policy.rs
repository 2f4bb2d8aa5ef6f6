use crate::error::{Result, ShortenerError};
use url::Url;

/// Longest accepted input, counted in characters after trimming.
pub const MAX_URL_LENGTH: usize = 2048;

/// Hosts starting with one of these point into a private or loopback network.
const PRIVATE_HOST_PREFIXES: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "::1",
    "10.",
    "172.16.",
    "172.17.",
    "172.18.",
    "172.19.",
    "172.20.",
    "172.21.",
    "172.22.",
    "172.23.",
    "172.24.",
    "172.25.",
    "172.26.",
    "172.27.",
    "172.28.",
    "172.29.",
    "172.30.",
    "172.31.",
    "192.168.",
];

/// First path segments routed by the HTTP layer itself. A code equal to one
/// of them would never reach the redirect.
pub const RESERVED_ALIASES: &[&str] = &["api", "uploads"];

/// Other link shorteners. Chaining through them hides the real target.
const SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "short.link",
];

/// Schemes written without `//` that must not be mistaken for a host name.
const OPAQUE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:", "file:", "mailto:"];

/// Validates and normalizes a user supplied URL.
///
/// Returns the serialized form of the parsed URL, which is what gets stored
/// and compared when checking whether a link was already shortened.
pub fn sanitize_url(input: &str) -> Result<String> {
    let cleaned: String = input.trim().chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        return Err(ShortenerError::InvalidUrl("url cannot be empty".to_string()));
    }
    if cleaned.chars().count() > MAX_URL_LENGTH {
        return Err(ShortenerError::InvalidUrl(format!(
            "url is longer than {MAX_URL_LENGTH} characters"
        )));
    }

    let candidate = if cleaned.contains("://") {
        cleaned
    } else {
        let lower = cleaned.to_ascii_lowercase();
        if OPAQUE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
            return Err(ShortenerError::InvalidUrl("protocol not allowed".to_string()));
        }
        format!("https://{cleaned}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ShortenerError::InvalidUrl(format!("{candidate}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ShortenerError::InvalidUrl(format!(
            "protocol not allowed: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase())
        .ok_or_else(|| ShortenerError::InvalidUrl("url has no host".to_string()))?;

    if PRIVATE_HOST_PREFIXES
        .iter()
        .any(|prefix| host.starts_with(prefix))
    {
        return Err(ShortenerError::BlockedUrl(format!(
            "{host} points to a private address"
        )));
    }

    if SHORTENER_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    {
        return Err(ShortenerError::BlockedUrl(format!(
            "{host} is a link shortener"
        )));
    }

    Ok(url.to_string())
}

/// Whether `alias` would be shadowed by a built-in route.
pub fn is_reserved_alias(alias: &str) -> bool {
    RESERVED_ALIASES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(alias))
}
