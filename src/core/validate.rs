use std::net::IpAddr;

use url::Url;

use crate::core::config::{DEFAULT_ARTICLE_COUNT, MAX_COUNT, MAX_RECENT_DAYS, MAX_WINDOW_DAYS};
use crate::core::error::{NexusError, Result};

const MAX_DOMAIN_LEN: usize = 253;
const MIN_DOMAIN_LEN: usize = 3;
const MAX_URL_LEN: usize = 2_000;
const MAX_TERM_LEN: usize = 100;

/// Validate and normalize a user-supplied domain.
///
/// Accepts `[a-z0-9.-]` between 3 and 253 chars with at least one interior
/// dot; rejects IP literals. A leading `www.` is stripped before validation.
pub fn validate_domain(raw: &str) -> Result<String> {
    let domain = raw.trim().to_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain).to_string();

    if domain.len() < MIN_DOMAIN_LEN || domain.len() > MAX_DOMAIN_LEN {
        return Err(NexusError::BadInput(format!(
            "domain must be {}-{} characters",
            MIN_DOMAIN_LEN, MAX_DOMAIN_LEN
        )));
    }
    if !domain.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(NexusError::BadInput(format!("domain '{}' has invalid characters", domain)));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(NexusError::BadInput(format!("domain '{}' is malformed", domain)));
    }
    if domain.contains("..") {
        return Err(NexusError::BadInput(format!("domain '{}' has an empty label", domain)));
    }
    if domain.parse::<IpAddr>().is_ok() {
        return Err(NexusError::BadInput("IP literals are not accepted as domains".into()));
    }

    Ok(domain)
}

/// Validate an absolute http(s) URL. Rejects non-web schemes, oversized
/// URLs, and private or loopback IP hosts.
pub fn validate_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.len() > MAX_URL_LEN {
        return Err(NexusError::BadInput(format!("URL longer than {} characters", MAX_URL_LEN)));
    }

    let url = Url::parse(raw).map_err(|e| NexusError::BadInput(format!("invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(NexusError::BadInput(format!("unsupported URL scheme '{}'", url.scheme())));
    }
    let Some(host) = url.host_str() else {
        return Err(NexusError::BadInput("URL has no host".into()));
    };

    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        let private = match ip {
            IpAddr::V4(v4) => {
                v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
            }
            IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
        if private {
            return Err(NexusError::BadInput("private or loopback hosts are not allowed".into()));
        }
    }

    Ok(url)
}

/// Canonical form of an article URL: lower-cased scheme and host (done by the
/// URL parser), `utm_*` query params and the fragment dropped, a single
/// trailing slash stripped. Path case is preserved. Unparsable input is
/// returned trimmed, unchanged.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("utm_"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        if !kept.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in kept {
                qp.append_pair(&k, &v);
            }
        }
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }

    let mut s = url.to_string();
    if url.query().is_none() && s.ends_with('/') {
        s.pop();
    }
    s
}

/// Clamp the requested article count. Out-of-range values are rejected, not
/// silently clamped.
pub fn validate_count(count: Option<u64>) -> Result<usize> {
    match count {
        None => Ok(DEFAULT_ARTICLE_COUNT),
        Some(n) if n >= 1 && n <= MAX_COUNT => Ok(n as usize),
        Some(n) => {
            Err(NexusError::BadInput(format!("count must be in [1,{}], got {}", MAX_COUNT, n)))
        }
    }
}

/// Resolve the date window. Callers that do not specify one get the recent
/// cap of [`MAX_RECENT_DAYS`]; explicit values may go up to a year.
pub fn validate_last_n_days(days: Option<i64>) -> Result<i64> {
    match days {
        None => Ok(MAX_RECENT_DAYS),
        Some(d) if (1..=MAX_WINDOW_DAYS).contains(&d) => Ok(d),
        Some(d) => Err(NexusError::BadInput(format!(
            "lastNDays must be in [1,{}], got {}",
            MAX_WINDOW_DAYS, d
        ))),
    }
}

/// Sanitize a topic or location term: trim, lower-case, bound the length and
/// HTML-escape. Empty input collapses to `None`.
pub fn sanitize_term(raw: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let term = raw.trim().to_lowercase();
    if term.is_empty() {
        return Ok(None);
    }
    if term.chars().count() > MAX_TERM_LEN {
        return Err(NexusError::BadInput(format!(
            "filter terms are limited to {} characters",
            MAX_TERM_LEN
        )));
    }
    Ok(Some(escape_html(&term)))
}

/// Minimal HTML-entity escaping for text that may be echoed back to clients.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_accepts_and_normalizes() {
        assert_eq!(validate_domain("WWW.Example.COM").unwrap(), "example.com");
        assert_eq!(validate_domain("sub.news-site.co.uk").unwrap(), "sub.news-site.co.uk");
    }

    #[test]
    fn domain_rejects_malformed() {
        assert!(validate_domain("nodots").is_err());
        assert!(validate_domain(".leading.dot").is_err());
        assert!(validate_domain("trailing.dot.").is_err());
        assert!(validate_domain("bad..label.com").is_err());
        assert!(validate_domain("ex ample.com").is_err());
        assert!(validate_domain("127.0.0.1").is_err());
        assert!(validate_domain("ab").is_err());
    }

    #[test]
    fn url_scheme_and_host_rules() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("http://127.0.0.1/x").is_err());
        assert!(validate_url("http://10.0.0.8/x").is_err());
        assert!(validate_url(&format!("https://example.com/{}", "a".repeat(2_000))).is_err());
    }

    #[test]
    fn canonical_url_strips_noise() {
        assert_eq!(
            canonical_url("HTTPS://Example.COM/Path/?utm_source=x&utm_medium=y#frag"),
            "https://example.com/Path"
        );
        assert_eq!(
            canonical_url("https://example.com/a?id=1&utm_campaign=z"),
            "https://example.com/a?id=1"
        );
        assert_eq!(canonical_url("https://example.com/"), "https://example.com");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = canonical_url("https://Example.com/News/story/?utm_source=t#x");
        assert_eq!(canonical_url(&once), once);
    }

    #[test]
    fn path_case_is_preserved() {
        assert_eq!(canonical_url("https://example.com/News/Item"), "https://example.com/News/Item");
    }

    #[test]
    fn count_bounds() {
        assert_eq!(validate_count(None).unwrap(), 10);
        assert_eq!(validate_count(Some(100)).unwrap(), 100);
        assert!(validate_count(Some(0)).is_err());
        assert!(validate_count(Some(101)).is_err());
    }

    #[test]
    fn days_default_to_recent_cap() {
        assert_eq!(validate_last_n_days(None).unwrap(), 15);
        assert_eq!(validate_last_n_days(Some(365)).unwrap(), 365);
        assert!(validate_last_n_days(Some(0)).is_err());
        assert!(validate_last_n_days(Some(366)).is_err());
    }

    #[test]
    fn terms_are_sanitized() {
        assert_eq!(sanitize_term(Some("  AI  ")).unwrap().unwrap(), "ai");
        assert_eq!(sanitize_term(Some("<b>Tech</b>")).unwrap().unwrap(), "&lt;b&gt;tech&lt;/b&gt;");
        assert_eq!(sanitize_term(Some("   ")).unwrap(), None);
        assert!(sanitize_term(Some(&"x".repeat(101))).is_err());
    }
}
