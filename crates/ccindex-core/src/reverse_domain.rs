//! Reverse-domain codec (C1): `host_rev` computation and prefix-match helpers.
//!
//! `rev("www.example.co.uk") == "uk,co,example"`. Reversing a host's labels
//! and joining with `,` turns "all pages under example.com" into a
//! lexicographic range scan over a single sorted column, which is what makes
//! the row-group indexer (C6) and resolver (C8) cheap.

/// Strip a single leading `www.` label and lowercase. Does not apply
/// Public Suffix List rules — CDX shards are not PSL-normalized, and
/// matching semantics must stay reversible against the SURT keys already
/// present in the source data.
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Compute the reverse-domain key for an already-normalized host.
///
/// Splits on `.`, drops empty labels (leading/trailing/doubled dots),
/// lowercases, and joins the labels in reverse order with `,`.
pub fn rev(host: &str) -> String {
    let mut labels: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
    labels.reverse();
    labels.join(",")
}

/// Build the SQL `LIKE` pattern matching every `host_rev` for which `prefix`
/// is a domain prefix (`prefix` itself plus every subdomain).
///
/// Combined with an equality check this yields the contiguous range
/// `host_rev = prefix OR host_rev LIKE host_rev_like_pattern(prefix)`.
pub fn host_rev_like_pattern(prefix: &str) -> String {
    format!("{prefix},%")
}

/// Extract and normalize the host from a URL string, returning the
/// reverse-domain key. Returns `None` if no host can be parsed out (the
/// record then has no `host`/`host_rev`, per the data model invariant).
pub fn host_rev_from_url(url: &str) -> Option<String> {
    let host = extract_host(url)?;
    let normalized = normalize_host(&host);
    if normalized.is_empty() {
        return None;
    }
    Some(rev(&normalized))
}

/// Best-effort host extraction from a URL without a full URL-parsing
/// dependency: strips a scheme, then takes everything up to the next `/`,
/// `?`, or `#`, then strips userinfo and a port.
fn extract_host(url: &str) -> Option<String> {
    let without_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };

    let end = without_scheme
        .find(['/', '?', '#'])
        .unwrap_or(without_scheme.len());
    let authority = &without_scheme[..end];

    let host_and_port = match authority.rfind('@') {
        Some(idx) => &authority[idx + 1..],
        None => authority,
    };

    let host = if host_and_port.starts_with('[') {
        // IPv6 literal: keep the bracketed form, drop any trailing :port.
        match host_and_port.find(']') {
            Some(idx) => &host_and_port[..=idx],
            None => host_and_port,
        }
    } else {
        match host_and_port.rfind(':') {
            Some(idx) => &host_and_port[..idx],
            None => host_and_port,
        }
    };

    if host.is_empty() { None } else { Some(host.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rev_simple_domain() {
        assert_eq!(rev("example.com"), "com,example");
    }

    #[test]
    fn rev_multi_label() {
        assert_eq!(rev("www.example.co.uk"), "uk,co,www,example");
    }

    #[test]
    fn rev_single_label() {
        assert_eq!(rev("localhost"), "localhost");
    }

    #[test]
    fn rev_drops_empty_labels() {
        assert_eq!(rev("example..com"), "com,example");
        assert_eq!(rev(".example.com."), "com,example");
    }

    #[test]
    fn normalize_host_strips_www_and_lowercases() {
        assert_eq!(normalize_host("WWW.Example.COM"), "example.com");
    }

    #[test]
    fn normalize_host_no_www_unchanged_but_lowered() {
        assert_eq!(normalize_host("Example.COM"), "example.com");
    }

    #[test]
    fn normalize_host_only_strips_one_leading_www() {
        // "www.www.example.com" -> only the first "www." label is stripped
        assert_eq!(normalize_host("www.www.example.com"), "www.example.com");
    }

    #[test]
    fn rev_rev_roundtrip() {
        let host = "a,b,c".to_string();
        assert_eq!(rev(&rev(&host)).replace(',', ","), host);
    }

    #[test]
    fn host_rev_like_pattern_shape() {
        assert_eq!(host_rev_like_pattern("com,example"), "com,example,%");
    }

    #[test]
    fn host_rev_from_url_strips_www() {
        // S1 scenario: https://www.example.com/q -> host_rev "com,example"
        assert_eq!(
            host_rev_from_url("https://www.example.com/q").as_deref(),
            Some("com,example")
        );
    }

    #[test]
    fn host_rev_from_url_subdomain() {
        // S1 scenario: https://a.example.com/p -> host_rev "com,example,a"
        assert_eq!(
            host_rev_from_url("https://a.example.com/p").as_deref(),
            Some("com,example,a")
        );
    }

    #[test]
    fn host_rev_from_url_no_scheme() {
        assert_eq!(
            host_rev_from_url("example.com/page").as_deref(),
            Some("com,example")
        );
    }

    #[test]
    fn host_rev_from_url_with_port() {
        assert_eq!(
            host_rev_from_url("http://example.com:8080/x").as_deref(),
            Some("com,example")
        );
    }

    #[test]
    fn host_rev_from_url_empty_host() {
        assert_eq!(host_rev_from_url("http:///no-host"), None);
    }
}
