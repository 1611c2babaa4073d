//! The referrer matching rule.
//!
//! The same rule runs in two places: here in Rust (unit-testable source of
//! truth) and as inline JavaScript on the verification page, where the
//! browser evaluates it against `document.referrer`. Keep the two in sync.

/// Does `host` belong to `allowed_domain` or one of its subdomains?
///
/// Matches exactly the allowed domain, its `www.` form, or any subdomain.
/// Substring tricks like `notexample.com` or `example.com.evil.com` do not
/// match. An empty host (direct navigation, stripped referrer) fails closed.
pub fn matches(host: &str, allowed_domain: &str) -> bool {
    if host.is_empty() || allowed_domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    let allowed = allowed_domain.to_ascii_lowercase();

    host == allowed
        || host == format!("www.{}", allowed)
        || host.ends_with(&format!(".{}", allowed))
}

#[cfg(test)]
mod tests {
    use super::matches;

    #[test]
    fn test_exact_match() {
        assert!(matches("example.com", "example.com"));
    }

    #[test]
    fn test_www_prefix() {
        assert!(matches("www.example.com", "example.com"));
    }

    #[test]
    fn test_subdomain() {
        assert!(matches("shop.example.com", "example.com"));
        assert!(matches("a.b.example.com", "example.com"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("WWW.Example.COM", "example.com"));
        assert!(matches("example.com", "EXAMPLE.COM"));
    }

    #[test]
    fn test_suffix_spoofing_rejected() {
        assert!(!matches("notexample.com", "example.com"));
        assert!(!matches("example.com.evil.com", "example.com"));
        assert!(!matches("evilexample.com", "example.com"));
    }

    #[test]
    fn test_unrelated_host_rejected() {
        assert!(!matches("other.org", "example.com"));
        assert!(!matches("example.org", "example.com"));
    }

    #[test]
    fn test_empty_host_fails_closed() {
        assert!(!matches("", "example.com"));
    }

    #[test]
    fn test_empty_allowed_fails_closed() {
        assert!(!matches("example.com", ""));
    }
}
