//! Utility functions and helpers.

pub mod http;
pub mod console;

use sha2::{Digest, Sha256};
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Storage key for a URL: the first 128 bits of its SHA-256, as lowercase hex.
pub fn url_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..16])
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://goias.gov.br/fapeg").unwrap();
        assert_eq!(
            resolve_url(&base, "/fapeg/wp-content/edital.pdf"),
            "https://goias.gov.br/fapeg/wp-content/edital.pdf"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x.pdf"),
            "https://other.com/x.pdf"
        );
    }

    #[test]
    fn test_resolve_with_bad_base() {
        assert_eq!(resolve("not a url", "x.pdf"), None);
    }

    #[test]
    fn test_url_key_is_stable_128_bit_hex() {
        let a = url_key("https://goias.gov.br/fapeg/categoria/editais/");
        let b = url_key("https://goias.gov.br/fapeg/categoria/editais/");
        let c = url_key("https://goias.gov.br/fapeg/categoria/editais/page/2/");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  c "), "a b c");
    }
}
