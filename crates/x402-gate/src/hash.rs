//! Canonical request hashing.
//!
//! The request hash is a pure function of (method, path, query, body):
//! no clocks, no randomness, no headers. JSON bodies are hashed as raw
//! bytes, so re-ordering keys inside a body changes the hash while
//! re-ordering query parameters does not.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

/// URI-component encode set: everything except unreserved characters.
/// Space encodes as `%20`, never `+`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Canonicalize a raw query string (no leading `?`).
///
/// Pairs are decoded, stably sorted by key, re-encoded as URI components,
/// and joined with `&`. Empty input yields the empty string.
pub fn canonical_query(raw_query: &str) -> String {
    if raw_query.is_empty() {
        return String::new();
    }

    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw_query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, URI_COMPONENT),
                utf8_percent_encode(value, URI_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// SHA-256 over `METHOD "\n" PATH "\n" CANONICAL_QUERY "\n" BODY`,
/// lowercase hex. The three separators are always present, even for an
/// empty body.
pub fn request_hash(method: &str, path: &str, raw_query: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(path.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_query(raw_query).as_bytes());
    hasher.update(b"\n");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = request_hash("GET", "/weather", "city=London", b"");
        let b = request_hash("GET", "/weather", "city=London", b"");
        assert_eq!(a, b);
    }

    #[test]
    fn test_output_shape() {
        let hash = request_hash("POST", "/tools/run", "a=1", b"{}");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_layout_matches_concatenation() {
        let expected = hex::encode(Sha256::digest(b"GET\n/weather\ncity=London\n"));
        assert_eq!(request_hash("GET", "/weather", "city=London", b""), expected);
        assert_eq!(request_hash("get", "/weather", "city=London", b""), expected);
    }

    #[test]
    fn test_query_order_independent() {
        assert_eq!(
            request_hash("GET", "/p", "a=1&b=2", b""),
            request_hash("GET", "/p", "b=2&a=1", b"")
        );
    }

    #[test]
    fn test_sensitivity() {
        let base = request_hash("GET", "/p", "a=1", b"x");
        assert_ne!(base, request_hash("POST", "/p", "a=1", b"x"));
        assert_ne!(base, request_hash("GET", "/q", "a=1", b"x"));
        assert_ne!(base, request_hash("GET", "/p", "a=2", b"x"));
        assert_ne!(base, request_hash("GET", "/p", "a=1", b"y"));
    }

    #[test]
    fn test_canonical_query_sorts_and_encodes() {
        assert_eq!(canonical_query(""), "");
        assert_eq!(canonical_query("b=2&a=1"), "a=1&b=2");
        // Plus-encoded and percent-encoded spaces normalize to %20.
        assert_eq!(canonical_query("q=a+b"), "q=a%20b");
        assert_eq!(canonical_query("q=a%20b"), "q=a%20b");
        assert_eq!(canonical_query("k%26=v%3D"), "k%26=v%3D");
    }

    #[test]
    fn test_canonical_query_stable_for_duplicate_keys() {
        assert_eq!(canonical_query("a=2&b=1&a=1"), "a=2&a=1&b=1");
    }
}
