//! Cache key derivation
//!
//! Content, validator and throttle entries share one store, so each kind of
//! key carries its own prefix: `content-` for cached bodies, `etag-` for the
//! validator of a content key and `noise-` for log throttling markers.

use url::form_urlencoded;

/// Prefix for cached response bodies
pub const CONTENT_PREFIX: &str = "content-";

/// Prefix for the stored validator of a content key
pub const VALIDATOR_PREFIX: &str = "etag-";

/// Prefix for log throttling markers
pub const THROTTLE_PREFIX: &str = "noise-";

/// Canonical cache key for a URL and its query parameters
///
/// Query parameters already present on `url` are merged with `params`, then
/// sorted by name and value so equivalent query sets produce the same key.
/// The fragment is dropped since it never reaches the server.
pub fn canonicalize(url: &str, params: &[(String, String)]) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let (base, existing_query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(existing_query.as_bytes())
        .into_owned()
        .chain(params.iter().cloned())
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        return base.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{base}?{query}")
}

/// Key under which the body fetched from `url` with `params` is stored
///
/// `url` should be absolute so that content from different origins never
/// shares an entry.
pub fn content_key(url: &str, params: &[(String, String)]) -> String {
    format!("{CONTENT_PREFIX}{}", canonicalize(url, params))
}

/// Key under which the entity tag for `cache_key` is stored
pub fn validator_key(cache_key: &str) -> String {
    format!("{VALIDATOR_PREFIX}{cache_key}")
}

/// Key of the marker that gates a (message, url) log line
pub fn throttle_key(message: &str, url: &str) -> String {
    format!("{THROTTLE_PREFIX}{message}-{url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_params_are_sorted() {
        let key = canonicalize("/some/path/thing/", &params(&[("x", "y"), ("a", "b")]));
        assert_eq!(key, "/some/path/thing/?a=b&x=y");
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let one = canonicalize(
            "https://example.com/p/",
            &params(&[("b", "2"), ("a", "1"), ("a", "0")]),
        );
        let two = canonicalize(
            "https://example.com/p/",
            &params(&[("a", "0"), ("b", "2"), ("a", "1")]),
        );
        assert_eq!(one, two);
        assert_eq!(one, "https://example.com/p/?a=0&a=1&b=2");
    }

    #[test]
    fn test_existing_query_is_merged() {
        let merged = canonicalize("/p/?x=y", &params(&[("a", "b")]));
        let separate = canonicalize("/p/", &params(&[("x", "y"), ("a", "b")]));
        assert_eq!(merged, separate);
    }

    #[test]
    fn test_no_params_has_no_question_mark() {
        assert_eq!(canonicalize("/p/", &[]), "/p/");
        assert_eq!(canonicalize("/p/?", &[]), "/p/");
    }

    #[test]
    fn test_fragment_is_dropped() {
        assert_eq!(canonicalize("/p/#section", &params(&[("a", "b")])), "/p/?a=b");
    }

    #[test]
    fn test_values_are_encoded() {
        let key = canonicalize("/search/", &params(&[("q", "a b&c")]));
        assert_eq!(key, "/search/?q=a+b%26c");
    }

    #[test]
    fn test_different_requests_produce_different_keys() {
        assert_ne!(
            canonicalize("/p/", &params(&[("a", "1")])),
            canonicalize("/p/", &params(&[("a", "2")]))
        );
        assert_ne!(canonicalize("/p/", &[]), canonicalize("/q/", &[]));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let content = content_key("/p/", &params(&[("a", "b")]));
        let validator = validator_key(&content);
        let throttle = throttle_key("Resource not found.", "/p/");

        assert_eq!(content, "content-/p/?a=b");
        assert_eq!(validator, "etag-content-/p/?a=b");
        assert_eq!(throttle, "noise-Resource not found.-/p/");
        assert_ne!(content, validator);
        assert_ne!(content, throttle);
    }

    #[test]
    fn test_path_shaped_like_a_validator_key_stays_a_content_key() {
        let real = validator_key(&content_key("x/", &[]));
        let lookalike = content_key("etag-x/", &[]);

        assert_ne!(real, lookalike);
        assert!(lookalike.starts_with(CONTENT_PREFIX));
    }

    #[test]
    fn test_origins_get_separate_content_keys() {
        assert_ne!(
            content_key("http://origin-a.test/p/", &[]),
            content_key("http://origin-b.test/p/", &[])
        );
    }
}
