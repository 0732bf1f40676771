//! Content keys for unpacked options.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Key for one unpack: SHA-256 of the JCS (RFC 8785) form of the
/// `[previous, raw]` pair.
///
/// Returns `None` when the pair cannot be canonicalized; callers then skip
/// the cache.
pub fn unpack_key(previous: &Map<String, Value>, raw: &Map<String, Value>) -> Option<String> {
    let pair = (previous, raw);
    let jcs_bytes = serde_json_canonicalizer::to_vec(&pair).ok()?;

    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_key_ignores_member_order() {
        let previous = map(json!({"title": "", "pager": {"type": "full"}}));
        let a = map(json!({"title": "All", "css_class": "x"}));
        let b = map(json!({"css_class": "x", "title": "All"}));

        let key = unpack_key(&previous, &a).unwrap();
        assert_eq!(key.len(), 64);
        assert_eq!(key, unpack_key(&previous, &b).unwrap());
    }

    #[test]
    fn test_key_depends_on_both_sides() {
        let previous = map(json!({"title": ""}));
        let other_previous = map(json!({"title": "x"}));
        let raw = map(json!({"title": "All"}));

        assert_ne!(unpack_key(&previous, &raw), unpack_key(&other_previous, &raw));
        assert_ne!(unpack_key(&previous, &raw), unpack_key(&raw, &previous));
    }
}
