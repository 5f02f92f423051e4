use serde_json::Value;
use sha2::{Digest, Sha256};

/// Builds a namespaced cache key: `<prefix>:<user_id>:<resource>:<16-hex digest>`.
///
/// The digest is computed over the JSON serialisation of `params` with keys
/// sorted recursively, so that `{a:1,b:2}` and `{b:2,a:1}` hash identically.
pub fn cache_key(prefix: &str, user_id: &str, resource: &str, params: &Value) -> String {
    let canonical = canonicalize(params);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}:{}:{}:{}", prefix, user_id, resource, &hex[..16])
}

/// Serialises `value` with object keys sorted at every nesting level, so the
/// resulting string is independent of the original field order.
fn canonicalize(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonicalize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonicalize).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

/// Matches `text` against a shell-style glob where `*` matches any run of
/// non-`:` characters and `?` matches exactly one character. `*` stops at
/// the `:` key separator so a pattern like `user:1:memory:*` never spills
/// into the next segment.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    matches(&p, &t)
}

fn matches(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            matches(&p[1..], t) || (t.first().map_or(false, |&c| c != ':') && matches(p, &t[1..]))
        }
        Some('?') => !t.is_empty() && matches(&p[1..], &t[1..]),
        Some(c) => t.first().map_or(false, |tc| tc == c) && matches(&p[1..], &t[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_stable_under_field_reordering() {
        let a = cache_key("cache", "u1", "memory", &json!({"a": 1, "b": 2}));
        let b = cache_key("cache", "u1", "memory", &json!({"b": 2, "a": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_with_any_input() {
        let base = cache_key("cache", "u1", "memory", &json!({"a": 1, "b": 2}));
        assert_ne!(base, cache_key("cache", "u2", "memory", &json!({"a": 1, "b": 2})));
        assert_ne!(base, cache_key("cache", "u1", "other", &json!({"a": 1, "b": 2})));
        assert_ne!(base, cache_key("cache", "u1", "memory", &json!({"a": 1, "b": 3})));
    }

    #[test]
    fn glob_matches_star_and_question_mark() {
        assert!(glob_match("user:*:memory", "user:42:memory"));
        assert!(glob_match("user:?:memory", "user:4:memory"));
        assert!(!glob_match("user:?:memory", "user:42:memory"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn star_does_not_cross_the_segment_separator() {
        assert!(glob_match("user:1:memory:*", "user:1:memory:aa"));
        assert!(!glob_match("user:1:memory:*", "user:1:memory:aa:extra"));
    }
}
