//! URL generalization (spec §4.6): replaces numeric IDs, UUIDs, Mongo
//! ObjectIds and long base62 segments in a URL path with named capture
//! groups, producing a pattern other URLs can match against. Pure and
//! idempotent: generalizing an already-generalized URL is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;

const UUID_RE: &str = r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";
const OBJECT_ID_RE: &str = r"(?i)^[0-9a-f]{24}$";
const NUMERIC_RE: &str = r"^\d+$";
const BASE62_RE: &str = r"^[0-9A-Za-z]{20,}$";

struct Matchers {
    uuid: Regex,
    object_id: Regex,
    numeric: Regex,
    base62: Regex,
}

fn matchers() -> &'static Matchers {
    static MATCHERS: std::sync::OnceLock<Matchers> = std::sync::OnceLock::new();
    MATCHERS.get_or_init(|| Matchers {
        uuid: Regex::new(UUID_RE).unwrap(),
        object_id: Regex::new(OBJECT_ID_RE).unwrap(),
        numeric: Regex::new(NUMERIC_RE).unwrap(),
        base62: Regex::new(BASE62_RE).unwrap(),
    })
}

/// Generalize one path segment, returning the replacement token if it looks
/// like an identifier, or the original segment otherwise.
fn generalize_segment(segment: &str, index: usize) -> String {
    if segment.is_empty() || segment.starts_with('{') {
        return segment.to_string();
    }
    let m = matchers();
    if m.uuid.is_match(segment) {
        format!("{{uuid_{index}}}")
    } else if m.object_id.is_match(segment) {
        format!("{{object_id_{index}}}")
    } else if m.numeric.is_match(segment) {
        format!("{{id_{index}}}")
    } else if m.base62.is_match(segment) {
        format!("{{token_{index}}}")
    } else {
        segment.to_string()
    }
}

/// Generalizes a URL path into a pattern, e.g. `/users/123/orders/{orderId}`.
/// Idempotent: running it twice on its own output yields the same string.
pub fn generalize_path(path: &str) -> String {
    path.split('/')
        .enumerate()
        .map(|(i, segment)| generalize_segment(segment, i))
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds a regex that matches any concrete URL produced by `pattern`, with
/// named capture groups for every placeholder.
fn pattern_to_regex_source(pattern: &str) -> String {
    let mut out = String::from("^");
    for (i, segment) in pattern.split('/').enumerate() {
        if i > 0 {
            out.push('/');
        }
        if segment.starts_with('{') && segment.ends_with('}') {
            let name = &segment[1..segment.len() - 1];
            let safe_name: String = name
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
                .collect();
            out.push_str(&format!(r"(?P<{safe_name}>[^/]+)"));
        } else {
            out.push_str(&regex::escape(segment));
        }
    }
    out.push('$');
    out
}

/// Small bounded LRU cache of compiled pattern regexes. No crate in the
/// corpus provides this, so it's hand-rolled rather than invented as a
/// stand-in for one.
pub struct PatternRegexCache {
    capacity: usize,
    inner: Mutex<LruInner>,
}

struct LruInner {
    map: HashMap<String, Regex>,
    order: Vec<String>,
}

impl PatternRegexCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LruInner {
                map: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    pub fn get_or_compile(&self, pattern: &str) -> Regex {
        let mut inner = self.inner.lock().expect("pattern regex cache lock poisoned");
        if let Some(existing) = inner.map.get(pattern) {
            let existing = existing.clone();
            touch(&mut inner.order, pattern);
            return existing;
        }

        let compiled = Regex::new(&pattern_to_regex_source(pattern))
            .unwrap_or_else(|_| Regex::new(&regex::escape(pattern)).unwrap());

        if inner.order.len() >= self.capacity {
            if let Some(evicted) = inner.order.first().cloned() {
                inner.order.remove(0);
                inner.map.remove(&evicted);
            }
        }
        inner.order.push(pattern.to_string());
        inner.map.insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

fn touch(order: &mut Vec<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        let k = order.remove(pos);
        order.push(k);
    }
}

/// Matches a concrete path against a generalized pattern, returning the
/// captured parameters if it matches.
pub fn match_path(cache: &PatternRegexCache, pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let re = cache.get_or_compile(pattern);
    let captures = re.captures(path)?;
    Some(
        re.capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generalizes_numeric_id() {
        assert_eq!(generalize_path("/users/123"), "/users/{id_2}");
    }

    #[test]
    fn generalizes_uuid() {
        let path = "/orders/550e8400-e29b-41d4-a716-446655440000";
        let generalized = generalize_path(path);
        assert!(generalized.contains("{uuid_2}"));
    }

    #[test]
    fn generalizes_object_id() {
        assert_eq!(generalize_path("/items/5f8d0d55b54764421b7156c3"), "/items/{object_id_2}");
    }

    #[test]
    fn generalization_is_idempotent() {
        let once = generalize_path("/users/123/orders/456");
        let twice = generalize_path(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_non_identifier_segments_alone() {
        assert_eq!(generalize_path("/api/v1/users"), "/api/v1/users");
    }

    #[test]
    fn generalize_then_match_succeeds_with_captures() {
        let pattern = generalize_path("/users/123");
        let cache = PatternRegexCache::new(10);
        let captures = match_path(&cache, &pattern, "/users/456").unwrap();
        assert_eq!(captures.get("id_2").map(String::as_str), Some("456"));
    }

    #[test]
    fn cache_evicts_oldest_beyond_capacity() {
        let cache = PatternRegexCache::new(2);
        cache.get_or_compile("/a/{id_1}");
        cache.get_or_compile("/b/{id_1}");
        cache.get_or_compile("/c/{id_1}");
        let inner = cache.inner.lock().unwrap();
        assert_eq!(inner.map.len(), 2);
        assert!(!inner.map.contains_key("/a/{id_1}"));
    }
}
