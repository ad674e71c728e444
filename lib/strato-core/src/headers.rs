//! Header map and header-source types.

use std::collections::BTreeMap;
use std::sync::Arc;

/// An ordered header map with case-insensitive names.
///
/// Names are lowercased on insertion so that cascade merging and the
/// empty-value drop rule behave the same regardless of caller spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder-style [`Self::insert`].
    #[must_use]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if a header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a header by name.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Overlays `other` onto `self`; `other` wins on name collision.
    pub fn extend(&mut self, other: Headers) {
        self.entries.extend(other.entries);
    }

    /// Merges two maps, with `overrides` winning on collision.
    #[must_use]
    pub fn merged(base: &Headers, overrides: &Headers) -> Headers {
        let mut merged = base.clone();
        merged.extend(overrides.clone());
        merged
    }

    /// Drops every header whose value is the empty string.
    ///
    /// Empty-valued headers are configuration tombstones: an interceptor or
    /// override blanks a value to prevent it from ever reaching the wire.
    pub fn drop_empty(&mut self) {
        self.entries.retain(|_, value| !value.is_empty());
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A middleware-declared header override: either a static map applied on
/// top of the headers built so far, or a function receiving them and
/// returning the final set (total replacement, which is how callers opt out of the
/// defaults).
#[derive(Clone)]
pub enum HeaderSource {
    /// Static headers overlaid onto the headers built so far.
    Map(Headers),
    /// Function receiving the headers built so far; its return value
    /// replaces them entirely.
    Fn(Arc<dyn Fn(Headers) -> Headers + Send + Sync>),
}

impl HeaderSource {
    /// Wraps a header-transforming function.
    pub fn from_fn(f: impl Fn(Headers) -> Headers + Send + Sync + 'static) -> Self {
        Self::Fn(Arc::new(f))
    }

    /// Applies this source to the headers built so far.
    #[must_use]
    pub fn apply(&self, mut built: Headers) -> Headers {
        match self {
            Self::Map(overlay) => {
                built.extend(overlay.clone());
                built
            }
            Self::Fn(f) => f(built),
        }
    }
}

impl std::fmt::Debug for HeaderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Map(headers) => f.debug_tuple("Map").field(headers).finish(),
            Self::Fn(_) => f.debug_tuple("Fn").finish_non_exhaustive(),
        }
    }
}

impl From<Headers> for HeaderSource {
    fn from(headers: Headers) -> Self {
        Self::Map(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "application/json");

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("Content-type"));
    }

    #[test]
    fn headers_merge_overrides_win() {
        let base = Headers::new()
            .with("accept", "application/json")
            .with("x-tenant", "a");
        let overrides = Headers::new().with("x-tenant", "b");

        let merged = Headers::merged(&base, &overrides);
        assert_eq!(merged.get("x-tenant"), Some("b"));
        assert_eq!(merged.get("accept"), Some("application/json"));
    }

    #[test]
    fn headers_drop_empty() {
        let mut headers = Headers::new()
            .with("authorization", "Bearer abc")
            .with("x-trace", "");
        headers.drop_empty();

        assert_eq!(headers.len(), 1);
        assert!(!headers.contains("x-trace"));
    }

    #[test]
    fn header_source_map_overlays() {
        let built = Headers::new().with("authorization", "Bearer abc");
        let source = HeaderSource::from(Headers::new().with("x-extra", "1"));

        let result = source.apply(built);
        assert_eq!(result.get("authorization"), Some("Bearer abc"));
        assert_eq!(result.get("x-extra"), Some("1"));
    }

    #[test]
    fn header_source_fn_replaces() {
        let built = Headers::new().with("authorization", "Bearer abc");
        let source = HeaderSource::from_fn(|_| Headers::new().with("x-only", "1"));

        let result = source.apply(built);
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("x-only"), Some("1"));
    }
}
