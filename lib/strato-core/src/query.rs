//! Query string parsing, serialization, and per-call query values.
//!
//! Serialized query strings carry their own leading `?` when non-empty, so
//! composing an href is plain concatenation with no separator injection.

use std::sync::Arc;

use crate::Result;

/// Parsed query parameters as ordered `(name, value)` pairs.
///
/// Pairs rather than a map: repeated names are meaningful in query strings
/// (`tags=a&tags=b`).
pub type QueryPairs = Vec<(String, String)>;

/// A pure transform over parsed query parameters, declared per endpoint to
/// normalize query shape independent of caller input.
pub type QueryFormatter = Arc<dyn Fn(QueryPairs) -> QueryPairs + Send + Sync>;

/// A per-call query value: a raw pre-serialized string or structured pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A raw query string, used verbatim (a leading `?` is added when
    /// missing and the string is non-empty).
    Raw(String),
    /// Structured pairs, serialized with percent-encoding.
    Pairs(QueryPairs),
}

impl Query {
    /// Builds a query from any serializable value (struct, map, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not serialize to a flat query
    /// shape.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        let serialized = serde_html_form::to_string(value)?;
        Ok(Self::Raw(serialized))
    }

    /// Serializes to a query string with the leading-`?` convention.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Raw(raw) => normalize_raw(raw),
            Self::Pairs(pairs) => query_stringify(pairs),
        }
    }
}

impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Query {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<QueryPairs> for Query {
    fn from(pairs: QueryPairs) -> Self {
        Self::Pairs(pairs)
    }
}

fn normalize_raw(raw: &str) -> String {
    if raw.is_empty() || raw.starts_with('?') {
        raw.to_string()
    } else {
        format!("?{raw}")
    }
}

/// Parses a query string (with or without leading `?`) into ordered pairs.
#[must_use]
pub fn query_parse(query: &str) -> QueryPairs {
    let trimmed = query.strip_prefix('?').unwrap_or(query);
    if trimmed.is_empty() {
        return Vec::new();
    }
    url::form_urlencoded::parse(trimmed.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Serializes ordered pairs into a query string with a leading `?`, or the
/// empty string when there are no pairs.
#[must_use]
pub fn query_stringify(pairs: &QueryPairs) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    format!("?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parse_basic() {
        let pairs = query_parse("?page=1&limit=10");
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn query_parse_without_question_mark() {
        assert_eq!(
            query_parse("q=rust"),
            vec![("q".to_string(), "rust".to_string())]
        );
        assert!(query_parse("").is_empty());
        assert!(query_parse("?").is_empty());
    }

    #[test]
    fn query_stringify_leading_question_mark() {
        let pairs = vec![("q".to_string(), "rust".to_string())];
        assert_eq!(query_stringify(&pairs), "?q=rust");
        assert_eq!(query_stringify(&Vec::new()), "");
    }

    #[test]
    fn query_round_trip() {
        // Holds for query strings without duplicate-key ambiguity
        for q in ["?page=1&limit=10", "?q=rust", "?tags=a&tags=b&tags=c"] {
            assert_eq!(query_stringify(&query_parse(q)), q);
        }
    }

    #[test]
    fn query_from_serialize() {
        #[derive(serde::Serialize)]
        struct Search {
            q: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            page: Option<u32>,
        }

        let query = Query::from_serialize(&Search {
            q: "rust".to_string(),
            page: Some(2),
        })
        .expect("serialize");
        assert_eq!(query.to_query_string(), "?q=rust&page=2");
    }

    #[test]
    fn query_raw_normalization() {
        assert_eq!(Query::from("a=1").to_query_string(), "?a=1");
        assert_eq!(Query::from("?a=1").to_query_string(), "?a=1");
        assert_eq!(Query::from("").to_query_string(), "");
    }

    #[test]
    fn query_pairs_repeated_names() {
        let query = Query::from(vec![
            ("tags".to_string(), "a".to_string()),
            ("tags".to_string(), "b".to_string()),
        ]);
        assert_eq!(query.to_query_string(), "?tags=a&tags=b");
    }
}
