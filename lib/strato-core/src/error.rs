//! Error types for strato.

use derive_more::{Display, Error, From};

/// Main error type for strato operations.
///
/// Only configuration mistakes and interceptor failures reach callers as
/// `Err`; expected exchange failures (network, timeout, non-2xx statuses)
/// are reported through the normalized [`crate::CallOutcome`] instead.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The builder was constructed with a blank base URL.
    #[display("invalid base URL: {given:?}")]
    #[from(skip)]
    InvalidBaseUrl {
        /// The rejected value.
        #[error(not(source))]
        given: String,
    },

    /// `is_form_data` was configured but the payload is not a multipart form.
    #[display("form-data payload expected, but the configured payload is not a Form")]
    FormDataMismatch,

    /// A `fetch()` was started while a previous one was still pending and
    /// `abort_on_fetch` is disabled. Callers must match on this sentinel.
    #[display("abortOnFetch")]
    AbortOnFetch,

    /// A response interceptor failed.
    #[display("response interceptor failed: {_0}")]
    #[from(skip)]
    Interceptor(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error (the composed href was not a valid URL).
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Query string serialization error.
    #[display("query serialization error: {_0}")]
    #[from]
    QuerySerialization(serde_html_form::ser::Error),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an interceptor error.
    #[must_use]
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::Interceptor(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if this is the double-fetch misuse sentinel.
    #[must_use]
    pub const fn is_abort_on_fetch(&self) -> bool {
        matches!(self, Self::AbortOnFetch)
    }

    /// Returns `true` if this is a configuration error (fatal, surfaced
    /// synchronously, never retried).
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidBaseUrl { .. } | Self::FormDataMismatch)
    }
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so failures name the exact field that did not
/// deserialize (e.g., "user.address.city").
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`] with the path to the problematic
/// field.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::json_deserialization(e.path().to_string(), e.inner().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidBaseUrl {
            given: "  ".to_string(),
        };
        assert_eq!(err.to_string(), "invalid base URL: \"  \"");

        assert_eq!(Error::Timeout.to_string(), "request timeout");
        assert_eq!(Error::AbortOnFetch.to_string(), "abortOnFetch");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::json_deserialization("user.address.city", "missing field `city`");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at 'user.address.city': missing field `city`"
        );
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Timeout.is_connection());
        assert!(Error::connection("x").is_connection());
        assert!(Error::AbortOnFetch.is_abort_on_fetch());
        assert!(Error::FormDataMismatch.is_configuration());
        assert!(
            Error::InvalidBaseUrl {
                given: String::new()
            }
            .is_configuration()
        );
        assert!(!Error::Timeout.is_configuration());
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let bytes = br#"{"address":{}}"#;
        let result: Result<User> = from_json(bytes);

        let err = result.expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("address"), "expected path in error: {msg}");
        assert!(msg.contains("city"), "expected field in error: {msg}");
    }
}
