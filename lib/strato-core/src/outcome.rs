//! Normalized call results.
//!
//! Every completed exchange, whether a success, HTTP error, cancellation,
//! timeout, or connection failure, is reported as one [`CallOutcome`], so callers
//! and response interceptors branch on data instead of catching errors.

use crate::headers::Headers;
use crate::{Result, from_json};

/// How a response body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// JSON decoding (default).
    #[default]
    Json,
    /// Raw-text transport decoded to JSON in application code, for servers
    /// that mislabel content types.
    JsonText,
    /// Plain text.
    Text,
}

impl ResponseMode {
    /// Returns `true` when the mode decodes to JSON.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonText)
    }

    /// Decodes raw body bytes according to this mode.
    ///
    /// `force_text` short-circuits JSON decoding; it is set when an error
    /// response declares a plain-text content type, so the parser never
    /// fails on non-JSON error bodies. JSON parse failures fall back to the
    /// raw text rather than failing the exchange.
    #[must_use]
    pub fn decode(&self, bytes: &[u8], force_text: bool) -> serde_json::Value {
        if bytes.is_empty() {
            return serde_json::Value::Null;
        }
        let text = String::from_utf8_lossy(bytes).into_owned();
        if force_text || !self.is_json() {
            return serde_json::Value::String(text);
        }
        serde_json::from_slice(bytes).unwrap_or(serde_json::Value::String(text))
    }
}

/// Terminal classification of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// 2xx/3xx response.
    Success,
    /// Non-success status code with a response.
    Error,
    /// The exchange was aborted.
    Cancelled,
    /// The exchange hit the configured timeout.
    Timeout,
    /// No status code was ever obtained (connection/TLS failure).
    None,
}

impl CallStatus {
    /// Stable lowercase name, matching the wire-facing vocabulary.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::None => "none",
        }
    }

    /// Returns `true` for the success variant.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wall-clock timing of one exchange, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeDetails {
    /// When the response phase started (or finish time when it never did).
    pub start_time: u64,
    /// When the exchange finished.
    pub finish_time: u64,
    /// `finish_time - start_time`.
    pub delta: u64,
}

/// Classification details carried by every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallDetails {
    /// Terminal status.
    pub status: CallStatus,
    /// HTTP status code, `0` when none was obtained.
    pub status_code: u16,
    /// The exchange was aborted.
    pub is_canceled: bool,
    /// The exchange timed out.
    pub is_timeout: bool,
    /// The exchange succeeded (2xx/3xx).
    pub is_success: bool,
    /// Exchange timing.
    pub time: TimeDetails,
}

/// Raw view of the terminal HTTP exchange, when one reached the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: Headers,
}

/// The error half of a normalized result.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    /// The raw error payload (decoded body, or `null` when none exists).
    pub original_error: serde_json::Value,
    /// Human-readable message produced by the resolved error mapper, or a
    /// fixed message for cancellation/timeout.
    pub formatted_message: String,
    /// Error classification; never [`CallStatus::Success`].
    pub status: CallStatus,
    /// HTTP status code, `0` when none was obtained.
    pub status_code: u16,
}

/// Discriminated success/error payload.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeBody {
    /// Decoded response payload of a successful exchange.
    Success(serde_json::Value),
    /// Normalized error of a failed exchange.
    Failure(ErrorBody),
}

/// The normalized result of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    /// Success payload or normalized error.
    pub body: OutcomeBody,
    /// Terminal status (mirrors `details.status`).
    pub status: CallStatus,
    /// Classification and timing details.
    pub details: CallDetails,
    /// Raw status/headers of the terminal exchange, when one happened.
    pub response: Option<ResponseSnapshot>,
}

impl CallOutcome {
    /// Assembles a success outcome.
    #[must_use]
    pub fn success(
        payload: serde_json::Value,
        status_code: u16,
        time: TimeDetails,
        response: Option<ResponseSnapshot>,
    ) -> Self {
        Self {
            body: OutcomeBody::Success(payload),
            status: CallStatus::Success,
            details: CallDetails {
                status: CallStatus::Success,
                status_code,
                is_canceled: false,
                is_timeout: false,
                is_success: true,
                time,
            },
            response,
        }
    }

    /// Assembles an error outcome; `error.status` drives the details.
    #[must_use]
    pub fn failure(error: ErrorBody, time: TimeDetails, response: Option<ResponseSnapshot>) -> Self {
        let status = error.status;
        let status_code = error.status_code;
        Self {
            body: OutcomeBody::Failure(error),
            status,
            details: CallDetails {
                status,
                status_code,
                is_canceled: matches!(status, CallStatus::Cancelled),
                is_timeout: matches!(status, CallStatus::Timeout),
                is_success: false,
                time,
            },
            response,
        }
    }

    /// Returns `true` for success outcomes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.body, OutcomeBody::Success(_))
    }

    /// The success payload, if any.
    #[must_use]
    pub const fn success_value(&self) -> Option<&serde_json::Value> {
        match &self.body {
            OutcomeBody::Success(value) => Some(value),
            OutcomeBody::Failure(_) => None,
        }
    }

    /// The normalized error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorBody> {
        match &self.body {
            OutcomeBody::Failure(error) => Some(error),
            OutcomeBody::Success(_) => None,
        }
    }

    /// Decodes the success payload into a typed value, with path-aware
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns an error when this is not a success outcome or the payload
    /// does not deserialize.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        match &self.body {
            OutcomeBody::Success(value) => {
                let bytes = serde_json::to_vec(value)?;
                from_json(&bytes)
            }
            OutcomeBody::Failure(error) => Err(crate::Error::invalid_request(format!(
                "cannot decode success payload from a {} outcome",
                error.status
            ))),
        }
    }

    /// Decodes the raw error payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns an error when this is a success outcome or the payload does
    /// not deserialize.
    pub fn decode_error<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        match &self.body {
            OutcomeBody::Failure(error) => {
                let bytes = serde_json::to_vec(&error.original_error)?;
                from_json(&bytes)
            }
            OutcomeBody::Success(_) => Err(crate::Error::invalid_request(
                "cannot decode error payload from a success outcome".to_string(),
            )),
        }
    }
}
