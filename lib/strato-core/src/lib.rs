//! Core types for the strato layered HTTP request library.
//!
//! This crate provides the foundational vocabulary used by strato:
//! - [`Method`] - HTTP method enum
//! - [`Headers`] and [`HeaderSource`] - case-insensitive header maps and
//!   middleware-level header overrides
//! - [`Query`], [`query_parse`], [`query_stringify`] - query strings and pairs
//! - [`EndpointTemplate`] and [`PathParams`] - `:name` path templates
//! - [`Payload`], [`Form`], [`Part`] - JSON and multipart request payloads
//! - [`CallOutcome`] and friends - normalized success/error results
//! - [`ProgressInfo`] - transfer progress and ETA telemetry
//! - [`Error`] and [`Result`] - error handling

mod endpoint;
mod error;
mod headers;
mod method;
mod multipart;
mod outcome;
mod payload;
pub mod prelude;
mod progress;
mod query;

pub use endpoint::{EndpointTemplate, PathParams, path_params};
pub use error::{Error, Result, from_json};
pub use headers::{HeaderSource, Headers};
pub use method::Method;
pub use multipart::{Form, Part};
pub use outcome::{
    CallDetails, CallOutcome, CallStatus, ErrorBody, OutcomeBody, ResponseMode, ResponseSnapshot,
    TimeDetails,
};
pub use payload::Payload;
pub use progress::{ProgressInfo, UNKNOWN};
pub use query::{Query, QueryFormatter, QueryPairs, query_parse, query_stringify};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
