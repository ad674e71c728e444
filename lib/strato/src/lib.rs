//! Layered HTTP request configuration and execution.
//!
//! Declare an endpoint once and supply only the variable parts per call;
//! three configuration tiers (builder defaults, endpoint overrides, per-call
//! values) merge deterministically at fetch time.
//!
//! # Example
//!
//! ```ignore
//! use strato::prelude::*;
//!
//! let mut builder = ApiBuilder::new("https://api.example.com")?;
//! builder.set_token_callback(Arc::new(|| Some("token".to_string())));
//! let api = builder.build();
//!
//! let get_user = api.endpoint(MiddlewareConfig::new(Method::Get, "/users/:id"));
//!
//! let request = get_user.get_request(FetchOptions::new().params(path_params([("id", 42)])));
//! let outcome = request.fetch().await?;
//! let user: User = outcome.decode()?;
//! ```

mod body;
mod builder;
mod client;
mod config;
mod events;
mod interceptor;
mod middleware;
pub mod prelude;
mod request;

pub use body::{ProgressBody, UploadObserver};
pub use builder::{ApiBuilder, EndpointFactory};
pub use client::{DownloadObserver, HeadObserver, HyperClient};
pub use config::{
    AuxMap, BuilderConfig, ClientConfig, ClientConfigBuilder, ErrorMapper, MiddlewareConfig,
    SERVER_ERROR_MESSAGE, TokenCallback, default_error_mapper,
};
pub use events::{EventListener, RequestEvent, RequestEvents};
pub use interceptor::{RequestInterceptor, ResponseInterceptor};
pub use middleware::{FetchOptions, Middleware};
pub use request::{CANCELLED_MESSAGE, Request, TIMEOUT_MESSAGE};

// Re-export core types
pub use strato_core::{
    CallDetails, CallOutcome, CallStatus, EndpointTemplate, Error, ErrorBody, Form, HeaderSource,
    Headers, Method, OutcomeBody, Part, PathParams, Payload, ProgressInfo, Query, QueryFormatter,
    QueryPairs, ResponseMode, ResponseSnapshot, Result, TimeDetails, UNKNOWN, from_json,
    path_params, query_parse, query_stringify,
};

// Re-export http types for status codes and headers
pub use strato_core::{StatusCode, header};
