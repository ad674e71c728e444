//! Prelude module for convenient imports.
//!
//! ```ignore
//! use strato::prelude::*;
//! ```

pub use crate::{
    ApiBuilder, CallOutcome, CallStatus, Error, FetchOptions, Form, HeaderSource, Headers, Method,
    MiddlewareConfig, Part, Payload, Query, Request, RequestEvent, RequestInterceptor,
    ResponseInterceptor, ResponseMode, Result, path_params,
};
