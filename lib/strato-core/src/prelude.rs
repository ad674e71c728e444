//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use strato_core::prelude::*;
//! ```

pub use crate::{
    CallDetails, CallOutcome, CallStatus, EndpointTemplate, Error, ErrorBody, Form, HeaderSource,
    Headers, Method, OutcomeBody, Part, PathParams, Payload, ProgressInfo, Query, ResponseMode,
    Result, from_json, path_params,
};
