//! Request and response interceptor pipelines.
//!
//! Request interceptors run while headers are being assembled, in resolved
//! order (builder interceptors before endpoint interceptors); each receives
//! the endpoint's auxiliary map and the headers built so far and returns the
//! next header set. Response interceptors run after classification, awaited
//! strictly in sequence; each receives the outcome so far plus a handle to
//! the originating request, so it can re-issue `fetch()` (silent re-auth).

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use strato_core::{CallOutcome, Headers, Result};

use crate::config::AuxMap;
use crate::request::Request;

/// A synchronous header transform applied before dispatch.
#[derive(Clone)]
pub struct RequestInterceptor {
    inner: Arc<dyn Fn(&AuxMap, Headers) -> Headers + Send + Sync>,
}

impl RequestInterceptor {
    /// Wraps a header transform.
    pub fn new(f: impl Fn(&AuxMap, Headers) -> Headers + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Applies the transform to the headers built so far.
    #[must_use]
    pub fn apply(&self, auxiliary: &AuxMap, headers: Headers) -> Headers {
        (self.inner)(auxiliary, headers)
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor").finish_non_exhaustive()
    }
}

/// An async transform over the normalized outcome.
///
/// Runs on both success and error paths. The returned outcome replaces the
/// current one for the rest of the pipeline; an `Err` rejects the whole
/// `fetch()`.
#[derive(Clone)]
pub struct ResponseInterceptor {
    inner:
        Arc<dyn Fn(CallOutcome, Request) -> BoxFuture<'static, Result<CallOutcome>> + Send + Sync>,
}

impl ResponseInterceptor {
    /// Wraps an async outcome transform.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CallOutcome, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallOutcome>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |outcome, request| -> BoxFuture<'static, Result<CallOutcome>> {
                Box::pin(f(outcome, request))
            }),
        }
    }

    /// Applies the transform.
    pub fn apply(
        &self,
        outcome: CallOutcome,
        request: Request,
    ) -> BoxFuture<'static, Result<CallOutcome>> {
        (self.inner)(outcome, request)
    }
}

impl std::fmt::Debug for ResponseInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseInterceptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_interceptors_compose_in_order() {
        let first = RequestInterceptor::new(|_, headers| headers.with("x-order", "1"));
        let second = RequestInterceptor::new(|_, headers| headers.with("x-order", "2"));

        let auxiliary = AuxMap::new();
        let headers = second.apply(&auxiliary, first.apply(&auxiliary, Headers::new()));
        assert_eq!(headers.get("x-order"), Some("2"));
    }

    #[test]
    fn request_interceptor_reads_auxiliary() {
        let interceptor = RequestInterceptor::new(|auxiliary, headers| {
            match auxiliary.get("tenant").and_then(serde_json::Value::as_str) {
                Some(tenant) => headers.with("x-tenant", tenant),
                None => headers,
            }
        });

        let mut auxiliary = AuxMap::new();
        auxiliary.insert("tenant".to_string(), serde_json::json!("acme"));

        let headers = interceptor.apply(&auxiliary, Headers::new());
        assert_eq!(headers.get("x-tenant"), Some("acme"));
    }
}
