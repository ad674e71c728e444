//! The process-scoped API builder.
//!
//! One builder is constructed per API host, configured once, and turned
//! into an [`EndpointFactory`] that declares endpoints. The builder's
//! config lives behind a shared lock: mutators change it in place, so
//! endpoints declared earlier resolve the updated values at fetch time
//! (compose first, mutate later).

use std::sync::{Arc, PoisonError, RwLock};

use strato_core::{Headers, ResponseMode, Result};

use crate::client::HyperClient;
use crate::config::{BuilderConfig, ErrorMapper, MiddlewareConfig, TokenCallback};
use crate::interceptor::{RequestInterceptor, ResponseInterceptor};
use crate::middleware::Middleware;

/// Builder for the process-scoped request configuration.
#[derive(Debug, Clone)]
pub struct ApiBuilder {
    config: Arc<RwLock<BuilderConfig>>,
    client: HyperClient,
}

impl ApiBuilder {
    /// Creates a builder around a base URL, with a default transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is blank.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(base_url, HyperClient::new())
    }

    /// Creates a builder with a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is blank.
    pub fn with_client(base_url: impl Into<String>, client: HyperClient) -> Result<Self> {
        let config = BuilderConfig::new(base_url)?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            client,
        })
    }

    /// Replaces the default headers.
    pub fn set_headers(&mut self, headers: Headers) -> &mut Self {
        self.write().headers = headers;
        self
    }

    /// Replaces the authorization prefix (default `Bearer`).
    pub fn set_token_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.write().token_prefix = prefix.into();
        self
    }

    /// Replaces the default response decoding mode.
    pub fn set_response_mode(&mut self, mode: ResponseMode) -> &mut Self {
        self.write().response_mode = mode;
        self
    }

    /// Sets the advisory cross-origin flag.
    pub fn set_cors(&mut self, cors: bool) -> &mut Self {
        self.write().cors = cors;
        self
    }

    /// Replaces the token supplier.
    pub fn set_token_callback(&mut self, callback: TokenCallback) -> &mut Self {
        self.write().token_callback = Some(callback);
        self
    }

    /// Replaces the error mapper.
    pub fn set_error_mapper(&mut self, mapper: ErrorMapper) -> &mut Self {
        self.write().error_mapper = mapper;
        self
    }

    /// Appends request interceptors. Repeated calls accumulate, they never
    /// replace interceptors registered earlier.
    pub fn set_request_interceptors(
        &mut self,
        interceptors: Vec<RequestInterceptor>,
    ) -> &mut Self {
        self.write().request_interceptors.extend(interceptors);
        self
    }

    /// Appends response interceptors. Repeated calls accumulate.
    pub fn set_response_interceptors(
        &mut self,
        interceptors: Vec<ResponseInterceptor>,
    ) -> &mut Self {
        self.write().response_interceptors.extend(interceptors);
        self
    }

    /// Returns the endpoint factory bound to this builder's live config.
    #[must_use]
    pub fn build(&self) -> EndpointFactory {
        EndpointFactory {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BuilderConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Declares endpoints against a shared builder config.
#[derive(Debug, Clone)]
pub struct EndpointFactory {
    config: Arc<RwLock<BuilderConfig>>,
    client: HyperClient,
}

impl EndpointFactory {
    /// Declares one endpoint. The returned middleware holds a reference to
    /// the builder config, never a copy.
    #[must_use]
    pub fn endpoint(&self, config: MiddlewareConfig) -> Middleware {
        Middleware::new(config, Arc::clone(&self.config), self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use strato_core::{Error, Method};

    use super::*;

    #[test]
    fn blank_base_url_is_rejected() {
        let err = ApiBuilder::new("  ").expect_err("blank");
        assert!(matches!(err, Error::InvalidBaseUrl { .. }));
    }

    #[test]
    fn interceptor_registration_appends() {
        let mut builder = ApiBuilder::new("https://api.example.com").expect("builder");
        builder.set_request_interceptors(vec![RequestInterceptor::new(|_, h| h)]);
        builder.set_request_interceptors(vec![
            RequestInterceptor::new(|_, h| h),
            RequestInterceptor::new(|_, h| h),
        ]);

        let count = builder
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .request_interceptors
            .len();
        assert_eq!(count, 3);
    }

    #[test]
    fn builder_mutations_reach_existing_endpoints() {
        let mut builder = ApiBuilder::new("https://api.example.com").expect("builder");
        let users = builder
            .build()
            .endpoint(MiddlewareConfig::new(Method::Get, "/users"));

        // mutate after the endpoint was declared
        builder.set_token_callback(Arc::new(|| Some("late-token".to_string())));

        let request = users.get_request(crate::middleware::FetchOptions::new());
        // the cascade is read at fetch time; exercised further in the
        // integration tests, here we only check the shared reference wiring
        assert!(request.created_by(&[&users]));
    }

    #[test]
    fn endpoints_share_one_client() {
        let builder = ApiBuilder::new("https://api.example.com").expect("builder");
        let factory = builder.build();
        let a = factory.endpoint(MiddlewareConfig::new(Method::Get, "/a"));
        let b = factory.endpoint(MiddlewareConfig::new(Method::Post, "/b"));
        assert_ne!(a.id(), b.id());
    }
}
