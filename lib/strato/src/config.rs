//! Configuration types for the three-tier cascade and the transport.
//!
//! Resolution order for every overridable field is: endpoint override >
//! builder default > library default. Header maps merge additively
//! (overrides win per name); interceptor lists concatenate (builder list
//! first).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use strato_core::{Error, HeaderSource, Headers, Method, QueryFormatter, ResponseMode, Result};

use crate::interceptor::{RequestInterceptor, ResponseInterceptor};

/// Supplies the current bearer token, or `None` when no session is active.
pub type TokenCallback = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Maps a raw error payload to a human-readable message.
pub type ErrorMapper = Arc<dyn Fn(&serde_json::Value) -> String + Send + Sync>;

/// Endpoint-scoped key/value context handed to request interceptors.
pub type AuxMap = BTreeMap<String, serde_json::Value>;

/// Fallback message when an error payload yields nothing readable.
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

/// The default error mapper.
///
/// A non-empty string payload is used as-is; an object is probed for a
/// string `message`, `formattedMessage`, or `msg` field; anything else is
/// JSON-stringified; `null` and dead ends fall back to
/// [`SERVER_ERROR_MESSAGE`].
#[must_use]
pub fn default_error_mapper() -> ErrorMapper {
    Arc::new(map_error_message)
}

fn map_error_message(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(text) if !text.is_empty() => text.clone(),
        serde_json::Value::Object(fields) => {
            for key in ["message", "formattedMessage", "msg"] {
                if let Some(serde_json::Value::String(text)) = fields.get(key) {
                    if !text.is_empty() {
                        return text.clone();
                    }
                }
            }
            serde_json::to_string(payload).unwrap_or_else(|_| SERVER_ERROR_MESSAGE.to_string())
        }
        serde_json::Value::Null | serde_json::Value::String(_) => SERVER_ERROR_MESSAGE.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| SERVER_ERROR_MESSAGE.to_string()),
    }
}

/// Process-scoped defaults owned by the builder.
///
/// Lives behind `Arc<RwLock<..>>`; builder mutators change it in place, so
/// endpoints built earlier observe later changes at fetch time.
#[derive(derive_more::Debug)]
pub struct BuilderConfig {
    /// Base URL prefixed to every endpoint path.
    pub base_url: String,
    /// Authorization scheme prefix (default `Bearer`).
    pub token_prefix: String,
    /// Default response decoding mode.
    pub response_mode: ResponseMode,
    /// Advisory cross-origin flag carried on the resolved config.
    pub cors: bool,
    /// Default headers merged under per-endpoint headers.
    pub headers: Headers,
    /// Token supplier for the `authorization` header.
    #[debug(skip)]
    pub token_callback: Option<TokenCallback>,
    /// Error payload to message mapping.
    #[debug(skip)]
    pub error_mapper: ErrorMapper,
    /// Global request interceptors, run before endpoint ones.
    pub request_interceptors: Vec<RequestInterceptor>,
    /// Global response interceptors, run before endpoint ones.
    pub response_interceptors: Vec<ResponseInterceptor>,
}

impl BuilderConfig {
    /// Creates defaults around a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`] when the base URL is blank.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::InvalidBaseUrl { given: base_url });
        }
        Ok(Self {
            base_url,
            token_prefix: "Bearer".to_string(),
            response_mode: ResponseMode::Json,
            cors: false,
            headers: Headers::new(),
            token_callback: None,
            error_mapper: default_error_mapper(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        })
    }
}

/// Per-endpoint declaration: the fixed parts of one API operation plus
/// overrides of the builder defaults.
#[derive(derive_more::Debug)]
pub struct MiddlewareConfig {
    /// HTTP method.
    pub method: Method,
    /// Path template with `:name` placeholders, e.g. `/users/:id`.
    pub endpoint: String,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Authorization prefix override.
    pub token_prefix: Option<String>,
    /// Response mode override.
    pub response_mode: Option<ResponseMode>,
    /// Per-exchange timeout; zero means no timeout.
    pub timeout: Option<Duration>,
    /// Cross-origin flag override.
    pub cors: Option<bool>,
    /// The endpoint expects a multipart form payload.
    pub is_form_data: bool,
    /// A new `fetch()` aborts a pending one (default); when disabled, the
    /// new call is rejected with the abort-on-fetch sentinel instead.
    pub abort_on_fetch: bool,
    /// Skip both interceptor pipelines for this endpoint.
    pub disable_interception: bool,
    /// Header override: static map overlaid on the defaults, or a function
    /// replacing them outright.
    pub headers: Option<HeaderSource>,
    /// Context handed to request interceptors.
    pub auxiliary: AuxMap,
    /// Normalizes parsed query pairs before serialization.
    #[debug(skip)]
    pub query_formatter: Option<QueryFormatter>,
    /// Token supplier override.
    #[debug(skip)]
    pub token_callback: Option<TokenCallback>,
    /// Error mapper override.
    #[debug(skip)]
    pub error_mapper: Option<ErrorMapper>,
    /// Endpoint request interceptors, run after the builder's.
    pub request_interceptors: Vec<RequestInterceptor>,
    /// Endpoint response interceptors, run after the builder's.
    pub response_interceptors: Vec<ResponseInterceptor>,
}

impl MiddlewareConfig {
    /// Declares an endpoint with its method and path template.
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            base_url: None,
            token_prefix: None,
            response_mode: None,
            timeout: None,
            cors: None,
            is_form_data: false,
            abort_on_fetch: true,
            disable_interception: false,
            headers: None,
            auxiliary: AuxMap::new(),
            query_formatter: None,
            token_callback: None,
            error_mapper: None,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Overrides the builder's base URL for this endpoint.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the authorization prefix.
    #[must_use]
    pub fn token_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.token_prefix = Some(prefix.into());
        self
    }

    /// Overrides the response decoding mode.
    #[must_use]
    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = Some(mode);
        self
    }

    /// Sets a per-exchange timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the cross-origin flag.
    #[must_use]
    pub const fn cors(mut self, cors: bool) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Declares the payload as multipart form data.
    #[must_use]
    pub const fn form_data(mut self) -> Self {
        self.is_form_data = true;
        self
    }

    /// Controls whether a new `fetch()` aborts a pending one.
    #[must_use]
    pub const fn abort_on_fetch(mut self, abort: bool) -> Self {
        self.abort_on_fetch = abort;
        self
    }

    /// Skips both interceptor pipelines for this endpoint.
    #[must_use]
    pub const fn disable_interception(mut self) -> Self {
        self.disable_interception = true;
        self
    }

    /// Sets the header override.
    #[must_use]
    pub fn headers(mut self, headers: impl Into<HeaderSource>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Adds one auxiliary entry for request interceptors.
    #[must_use]
    pub fn auxiliary(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.auxiliary.insert(key.into(), value.into());
        self
    }

    /// Sets the query formatter.
    #[must_use]
    pub fn query_formatter(mut self, formatter: QueryFormatter) -> Self {
        self.query_formatter = Some(formatter);
        self
    }

    /// Overrides the token supplier.
    #[must_use]
    pub fn token_callback(mut self, callback: TokenCallback) -> Self {
        self.token_callback = Some(callback);
        self
    }

    /// Overrides the error mapper.
    #[must_use]
    pub fn error_mapper(mut self, mapper: ErrorMapper) -> Self {
        self.error_mapper = Some(mapper);
        self
    }

    /// Adds an endpoint request interceptor.
    #[must_use]
    pub fn request_interceptor(mut self, interceptor: RequestInterceptor) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Adds an endpoint response interceptor.
    #[must_use]
    pub fn response_interceptor(mut self, interceptor: ResponseInterceptor) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }
}

/// The cascade flattened for one exchange, computed at fetch time so builder
/// mutations made after endpoint construction are observed.
pub(crate) struct ResolvedConfig {
    pub token_prefix: String,
    pub response_mode: ResponseMode,
    pub timeout: Option<Duration>,
    #[allow(dead_code)]
    pub cors: bool,
    pub is_form_data: bool,
    pub abort_on_fetch: bool,
    pub disable_interception: bool,
    /// Builder headers merged with settled per-call headers (settled wins).
    pub headers: Headers,
    pub header_source: Option<HeaderSource>,
    pub auxiliary: AuxMap,
    pub token_callback: Option<TokenCallback>,
    pub error_mapper: ErrorMapper,
    pub request_interceptors: Vec<RequestInterceptor>,
    pub response_interceptors: Vec<ResponseInterceptor>,
}

impl ResolvedConfig {
    /// The timeout to enforce, ignoring zero values.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}
