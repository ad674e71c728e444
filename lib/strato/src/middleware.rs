//! Per-endpoint middleware: declared once, settled per call.
//!
//! A [`Middleware`] is an immutable value object. The `set_*` methods clone
//! the receiver, settle one override on the clone, and return it, so a base
//! declaration can fan out into per-call variants without cross-talk.
//! Builder defaults are never copied in: every middleware holds the shared
//! builder config and reads it live when a request resolves its cascade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use strato_core::{
    EndpointTemplate, Headers, Method, PathParams, Payload, Query, query_parse, query_stringify,
};

use crate::client::HyperClient;
use crate::config::{BuilderConfig, MiddlewareConfig, ResolvedConfig};
use crate::request::Request;

static NEXT_MIDDLEWARE_ID: AtomicU64 = AtomicU64::new(1);

/// Per-call inputs to [`Middleware::get_request`].
///
/// Settled middleware values win over `params`, `query`, and `data` given
/// here; `headers` is the exception and overwrites settled headers.
#[derive(Debug, Default)]
pub struct FetchOptions {
    /// Path parameter values.
    pub params: Option<PathParams>,
    /// Query value.
    pub query: Option<Query>,
    /// Request payload.
    pub data: Option<Payload>,
    /// Per-call headers, replacing any settled headers.
    pub headers: Option<Headers>,
}

impl FetchOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets path parameters.
    #[must_use]
    pub fn params(mut self, params: PathParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets the query.
    #[must_use]
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets per-call headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Resolves the configuration cascade for one request at fetch time, tagged
/// with the identity of the middleware that created it.
pub(crate) struct ConfigResolver {
    pub middleware_id: u64,
    resolve: Arc<dyn Fn() -> ResolvedConfig + Send + Sync>,
}

impl ConfigResolver {
    pub fn resolve(&self) -> ResolvedConfig {
        (self.resolve)()
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("middleware_id", &self.middleware_id)
            .finish_non_exhaustive()
    }
}

/// One declared endpoint bound to the shared builder config.
#[derive(Clone, derive_more::Debug)]
pub struct Middleware {
    id: u64,
    config: Arc<MiddlewareConfig>,
    template: EndpointTemplate,
    #[debug(skip)]
    builder: Arc<RwLock<BuilderConfig>>,
    #[debug(skip)]
    client: HyperClient,
    settled_data: Option<Payload>,
    settled_params: Option<PathParams>,
    settled_query: Option<Query>,
    settled_headers: Option<Headers>,
}

impl Middleware {
    pub(crate) fn new(
        config: MiddlewareConfig,
        builder: Arc<RwLock<BuilderConfig>>,
        client: HyperClient,
    ) -> Self {
        let template = EndpointTemplate::parse(config.endpoint.clone());
        Self {
            id: NEXT_MIDDLEWARE_ID.fetch_add(1, Ordering::Relaxed),
            config: Arc::new(config),
            template,
            builder,
            client,
            settled_data: None,
            settled_params: None,
            settled_query: None,
            settled_headers: None,
        }
    }

    /// Identity of this middleware; copied by `clone()` and by the settling
    /// setters, so every variant of one declaration shares it.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The declared HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.config.method
    }

    /// The declared path template.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.template.as_str()
    }

    /// Returns a variant with a settled payload.
    #[must_use]
    pub fn set_data(&self, data: impl Into<Payload>) -> Self {
        let mut settled = self.clone();
        settled.settled_data = Some(data.into());
        settled
    }

    /// Returns a variant with settled path parameters.
    #[must_use]
    pub fn set_params(&self, params: PathParams) -> Self {
        let mut settled = self.clone();
        settled.settled_params = Some(params);
        settled
    }

    /// Returns a variant with a settled query.
    #[must_use]
    pub fn set_query(&self, query: impl Into<Query>) -> Self {
        let mut settled = self.clone();
        settled.settled_query = Some(query.into());
        settled
    }

    /// Returns a variant with settled headers.
    #[must_use]
    pub fn set_headers(&self, headers: Headers) -> Self {
        let mut settled = self.clone();
        settled.settled_headers = Some(headers);
        settled
    }

    /// Resolves path, query, and payload against `options` and returns an
    /// executable [`Request`].
    ///
    /// The base URL is read from the middleware override or, live, from the
    /// shared builder config. Unresolved `:name` placeholders are left
    /// literal in the href and logged.
    #[must_use]
    pub fn get_request(&self, options: FetchOptions) -> Request {
        let mut snapshot = self.clone();
        if let Some(headers) = options.headers {
            snapshot.settled_headers = Some(headers);
        }

        let base_url = snapshot
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| snapshot.read_builder().base_url.clone());

        let params = snapshot
            .settled_params
            .clone()
            .or(options.params)
            .unwrap_or_default();
        let (path, unresolved) = snapshot.template.substitute(&params);
        if !unresolved.is_empty() {
            tracing::warn!(
                endpoint = %snapshot.template,
                unresolved = ?unresolved,
                "path parameters left unresolved"
            );
        }

        let query_string = snapshot
            .settled_query
            .clone()
            .or(options.query)
            .map(|query| snapshot.format_query(&query))
            .unwrap_or_default();

        let href = format!("{base_url}{path}{query_string}");
        let payload = snapshot.settled_data.clone().or(options.data);
        let method = snapshot.config.method;
        let resolver = snapshot.resolver();
        let client = snapshot.client;

        Request::new(href, method, payload, resolver, client)
    }

    /// Serializes a query, round-tripping through the endpoint's query
    /// formatter when one is declared.
    fn format_query(&self, query: &Query) -> String {
        let serialized = query.to_query_string();
        match &self.config.query_formatter {
            Some(formatter) => query_stringify(&formatter(query_parse(&serialized))),
            None => serialized,
        }
    }

    /// Builds the fetch-time cascade resolver for the current settled state.
    fn resolver(&self) -> ConfigResolver {
        let config = Arc::clone(&self.config);
        let builder = Arc::clone(&self.builder);
        let settled_headers = self.settled_headers.clone();

        ConfigResolver {
            middleware_id: self.id,
            resolve: Arc::new(move || {
                let shared = builder.read().unwrap_or_else(PoisonError::into_inner);

                let mut headers = shared.headers.clone();
                if let Some(settled) = &settled_headers {
                    headers.extend(settled.clone());
                }

                let mut request_interceptors = shared.request_interceptors.clone();
                request_interceptors.extend(config.request_interceptors.iter().cloned());
                let mut response_interceptors = shared.response_interceptors.clone();
                response_interceptors.extend(config.response_interceptors.iter().cloned());

                ResolvedConfig {
                    token_prefix: config
                        .token_prefix
                        .clone()
                        .unwrap_or_else(|| shared.token_prefix.clone()),
                    response_mode: config.response_mode.unwrap_or(shared.response_mode),
                    timeout: config.timeout,
                    cors: config.cors.unwrap_or(shared.cors),
                    is_form_data: config.is_form_data,
                    abort_on_fetch: config.abort_on_fetch,
                    disable_interception: config.disable_interception,
                    headers,
                    header_source: config.headers.clone(),
                    auxiliary: config.auxiliary.clone(),
                    token_callback: config
                        .token_callback
                        .clone()
                        .or_else(|| shared.token_callback.clone()),
                    error_mapper: config
                        .error_mapper
                        .clone()
                        .unwrap_or_else(|| shared.error_mapper.clone()),
                    request_interceptors,
                    response_interceptors,
                }
            }),
        }
    }

    fn read_builder(&self) -> std::sync::RwLockReadGuard<'_, BuilderConfig> {
        self.builder.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use strato_core::{ResponseMode, path_params};

    use super::*;

    fn middleware(config: MiddlewareConfig) -> Middleware {
        let builder = BuilderConfig::new("https://api.example.com").expect("config");
        Middleware::new(config, Arc::new(RwLock::new(builder)), HyperClient::new())
    }

    #[test]
    fn setters_return_new_variants() {
        let base = middleware(MiddlewareConfig::new(Method::Get, "/users/:id"));
        let settled = base.set_params(path_params([("id", 7)]));

        assert!(base.settled_params.is_none());
        assert!(settled.settled_params.is_some());
        assert_eq!(base.id(), settled.id());

        let with_data = base.set_data(serde_json::json!({"name": "Ada"}));
        assert!(base.settled_data.is_none());
        assert!(with_data.settled_data.is_some());
        // settling one field never leaks into sibling variants
        assert!(with_data.settled_params.is_none());
        assert!(settled.settled_data.is_none());
        assert_eq!(base.id(), with_data.id());
    }

    #[test]
    fn ids_are_unique_per_declaration() {
        let first = middleware(MiddlewareConfig::new(Method::Get, "/a"));
        let second = middleware(MiddlewareConfig::new(Method::Get, "/a"));
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id(), first.clone().id());
    }

    #[test]
    fn href_composition() {
        let base = middleware(MiddlewareConfig::new(Method::Get, "/users/:id/orders"));
        let request = base.get_request(
            FetchOptions::new()
                .params(path_params([("id", 42)]))
                .query("page=2"),
        );

        assert_eq!(
            request.href(),
            "https://api.example.com/users/42/orders?page=2"
        );
        assert_eq!(request.method(), Method::Get);
    }

    #[test]
    fn settled_params_win_over_options() {
        let base = middleware(MiddlewareConfig::new(Method::Get, "/users/:id"))
            .set_params(path_params([("id", 1)]));
        let request = base.get_request(FetchOptions::new().params(path_params([("id", 2)])));

        assert_eq!(request.href(), "https://api.example.com/users/1");
    }

    #[test]
    fn unresolved_params_left_literal() {
        let base = middleware(MiddlewareConfig::new(Method::Get, "/users/:id"));
        let request = base.get_request(FetchOptions::new());

        assert_eq!(request.href(), "https://api.example.com/users/:id");
    }

    #[test]
    fn query_formatter_round_trips() {
        let config = MiddlewareConfig::new(Method::Get, "/search").query_formatter(Arc::new(
            |mut pairs| {
                pairs.retain(|(name, _)| name != "internal");
                pairs.sort();
                pairs
            },
        ));
        let base = middleware(config);
        let request = base.get_request(FetchOptions::new().query("z=1&internal=x&a=2"));

        assert_eq!(request.href(), "https://api.example.com/search?a=2&z=1");
    }

    #[test]
    fn middleware_base_url_override() {
        let base = middleware(MiddlewareConfig::new(Method::Get, "/ping").base_url("https://other.example.com"));
        let request = base.get_request(FetchOptions::new());
        assert_eq!(request.href(), "https://other.example.com/ping");
    }

    #[test]
    fn cascade_prefers_middleware_overrides() {
        let base = middleware(
            MiddlewareConfig::new(Method::Get, "/a")
                .token_prefix("Token")
                .response_mode(ResponseMode::Text),
        );
        let resolved = base.resolver().resolve();

        assert_eq!(resolved.token_prefix, "Token");
        assert_eq!(resolved.response_mode, ResponseMode::Text);
        assert!(resolved.abort_on_fetch);
    }

    #[test]
    fn builder_mutations_visible_at_resolve_time() {
        let shared = Arc::new(RwLock::new(
            BuilderConfig::new("https://api.example.com").expect("config"),
        ));
        let base = Middleware::new(
            MiddlewareConfig::new(Method::Get, "/a"),
            Arc::clone(&shared),
            HyperClient::new(),
        );

        shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token_prefix = "JWT".to_string();

        assert_eq!(base.resolver().resolve().token_prefix, "JWT");
    }
}
