//! HTTP transport using hyper-util.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use strato_core::{Error, Headers, Method, Result};

use crate::body::{ProgressBody, UploadObserver};
use crate::config::ClientConfig;

/// Observes the response head as `(status_code, headers)`.
pub type HeadObserver = Arc<dyn Fn(u16, &Headers) + Send + Sync>;

/// Observes download progress as `(loaded_bytes, content_length)`.
pub type DownloadObserver = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Per-exchange transfer observers, all optional.
#[derive(Default, Clone)]
pub(crate) struct TransferHooks {
    pub on_upload: Option<UploadObserver>,
    pub on_head: Option<HeadObserver>,
    pub on_download: Option<DownloadObserver>,
}

/// The raw result of one wire exchange.
#[derive(Debug, Clone)]
pub(crate) struct Exchange {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

/// HTTP client using hyper-util with connection pooling and rustls TLS.
#[derive(Clone)]
pub struct HyperClient {
    inner: Client<HttpsConnector<HttpConnector>, ProgressBody>,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(Self::connector());

        Self { inner, config }
    }

    /// rustls connector with the Mozilla root set, h1 and h2, plus plain
    /// `http://` for local development targets.
    fn connector() -> HttpsConnector<HttpConnector> {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let tls = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Executes one exchange, buffering the response body.
    ///
    /// The optional `timeout` covers the whole exchange, head and body.
    /// Transfer observers fire as bytes cross the wire.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
        hooks: TransferHooks,
    ) -> Result<Exchange> {
        let request = Self::build_request(method, url, headers, body, hooks.on_upload)?;
        let exchange = self.run(request, hooks.on_head, hooks.on_download);

        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout)?,
            None => exchange.await,
        }
    }

    async fn run(
        &self,
        request: http::Request<ProgressBody>,
        on_head: Option<HeadObserver>,
        on_download: Option<DownloadObserver>,
    ) -> Result<Exchange> {
        let response = self
            .inner
            .request(request)
            .await
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());
        if let Some(on_head) = &on_head {
            on_head(status, &headers);
        }

        let total = headers
            .get("content-length")
            .and_then(|value| value.parse::<u64>().ok());

        let mut body = response.into_body();
        let mut collected = BytesMut::new();
        let mut loaded = 0_u64;
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| Error::connection(e.to_string()))?;
            if let Ok(data) = frame.into_data() {
                loaded += data.len() as u64;
                collected.extend_from_slice(&data);
                if let Some(on_download) = &on_download {
                    on_download(loaded, total);
                }
            }
        }

        Ok(Exchange {
            status,
            headers,
            body: collected.freeze(),
        })
    }

    fn build_request(
        method: Method,
        url: &str,
        headers: &Headers,
        body: Option<Bytes>,
        on_upload: Option<UploadObserver>,
    ) -> Result<http::Request<ProgressBody>> {
        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url);

        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        let body = body.map_or_else(ProgressBody::empty, |data| ProgressBody::new(data, on_upload));

        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Lowercases response header names into a [`Headers`] map.
    fn extract_headers(headers: &http::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect()
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_default_config() {
        let client = HyperClient::new();
        assert_eq!(client.config().pool_idle_per_host, 32);
    }

    #[test]
    fn client_custom_config() {
        let client = HyperClient::with_config(
            ClientConfig::builder()
                .pool_idle_per_host(16)
                .pool_idle_timeout(Duration::from_secs(30))
                .build(),
        );

        assert_eq!(client.config().pool_idle_per_host, 16);
        assert_eq!(client.config().pool_idle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn connector_builds() {
        let _connector = HyperClient::connector();
    }

    #[test]
    fn client_is_clone_and_debug() {
        let client = HyperClient::new();
        let cloned = client.clone();
        assert!(format!("{cloned:?}").contains("HyperClient"));
    }

    #[test]
    fn build_request_sets_method_and_headers() {
        let headers = Headers::new().with("x-test", "1");
        let request = HyperClient::build_request(
            Method::Post,
            "https://api.example.com/users",
            &headers,
            Some(Bytes::from_static(b"{}")),
            None,
        )
        .expect("request");

        assert_eq!(request.method(), http::Method::POST);
        assert_eq!(
            request.headers().get("x-test").and_then(|v| v.to_str().ok()),
            Some("1")
        );
    }
}
