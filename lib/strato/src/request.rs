//! Request execution: state machine, events, and outcome normalization.
//!
//! A [`Request`] is a cheap cloneable handle around one execution context.
//! `fetch()` runs idle -> sending -> (success | error | cancelled | timeout)
//! -> final. Expected exchange failures resolve to a normalized
//! [`CallOutcome`]; only configuration mistakes, the abort-on-fetch
//! sentinel, and interceptor failures surface as `Err`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use strato_core::{
    CallOutcome, CallStatus, Error, ErrorBody, Headers, Method, Payload, ProgressInfo,
    ResponseSnapshot, Result, TimeDetails,
};
use tokio::sync::watch;

use crate::client::{Exchange, HyperClient, TransferHooks};
use crate::config::ResolvedConfig;
use crate::events::{RequestEvent, RequestEvents};
use crate::middleware::{ConfigResolver, Middleware};

/// Message carried by cancelled outcomes.
pub const CANCELLED_MESSAGE: &str = "Request was cancelled";

/// Message carried by timed-out outcomes.
pub const TIMEOUT_MESSAGE: &str = "Request was ended due to timeout";

/// An executable request bound to one resolved href.
#[derive(Clone, Debug)]
pub struct Request {
    inner: Arc<Inner>,
}

#[derive(derive_more::Debug)]
struct Inner {
    href: String,
    method: Method,
    payload: Option<Payload>,
    resolver: ConfigResolver,
    #[debug(skip)]
    client: HyperClient,
    events: RequestEvents,
    // Single-flight bookkeeping. Every fetch gets a generation from
    // `fetch_seq`; `active` holds the generation of the in-flight fetch (0
    // when idle) and the abort slot is tagged with it, so a superseded
    // fetch resuming late cannot clobber the state of the fetch that
    // replaced it.
    fetch_seq: AtomicU64,
    active: AtomicU64,
    #[debug(skip)]
    abort: Mutex<Option<(u64, watch::Sender<bool>)>>,
}

impl Request {
    pub(crate) fn new(
        href: String,
        method: Method,
        payload: Option<Payload>,
        resolver: ConfigResolver,
        client: HyperClient,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                href,
                method,
                payload,
                resolver,
                client,
                events: RequestEvents::default(),
                fetch_seq: AtomicU64::new(0),
                active: AtomicU64::new(0),
                abort: Mutex::new(None),
            }),
        }
    }

    /// The fully resolved URL.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.inner.href
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.inner.method
    }

    /// Returns `true` while an exchange is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst) != 0
    }

    /// Subscribes a lifecycle listener for the current cycle. All listeners
    /// are detached after the terminal event.
    pub fn on(&self, listener: impl Fn(&RequestEvent) + Send + Sync + 'static) {
        self.inner.events.on(listener);
    }

    /// The event channel of this request.
    #[must_use]
    pub fn events(&self) -> &RequestEvents {
        &self.inner.events
    }

    /// Returns `true` when any of the given middlewares created this
    /// request (or a settled variant sharing its identity did).
    #[must_use]
    pub fn created_by(&self, middlewares: &[&Middleware]) -> bool {
        middlewares
            .iter()
            .any(|middleware| middleware.id() == self.inner.resolver.middleware_id)
    }

    /// Aborts the pending exchange, if any. Best-effort: observed through
    /// the error and final events with a cancelled outcome, never as a
    /// distinct rejection of the pending `fetch()`.
    pub fn abort(&self) {
        if let Some((_, sender)) = self.lock_abort().take() {
            let _ = sender.send(true);
        }
    }

    /// Executes the exchange and resolves to a normalized outcome.
    ///
    /// The configuration cascade is resolved now, not at construction, so
    /// builder mutations made since `get_request` are honored.
    ///
    /// # Errors
    ///
    /// - [`Error::AbortOnFetch`] when a fetch is already pending and the
    ///   endpoint disabled abort-on-fetch.
    /// - [`Error::FormDataMismatch`] when the endpoint expects form data but
    ///   the payload is not a form (fails before any I/O).
    /// - [`Error::Interceptor`] when a response interceptor fails.
    pub async fn fetch(&self) -> Result<CallOutcome> {
        let resolved = self.inner.resolver.resolve();

        if self.is_loading() {
            if resolved.abort_on_fetch {
                tracing::debug!(url = %self.inner.href, "aborting pending exchange before refetch");
                self.abort();
            } else {
                tracing::warn!(
                    url = %self.inner.href,
                    "fetch while a request is pending and abort-on-fetch is disabled"
                );
                return Err(Error::AbortOnFetch);
            }
        }

        // Fail fast, before any transient state or I/O
        let _ = url::Url::parse(&self.inner.href)?;
        let body = self.encode_body(&resolved)?;

        let generation = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.active.store(generation, Ordering::SeqCst);
        let (abort_tx, mut abort_rx) = watch::channel(false);
        *self.lock_abort() = Some((generation, abort_tx));

        tracing::info!(method = %self.inner.method, url = %self.inner.href, "dispatching request");
        self.inner.events.emit(&RequestEvent::RequestStart);

        let headers = self.build_headers(&resolved, body.as_ref());
        let started = Instant::now();
        let response_phase: Arc<Mutex<Option<(u64, Instant)>>> = Arc::new(Mutex::new(None));
        let hooks = self.transfer_hooks(started, &response_phase);

        let exchange = tokio::select! {
            result = self.inner.client.execute(
                self.inner.method,
                &self.inner.href,
                &headers,
                body.map(|(_, bytes)| bytes),
                resolved.effective_timeout(),
                hooks,
            ) => Some(result),
            _ = abort_rx.changed() => None,
        };

        let finish_time = now_millis();
        let start_time = response_phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(finish_time, |(epoch, _)| epoch);
        let time = TimeDetails {
            start_time,
            finish_time,
            delta: finish_time.saturating_sub(start_time),
        };

        let outcome = Self::classify(exchange, &resolved, time);

        // Release single-flight state before the pipeline so an interceptor
        // can re-issue fetch() on this same handle. Guarded by generation: a
        // fetch that was superseded must not release the state of the fetch
        // that replaced it.
        let _ = self.inner.active.compare_exchange(
            generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        {
            let mut slot = self.lock_abort();
            if slot.as_ref().is_some_and(|(owner, _)| *owner == generation) {
                *slot = None;
            }
        }

        let outcome = if resolved.disable_interception {
            outcome
        } else {
            self.run_response_interceptors(outcome, &resolved).await?
        };

        if outcome.is_success() {
            self.inner.events.emit(&RequestEvent::Success(outcome.clone()));
        } else {
            tracing::warn!(
                url = %self.inner.href,
                status = %outcome.status,
                status_code = outcome.details.status_code,
                "request failed"
            );
            self.inner.events.emit(&RequestEvent::Error(outcome.clone()));
        }
        self.inner.events.emit(&RequestEvent::Final(outcome.clone()));
        self.inner.events.off_all();

        Ok(outcome)
    }

    /// Encodes the payload, enforcing the form-data declaration.
    fn encode_body(&self, resolved: &ResolvedConfig) -> Result<Option<(Option<String>, Bytes)>> {
        match &self.inner.payload {
            Some(payload) => {
                if resolved.is_form_data && !payload.is_form() {
                    return Err(Error::FormDataMismatch);
                }
                payload.encode().map(Some)
            }
            None => Ok(None),
        }
    }

    /// Assembles the final header set for one exchange.
    fn build_headers(
        &self,
        resolved: &ResolvedConfig,
        body: Option<&(Option<String>, Bytes)>,
    ) -> Headers {
        let mut headers = Headers::new();

        if let Some(callback) = &resolved.token_callback {
            if let Some(token) = callback() {
                if !token.is_empty() {
                    headers.insert(
                        "authorization",
                        format!("{} {token}", resolved.token_prefix),
                    );
                }
            }
        }

        let is_form = matches!(self.inner.payload, Some(Payload::Form(_)));
        if !is_form && resolved.response_mode.is_json() {
            headers.insert("content-type", "application/json");
        }

        headers.extend(resolved.headers.clone());

        if let Some(source) = &resolved.header_source {
            headers = source.apply(headers);
        }

        if !resolved.disable_interception {
            for interceptor in &resolved.request_interceptors {
                headers = interceptor.apply(&resolved.auxiliary, headers);
            }
        }

        headers.drop_empty();

        // Multipart bodies carry their boundary content type unless a
        // header already claimed it
        if let Some((Some(content_type), _)) = body {
            if !headers.contains("content-type") {
                headers.insert("content-type", content_type.clone());
            }
        }

        headers
    }

    /// Wires transfer observers to the event channel.
    fn transfer_hooks(
        &self,
        started: Instant,
        response_phase: &Arc<Mutex<Option<(u64, Instant)>>>,
    ) -> TransferHooks {
        let on_upload = {
            let handle = self.clone();
            Arc::new(move |sent: u64, total: u64| {
                let elapsed = started.elapsed().as_secs_f64() * 1000.0;
                let info = ProgressInfo::compute(sent, Some(total), elapsed);
                handle.inner.events.emit(&RequestEvent::RequestProgress(info));
            })
        };

        let on_head = {
            let handle = self.clone();
            let response_phase = Arc::clone(response_phase);
            Arc::new(move |status: u16, _headers: &Headers| {
                *response_phase
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) =
                    Some((now_millis(), Instant::now()));
                handle
                    .inner
                    .events
                    .emit(&RequestEvent::ResponseStatusChange(status));
                handle.inner.events.emit(&RequestEvent::ResponseStart);
            })
        };

        let on_download = {
            let handle = self.clone();
            let response_phase = Arc::clone(response_phase);
            Arc::new(move |loaded: u64, total: Option<u64>| {
                let baseline = response_phase
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .map_or(started, |(_, instant)| instant);
                let elapsed = baseline.elapsed().as_secs_f64() * 1000.0;
                let info = ProgressInfo::compute(loaded, total, elapsed);
                handle
                    .inner
                    .events
                    .emit(&RequestEvent::ResponseProgress(info));
            })
        };

        TransferHooks {
            on_upload: Some(on_upload),
            on_head: Some(on_head),
            on_download: Some(on_download),
        }
    }

    /// Normalizes the raw exchange result into a [`CallOutcome`].
    fn classify(
        exchange: Option<Result<Exchange>>,
        resolved: &ResolvedConfig,
        time: TimeDetails,
    ) -> CallOutcome {
        match exchange {
            None => CallOutcome::failure(
                ErrorBody {
                    original_error: serde_json::Value::String(CANCELLED_MESSAGE.to_string()),
                    formatted_message: CANCELLED_MESSAGE.to_string(),
                    status: CallStatus::Cancelled,
                    status_code: 0,
                },
                time,
                None,
            ),
            Some(Err(Error::Timeout)) => CallOutcome::failure(
                ErrorBody {
                    original_error: serde_json::Value::String(TIMEOUT_MESSAGE.to_string()),
                    formatted_message: TIMEOUT_MESSAGE.to_string(),
                    status: CallStatus::Timeout,
                    status_code: 0,
                },
                time,
                None,
            ),
            Some(Err(err)) => {
                // No status code was ever obtained
                let original_error = serde_json::Value::String(err.to_string());
                let formatted_message = (resolved.error_mapper)(&original_error);
                CallOutcome::failure(
                    ErrorBody {
                        original_error,
                        formatted_message,
                        status: CallStatus::None,
                        status_code: 0,
                    },
                    time,
                    None,
                )
            }
            Some(Ok(exchange)) => {
                let snapshot = ResponseSnapshot {
                    status_code: exchange.status,
                    headers: exchange.headers.clone(),
                };
                let success = (200..400).contains(&exchange.status);
                let force_text = !success
                    && exchange
                        .headers
                        .get("content-type")
                        .is_some_and(|value| value.starts_with("text/plain"));
                let value = resolved.response_mode.decode(&exchange.body, force_text);

                if success {
                    CallOutcome::success(value, exchange.status, time, Some(snapshot))
                } else {
                    let formatted_message = (resolved.error_mapper)(&value);
                    CallOutcome::failure(
                        ErrorBody {
                            original_error: value,
                            formatted_message,
                            status: CallStatus::Error,
                            status_code: exchange.status,
                        },
                        time,
                        Some(snapshot),
                    )
                }
            }
        }
    }

    /// Runs the response interceptor pipeline, strictly in sequence.
    async fn run_response_interceptors(
        &self,
        outcome: CallOutcome,
        resolved: &ResolvedConfig,
    ) -> Result<CallOutcome> {
        let mut current = outcome;
        for interceptor in &resolved.response_interceptors {
            match interceptor.apply(current, self.clone()).await {
                Ok(next) => current = next,
                Err(err) => {
                    tracing::warn!(url = %self.inner.href, error = %err, "response interceptor failed");
                    self.inner.events.off_all();
                    return Err(match err {
                        Error::Interceptor(_) => err,
                        other => Error::interceptor(other.to_string()),
                    });
                }
            }
        }
        Ok(current)
    }

    fn lock_abort(&self) -> std::sync::MutexGuard<'_, Option<(u64, watch::Sender<bool>)>> {
        self.inner
            .abort
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
