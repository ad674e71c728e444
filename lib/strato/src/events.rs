//! Per-request lifecycle events.
//!
//! Each request owns a single-use observer list. Listeners receive every
//! lifecycle event for one `fetch()` cycle; the list is cleared after the
//! terminal [`RequestEvent::Final`], so a request handle never leaks
//! subscriptions across reuse.

use std::sync::{Arc, Mutex, PoisonError};

use strato_core::{CallOutcome, ProgressInfo};

/// One lifecycle event of a request exchange.
///
/// Ordering within one cycle: `RequestStart`, zero or more
/// `RequestProgress`, then on response arrival `ResponseStatusChange` and
/// `ResponseStart`, zero or more `ResponseProgress`, exactly one of
/// `Success`/`Error`, and `Final` exactly once at the end.
#[derive(Debug, Clone)]
pub enum RequestEvent {
    /// The exchange is about to be dispatched.
    RequestStart,
    /// Upload progress.
    RequestProgress(ProgressInfo),
    /// The response status code became known.
    ResponseStatusChange(u16),
    /// The response phase started.
    ResponseStart,
    /// Download progress.
    ResponseProgress(ProgressInfo),
    /// The exchange succeeded; carries the final outcome.
    Success(CallOutcome),
    /// The exchange failed; carries the normalized error outcome.
    Error(CallOutcome),
    /// Terminal event, after `Success` or `Error`, with the final outcome.
    Final(CallOutcome),
}

impl RequestEvent {
    /// Stable event name, useful for logging and test assertions.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestStart => "requestStart",
            Self::RequestProgress(_) => "requestProgress",
            Self::ResponseStatusChange(_) => "responseStatusChange",
            Self::ResponseStart => "responseStart",
            Self::ResponseProgress(_) => "responseProgress",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
            Self::Final(_) => "final",
        }
    }
}

/// A subscribed event listener.
pub type EventListener = Arc<dyn Fn(&RequestEvent) + Send + Sync>;

/// The observer list of one request.
#[derive(Default)]
pub struct RequestEvents {
    listeners: Mutex<Vec<EventListener>>,
}

impl RequestEvents {
    /// Subscribes a listener for the current cycle.
    pub fn on(&self, listener: impl Fn(&RequestEvent) + Send + Sync + 'static) {
        self.lock().push(Arc::new(listener));
    }

    /// Emits an event to every listener, in subscription order.
    pub(crate) fn emit(&self, event: &RequestEvent) {
        // Snapshot so a listener subscribing re-entrantly cannot deadlock
        let listeners = self.lock().clone();
        for listener in &listeners {
            listener(event);
        }
    }

    /// Detaches every listener.
    pub fn off_all(&self) {
        self.lock().clear();
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no listener is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EventListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RequestEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEvents")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_in_subscription_order() {
        let events = RequestEvents::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            events.on(move |event| {
                seen.lock().expect("lock").push(format!("{tag}:{}", event.name()));
            });
        }

        events.emit(&RequestEvent::RequestStart);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec!["a:requestStart".to_string(), "b:requestStart".to_string()]
        );
    }

    #[test]
    fn off_all_detaches_everything() {
        let events = RequestEvents::default();
        let seen = Arc::new(Mutex::new(0_u32));

        let counter = Arc::clone(&seen);
        events.on(move |_| *counter.lock().expect("lock") += 1);
        assert_eq!(events.len(), 1);

        events.off_all();
        assert!(events.is_empty());

        events.emit(&RequestEvent::ResponseStart);
        assert_eq!(*seen.lock().expect("lock"), 0);
    }
}
