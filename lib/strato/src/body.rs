//! Request body with upload progress reporting.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::Full;

/// Observes upload progress as `(sent_bytes, total_bytes)`.
pub type UploadObserver = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// A fixed request body that reports cumulative sent bytes to an observer
/// as its frames are pulled by the connection.
pub struct ProgressBody {
    inner: Full<Bytes>,
    sent: u64,
    total: u64,
    observer: Option<UploadObserver>,
}

impl ProgressBody {
    /// Wraps body data with an optional progress observer.
    #[must_use]
    pub fn new(data: Bytes, observer: Option<UploadObserver>) -> Self {
        let total = data.len() as u64;
        Self {
            inner: Full::new(data),
            sent: 0,
            total,
            observer,
        }
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            inner: Full::default(),
            sent: 0,
            total: 0,
            observer: None,
        }
    }
}

impl Body for ProgressBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &polled {
            if let Some(data) = frame.data_ref() {
                this.sent += data.len() as u64;
                if let Some(observer) = &this.observer {
                    observer(this.sent, this.total);
                }
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl std::fmt::Debug for ProgressBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBody")
            .field("sent", &self.sent)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn reports_sent_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = {
            let seen = Arc::clone(&seen);
            Arc::new(move |sent: u64, total: u64| {
                seen.lock().expect("lock").push((sent, total));
            })
        };

        let mut body = ProgressBody::new(Bytes::from_static(b"hello"), Some(observer));
        let mut collected = Vec::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.expect("infallible");
            if let Ok(data) = frame.into_data() {
                collected.extend_from_slice(&data);
            }
        }

        assert_eq!(collected, b"hello");
        assert_eq!(*seen.lock().expect("lock"), vec![(5, 5)]);
    }

    #[tokio::test]
    async fn empty_body_ends_immediately() {
        let mut body = ProgressBody::empty();
        assert!(body.frame().await.is_none());
    }
}
