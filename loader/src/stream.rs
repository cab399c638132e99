//! Single-resolution async delivery of one request outcome.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use freesound_core::{ApiError, ApiResult, TransportFailure};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// One-shot result of a loader call.
///
/// Resolves exactly once with either a value or an `ApiError`. Awaiting
/// consumes the stream, so it cannot be subscribed to twice. Dropping it, or
/// calling [`ResultStream::cancel`], before it resolves cancels the
/// underlying request and nothing is delivered.
#[must_use = "a ResultStream cancels its request when dropped"]
#[derive(Debug)]
pub struct ResultStream<T> {
    rx: oneshot::Receiver<ApiResult<T>>,
    cancel: CancellationToken,
    resolved: bool,
}

impl<T> Unpin for ResultStream<T> {}

impl<T> ResultStream<T> {
    pub(crate) fn pending(rx: oneshot::Receiver<ApiResult<T>>, cancel: CancellationToken) -> Self {
        Self {
            rx,
            cancel,
            resolved: false,
        }
    }

    /// A stream whose outcome is already known.
    pub fn ready(result: ApiResult<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(result);
        Self::pending(rx, CancellationToken::new())
    }

    /// Abandon the request. No value or error will be delivered.
    pub fn cancel(self) {
        self.cancel.cancel();
    }
}

impl<T> Future for ResultStream<T> {
    type Output = ApiResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(result)) => result,
            Poll::Ready(Err(_)) => Err(ApiError::Transport(TransportFailure::Aborted)),
        };
        self.resolved = true;
        Poll::Ready(outcome)
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        if !self.resolved {
            self.cancel.cancel();
        }
    }
}
