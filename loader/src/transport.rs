//! Async HTTP host for `freesound-core` requests.
//!
//! # Design
//! One `reqwest::Client` (the session) is shared by every request and
//! created lazily on first use. Session access and the in-flight set are
//! both serialized behind mutexes, so the transport can be shared across
//! tasks and threads.
//!
//! Cancellation is coarse: `cancel_all` cancels every registered handle.
//! A handle is registered *before* its request task is spawned, so a
//! `cancel_all` issued right after a loader call still reaches it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use freesound_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, TransportFailure};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type Registry = Arc<Mutex<HashMap<u64, CancellationToken>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration of one outstanding request.
///
/// Removes itself from the transport's in-flight set when dropped.
#[derive(Debug)]
pub struct InFlight {
    id: u64,
    token: CancellationToken,
    registry: Registry,
}

impl InFlight {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.id);
    }
}

#[derive(Debug)]
pub struct HttpTransport {
    request_timeout: Duration,
    session: Mutex<Option<reqwest::Client>>,
    in_flight: Registry,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            session: Mutex::new(None),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a fresh cancellation handle to the in-flight set.
    pub fn register(&self) -> InFlight {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        lock(&self.in_flight).insert(id, token.clone());
        InFlight {
            id,
            token,
            registry: Arc::clone(&self.in_flight),
        }
    }

    /// Cancel every outstanding request. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let registry = lock(&self.in_flight);
        for token in registry.values() {
            token.cancel();
        }
        if !registry.is_empty() {
            info!(cancelled = registry.len(), "cancelled in-flight requests");
        }
        registry.len()
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn has_session(&self) -> bool {
        lock(&self.session).is_some()
    }

    /// Cancel everything and drop the session; the next request recreates it.
    pub fn dispose(&self) {
        self.cancel_all();
        if lock(&self.session).take().is_some() {
            debug!("http session disposed");
        }
    }

    fn session(&self) -> Result<reqwest::Client, ApiError> {
        let mut session = lock(&self.session);
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(concat!("freesound-loader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::network(format!("cannot create HTTP session: {e}")))?;
        debug!(timeout_ms = self.request_timeout.as_millis() as u64, "http session created");
        *session = Some(client.clone());
        Ok(client)
    }

    /// Perform one exchange, resolving early with `Cancelled` when `handle`
    /// is cancelled.
    pub async fn execute(&self, request: HttpRequest, handle: &InFlight) -> Result<HttpResponse, ApiError> {
        if handle.is_cancelled() {
            return Err(ApiError::cancelled());
        }
        let client = self.session()?;

        let exchange = async {
            let mut builder = match request.method {
                HttpMethod::Get => client.get(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(transport_error)?;
            Ok::<_, ApiError>(HttpResponse::new(status, body))
        };

        tokio::select! {
            biased;
            _ = handle.token().cancelled() => {
                debug!(request_id = handle.id(), "request cancelled");
                Err(ApiError::cancelled())
            }
            result = exchange => result,
        }
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Transport(TransportFailure::Timeout)
    } else {
        ApiError::network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_all_with_nothing_in_flight_is_a_no_op() {
        let transport = HttpTransport::new(Duration::from_secs(1));
        assert_eq!(transport.cancel_all(), 0);
        assert_eq!(transport.cancel_all(), 0);
        assert_eq!(transport.in_flight(), 0);
    }

    #[test]
    fn handles_unregister_on_drop() {
        let transport = HttpTransport::new(Duration::from_secs(1));
        let a = transport.register();
        let b = transport.register();
        assert_ne!(a.id(), b.id());
        assert_eq!(transport.in_flight(), 2);
        drop(a);
        assert_eq!(transport.in_flight(), 1);
        drop(b);
        assert_eq!(transport.in_flight(), 0);
    }

    #[test]
    fn cancel_all_reaches_every_handle() {
        let transport = HttpTransport::new(Duration::from_secs(1));
        let a = transport.register();
        let b = transport.register();
        assert_eq!(transport.cancel_all(), 2);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());

        // Later registrations start fresh.
        let c = transport.register();
        assert!(!c.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_handle_short_circuits_without_a_session() {
        let transport = HttpTransport::new(Duration::from_secs(1));
        let handle = transport.register();
        transport.cancel_all();
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "http://127.0.0.1:9/never".to_string(),
            headers: Vec::new(),
        };
        let err = transport.execute(request, &handle).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!transport.has_session());
    }

    #[test]
    fn dispose_without_session_is_harmless() {
        let transport = HttpTransport::new(Duration::from_secs(1));
        transport.dispose();
        assert!(!transport.has_session());
    }
}
