//! Async loader for the Freesound API.
//!
//! # Overview
//! Hosts `freesound-core` on tokio: `HttpTransport` performs the exchanges
//! over a shared reqwest session, `Loader` exposes one operation per use
//! case, and each operation hands back a `ResultStream` that resolves once
//! with the typed result or an `ApiError`.
//!
//! # Design
//! - Requests start when the operation is called, not when the stream is
//!   awaited.
//! - `Loader::cancel_all` is coarse and reaches every outstanding request;
//!   dropping a stream abandons only that stream's request.
//! - No retries. Every failure is delivered through the stream.

pub mod loader;
pub mod stream;
pub mod transport;

pub use freesound_core::{
    ApiError, ApiResult, ClientConfig, Credentials, FilterField, Page, SearchQuery, SortParameter,
    SoundDetail, SoundSummary, TransportFailure, User,
};
pub use loader::Loader;
pub use stream::ResultStream;
pub use transport::{HttpTransport, InFlight};
