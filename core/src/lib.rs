//! Sans-IO client core for the Freesound API.
//!
//! # Overview
//! Describes API calls as `RequestDescriptor`s, builds them into
//! `HttpRequest` values and parses `HttpResponse` values without touching
//! the network (host-does-IO pattern). The async loader and the C ABI are
//! two hosts of this crate.
//!
//! # Design
//! - `FreesoundClient` is stateless: configuration only.
//! - Each use case is a `build_*` / `parse_*` pair so the I/O boundary is
//!   explicit.
//! - Any non-200 status becomes `ApiError::ServerStatus` before decoding.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod builder;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod parser;
pub mod types;

pub use builder::RequestBuilder;
pub use client::FreesoundClient;
pub use config::{ClientConfig, Credentials};
pub use descriptor::{Endpoint, Filter, FilterField, Pagination, RequestDescriptor, SearchQuery, SortParameter};
pub use error::{ApiError, ApiResult, TransportFailure};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{Avatar, Page, Previews, SoundDetail, SoundSummary, User};
