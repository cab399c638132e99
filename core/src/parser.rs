//! Status policy and typed decoding of raw responses.
//!
//! Only a `200` is decoded. Every other status becomes
//! `ApiError::ServerStatus` carrying the canonical reason phrase, and the
//! body is dropped unread.

use ::http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::types::Page;

/// Map anything but `200 OK` to `ServerStatus`.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::ServerStatus {
        code: response.status,
        message: reason_phrase(response.status).to_string(),
    })
}

pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
}

/// Decode a single top-level entity.
pub fn parse_entity<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| {
        debug!(error = %e, "entity payload rejected");
        ApiError::decode(e.to_string())
    })
}

/// Decode a `{count, next, previous, results}` envelope.
///
/// One malformed element fails the whole page. A page with more elements
/// than `page_size` is rejected as well.
pub fn parse_page<T: DeserializeOwned>(
    response: &HttpResponse,
    page_size: u32,
) -> Result<Page<T>, ApiError> {
    check_status(response)?;
    let page: Page<T> = serde_json::from_str(&response.body).map_err(|e| {
        debug!(error = %e, "page payload rejected");
        ApiError::decode(e.to_string())
    })?;
    if page.results.len() > page_size as usize {
        return Err(ApiError::decode(format!(
            "page holds {} results, more than the requested {page_size}",
            page.results.len()
        )));
    }
    Ok(page)
}
