//! Turns `RequestDescriptor`s into transport-ready `HttpRequest`s.
//!
//! # Design
//! `build` is pure: no I/O, no clock, no randomness. The same descriptor and
//! configuration always produce the same bytes. Query parameters are emitted
//! in sorted key order and percent-encoded, spaces as `%20`; path segments are
//! encoded one by one so user-supplied names cannot inject separators.
//!
//! Credentials only travel to the base URL's origin. An authenticated
//! absolute endpoint (a page cursor) on any other scheme, host or port is a
//! `Config` error.

use url::{form_urlencoded, Url};

use crate::config::{ClientConfig, Credentials};
use crate::descriptor::{Endpoint, RequestDescriptor};
use crate::error::ApiError;
use crate::http::HttpRequest;

pub const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    credentials: Option<Credentials>,
}

impl RequestBuilder {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, config.credentials.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, ApiError> {
        let mut url = match descriptor.endpoint() {
            Endpoint::Relative(segments) => self.join(segments)?,
            Endpoint::Absolute(url) => {
                if descriptor.auth_required() {
                    self.check_same_origin(url)?;
                }
                url.clone()
            }
        };

        let params = descriptor.query_params();
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }

        let mut headers = Vec::new();
        if descriptor.auth_required() {
            headers.push((AUTHORIZATION.to_string(), self.authorization(descriptor)?));
        }

        Ok(HttpRequest {
            method: descriptor.method(),
            url: url.into(),
            headers,
        })
    }

    fn base(&self) -> Result<Url, ApiError> {
        Url::parse(&self.base_url).map_err(|e| ApiError::config(format!("invalid base URL {:?}: {e}", self.base_url)))
    }

    fn join(&self, segments: &[String]) -> Result<Url, ApiError> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| ApiError::config(format!("base URL {:?} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn check_same_origin(&self, url: &Url) -> Result<(), ApiError> {
        let base = self.base()?;
        if url.origin() == base.origin() {
            return Ok(());
        }
        Err(ApiError::config(format!(
            "refusing to send credentials to {}, outside the base URL origin {}",
            url.origin().ascii_serialization(),
            base.origin().ascii_serialization()
        )))
    }

    fn authorization(&self, descriptor: &RequestDescriptor) -> Result<String, ApiError> {
        match &self.credentials {
            Some(creds) if creds.is_complete() => Ok(format!("Token {}", creds.client_secret)),
            _ => Err(ApiError::config(format!(
                "client credentials are required for {} but are not configured",
                descriptor.endpoint()
            ))),
        }
    }
}

/// Percent-encode one query key or value. `+` from the form serializer
/// becomes `%20`; a literal `+` was already escaped to `%2B`.
fn encode_component(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
