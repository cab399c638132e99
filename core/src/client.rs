//! Stateless request builder and response parser for the Freesound API.
//!
//! # Design
//! `FreesoundClient` holds configuration only and carries no mutable state
//! between calls. Each use case is split into a `*_descriptor` method (what
//! to ask), a `build_*` method producing an `HttpRequest`, and a `parse_*`
//! method consuming an `HttpResponse`. The caller executes the HTTP
//! round-trip in between, keeping this crate free of I/O.

use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::descriptor::{Endpoint, Pagination, RequestDescriptor, SearchQuery};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::parser::{parse_entity, parse_page};
use crate::types::{Page, SoundDetail, SoundSummary, User};

/// Fields requested for list projections.
pub const SUMMARY_FIELDS: &str = "id,name,username,type,num_downloads,duration,tags";

#[derive(Debug, Clone)]
pub struct FreesoundClient {
    builder: RequestBuilder,
    page_size: u32,
}

impl FreesoundClient {
    /// Client for `base_url` with default settings and no credentials.
    pub fn new(base_url: &str) -> Self {
        Self::with_config(&ClientConfig::new(base_url))
    }

    pub fn with_config(config: &ClientConfig) -> Self {
        Self {
            builder: RequestBuilder::from_config(config),
            page_size: config.page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    // Descriptors

    pub fn search_descriptor(&self, search: &SearchQuery) -> RequestDescriptor {
        let mut d = RequestDescriptor::get(Endpoint::path(["search", "text"]))
            .query("fields", SUMMARY_FIELDS)
            .paginate(Pagination::first(self.page_size))
            .authenticated();
        match search.active_filter() {
            Some(filter) => d = d.query("filter", filter.to_string()),
            None => d = d.query("query", search.text()),
        }
        if let Some(sort) = search.sort_parameter() {
            d = d.query("sort", sort.token());
        }
        d
    }

    pub fn sound_descriptor(&self, id: u64) -> RequestDescriptor {
        RequestDescriptor::get(Endpoint::path(["sounds".to_string(), id.to_string()])).authenticated()
    }

    pub fn user_descriptor(&self, username: &str) -> RequestDescriptor {
        RequestDescriptor::get(Endpoint::path(["users", username]))
    }

    pub fn user_sounds_descriptor(&self, username: &str) -> RequestDescriptor {
        RequestDescriptor::get(Endpoint::path(["users", username, "sounds"]))
            .query("fields", SUMMARY_FIELDS)
            .paginate(Pagination::first(self.page_size))
            .authenticated()
    }

    /// Descriptor following a page's `next` or `previous` cursor.
    pub fn cursor_descriptor(&self, cursor: &str) -> Result<RequestDescriptor, ApiError> {
        RequestDescriptor::from_cursor(cursor, true)
    }

    // Build

    pub fn build(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, ApiError> {
        self.builder.build(descriptor)
    }

    pub fn build_search(&self, search: &SearchQuery) -> Result<HttpRequest, ApiError> {
        self.build(&self.search_descriptor(search))
    }

    pub fn build_sound_detail(&self, id: u64) -> Result<HttpRequest, ApiError> {
        self.build(&self.sound_descriptor(id))
    }

    pub fn build_user(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.build(&self.user_descriptor(username))
    }

    pub fn build_user_sounds(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.build(&self.user_sounds_descriptor(username))
    }

    pub fn build_page(&self, cursor: &str) -> Result<HttpRequest, ApiError> {
        self.build(&self.cursor_descriptor(cursor)?)
    }

    // Parse

    /// Parse a page bounded by the configured page size.
    pub fn parse_sound_page(&self, response: &HttpResponse) -> Result<Page<SoundSummary>, ApiError> {
        parse_page(response, self.page_size)
    }

    /// Parse a page fetched with `descriptor`, bounded by the page size that
    /// request asked for. Cursors carry their own `page_size`.
    pub fn parse_sound_page_for(
        &self,
        descriptor: &RequestDescriptor,
        response: &HttpResponse,
    ) -> Result<Page<SoundSummary>, ApiError> {
        let requested = descriptor.pagination().map_or(self.page_size, |p| p.size);
        parse_page(response, requested)
    }

    /// Parse the response to `build_page(cursor)`.
    pub fn parse_cursor_page(&self, cursor: &str, response: &HttpResponse) -> Result<Page<SoundSummary>, ApiError> {
        self.parse_sound_page_for(&self.cursor_descriptor(cursor)?, response)
    }

    pub fn parse_sound_detail(&self, response: &HttpResponse) -> Result<SoundDetail, ApiError> {
        parse_entity(response)
    }

    pub fn parse_user(&self, response: &HttpResponse) -> Result<User, ApiError> {
        parse_entity(response)
    }
}
