//! Immutable descriptions of API calls.
//!
//! A `RequestDescriptor` says *what* to ask for; `RequestBuilder` turns it
//! into bytes on the wire. Keeping the two apart lets callers inspect and
//! compare calls before anything is encoded.

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::error::ApiError;
use crate::http::HttpMethod;

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Path segments joined under the API base, with a trailing slash.
    Relative(Vec<String>),
    /// A cursor URL handed out by the server, used as-is apart from its query.
    Absolute(Url),
}

impl Endpoint {
    pub fn path<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Endpoint::Relative(segments.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Relative(segments) => write!(f, "/{}/", segments.join("/")),
            Endpoint::Absolute(url) => write!(f, "{url}"),
        }
    }
}

/// Page-number pagination, emitted as `page` and `page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub number: u32,
    pub size: u32,
}

impl Pagination {
    pub fn first(size: u32) -> Self {
        Self { number: 1, size }
    }
}

/// Immutable specification of one API call before transport.
///
/// Query keys are unique: inserting an existing key replaces its value.
/// Values are stored raw and percent-encoded by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    endpoint: Endpoint,
    method: HttpMethod,
    query: BTreeMap<String, String>,
    pagination: Option<Pagination>,
    auth_required: bool,
}

impl RequestDescriptor {
    pub fn get(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            method: HttpMethod::Get,
            query: BTreeMap::new(),
            pagination: None,
            auth_required: false,
        }
    }

    /// Descriptor for a `next`/`previous` cursor taken from a page.
    ///
    /// The cursor's own query pairs are carried over; `page` and `page_size`
    /// become the descriptor's pagination.
    pub fn from_cursor(cursor: &str, auth_required: bool) -> Result<Self, ApiError> {
        let mut url = Url::parse(cursor)
            .map_err(|e| ApiError::config(format!("invalid page cursor {cursor:?}: {e}")))?;

        let mut query = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            query.insert(key.into_owned(), value.into_owned());
        }
        url.set_query(None);

        let number = take_number(&mut query, "page")?;
        let size = take_number(&mut query, "page_size")?;
        let pagination = match (number, size) {
            (Some(number), Some(size)) => Some(Pagination { number, size }),
            (number, size) => {
                // Half a pagination pair stays a plain query parameter.
                if let Some(n) = number {
                    query.insert("page".to_string(), n.to_string());
                }
                if let Some(s) = size {
                    query.insert("page_size".to_string(), s.to_string());
                }
                None
            }
        };

        Ok(Self {
            endpoint: Endpoint::Absolute(url),
            method: HttpMethod::Get,
            query,
            pagination,
            auth_required,
        })
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.auth_required = true;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Every parameter that goes on the wire, pagination included, in the
    /// order the builder emits them.
    pub fn query_params(&self) -> BTreeMap<String, String> {
        let mut params = self.query.clone();
        if let Some(p) = self.pagination {
            params.insert("page".to_string(), p.number.to_string());
            params.insert("page_size".to_string(), p.size.to_string());
        }
        params
    }
}

fn take_number(query: &mut BTreeMap<String, String>, key: &str) -> Result<Option<u32>, ApiError> {
    match query.remove(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::config(format!("cursor parameter {key}={raw:?} is not a number"))),
    }
}

/// Result ordering for text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortParameter {
    #[default]
    Relevance,
    Duration,
    Rating,
    Downloads,
}

impl SortParameter {
    pub fn token(&self) -> &'static str {
        match self {
            SortParameter::Relevance => "score",
            SortParameter::Duration => "duration_asc",
            SortParameter::Rating => "rating_desc",
            SortParameter::Downloads => "downloads_desc",
        }
    }
}

/// Field a search can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Username,
    Tag,
    Description,
    Comment,
}

impl FilterField {
    pub fn token(&self) -> &'static str {
        match self {
            FilterField::Username => "username",
            FilterField::Tag => "tag",
            FilterField::Description => "description",
            FilterField::Comment => "comment",
        }
    }
}

/// One active filter, rendered as `field:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: FilterField,
    pub value: String,
}

impl Filter {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.chars().any(char::is_whitespace) {
            write!(f, "{}:\"{}\"", self.field.token(), self.value.replace('"', "\\\""))
        } else {
            write!(f, "{}:{}", self.field.token(), self.value)
        }
    }
}

/// Sort and filter selection for a text search.
///
/// At most one filter is active. Selecting a filter field moves the search
/// text into the filter, so the request carries either `query` or `filter`,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    text: String,
    sort: Option<SortParameter>,
    filter: Option<Filter>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sort: None,
            filter: None,
        }
    }

    pub fn sort(mut self, sort: SortParameter) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Scope the search text to `field`.
    pub fn filter_by(mut self, field: FilterField) -> Self {
        let value = std::mem::take(&mut self.text);
        let value = match self.filter.take() {
            Some(previous) if value.is_empty() => previous.value,
            _ => value,
        };
        self.filter = Some(Filter::new(field, value));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sort_parameter(&self) -> Option<SortParameter> {
        self.sort
    }

    pub fn active_filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_query_value_replaces_earlier() {
        let d = RequestDescriptor::get(Endpoint::path(["search", "text"]))
            .query("sort", "score")
            .query("sort", "rating_desc");
        let params = d.query_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params["sort"], "rating_desc");
    }

    #[test]
    fn pagination_shows_up_in_query_params() {
        let d = RequestDescriptor::get(Endpoint::path(["search", "text"]))
            .paginate(Pagination { number: 3, size: 20 });
        let params = d.query_params();
        assert_eq!(params["page"], "3");
        assert_eq!(params["page_size"], "20");
    }

    #[test]
    fn cursor_splits_pagination_from_query() {
        let d = RequestDescriptor::from_cursor(
            "https://freesound.org/apiv2/search/text/?query=piano&page=2&page_size=15",
            true,
        )
        .unwrap();
        assert_eq!(d.pagination(), Some(Pagination { number: 2, size: 15 }));
        assert!(d.auth_required());
        let Endpoint::Absolute(url) = d.endpoint() else {
            panic!("cursor must produce an absolute endpoint");
        };
        assert_eq!(url.as_str(), "https://freesound.org/apiv2/search/text/");
        assert_eq!(d.query_params()["query"], "piano");
    }

    #[test]
    fn cursor_rejects_garbage() {
        let err = RequestDescriptor::from_cursor("not a url", false).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn cursor_rejects_non_numeric_page() {
        let err = RequestDescriptor::from_cursor("https://x.test/a/?page=two", false).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn filter_moves_text_out_of_query() {
        let q = SearchQuery::new("alice").filter_by(FilterField::Username);
        assert_eq!(q.text(), "");
        assert_eq!(q.active_filter().unwrap().to_string(), "username:alice");
    }

    #[test]
    fn reselecting_filter_keeps_value() {
        let q = SearchQuery::new("rain")
            .filter_by(FilterField::Tag)
            .filter_by(FilterField::Description);
        let filter = q.active_filter().unwrap();
        assert_eq!(filter.field, FilterField::Description);
        assert_eq!(filter.value, "rain");
    }

    #[test]
    fn filter_value_with_spaces_is_quoted() {
        let filter = Filter::new(FilterField::Tag, "field recording");
        assert_eq!(filter.to_string(), "tag:\"field recording\"");
    }

    #[test]
    fn sort_tokens() {
        assert_eq!(SortParameter::Relevance.token(), "score");
        assert_eq!(SortParameter::Duration.token(), "duration_asc");
        assert_eq!(SortParameter::Rating.token(), "rating_desc");
        assert_eq!(SortParameter::Downloads.token(), "downloads_desc");
    }

    #[test]
    fn relative_endpoint_display() {
        assert_eq!(Endpoint::path(["sounds", "42"]).to_string(), "/sounds/42/");
    }
}
