//! Use-case entry points composing builder, transport, parser and stream.

use std::sync::Arc;

use freesound_core::{
    ApiError, ApiResult, ClientConfig, FilterField, FreesoundClient, HttpResponse, Page,
    RequestDescriptor, SearchQuery, SortParameter, SoundDetail, SoundSummary, User,
};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::stream::ResultStream;
use crate::transport::HttpTransport;

/// Loader facade. Cheap to clone; clones share one transport, so
/// `cancel_all` on any clone reaches every request issued through any of
/// them.
///
/// Operations spawn their request on the current tokio runtime right away;
/// the returned stream only delivers the outcome. Errors surface unmodified
/// and are never retried.
#[derive(Debug, Clone)]
pub struct Loader {
    client: Arc<FreesoundClient>,
    transport: Arc<HttpTransport>,
}

impl Loader {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Arc::new(FreesoundClient::with_config(&config)),
            transport: Arc::new(HttpTransport::new(config.request_timeout)),
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        ClientConfig::from_env().map(Self::new)
    }

    pub fn client(&self) -> &FreesoundClient {
        &self.client
    }

    pub fn search_sounds(
        &self,
        text: &str,
        sort: Option<SortParameter>,
        filter: Option<FilterField>,
    ) -> ResultStream<Page<SoundSummary>> {
        let mut search = SearchQuery::new(text);
        if let Some(sort) = sort {
            search = search.sort(sort);
        }
        if let Some(field) = filter {
            search = search.filter_by(field);
        }
        self.search(&search)
    }

    pub fn search(&self, search: &SearchQuery) -> ResultStream<Page<SoundSummary>> {
        let descriptor = self.client.search_descriptor(search);
        self.dispatch("search", Ok(descriptor), |client, descriptor, response| {
            client.parse_sound_page_for(descriptor, response)
        })
    }

    pub fn load_sound_detail(&self, id: u64) -> ResultStream<SoundDetail> {
        let descriptor = self.client.sound_descriptor(id);
        self.dispatch("sound_detail", Ok(descriptor), |client, _, response| {
            client.parse_sound_detail(response)
        })
    }

    pub fn load_user(&self, username: &str) -> ResultStream<User> {
        let descriptor = self.client.user_descriptor(username);
        self.dispatch("user", Ok(descriptor), |client, _, response| {
            client.parse_user(response)
        })
    }

    pub fn sounds_for_user(&self, user: &User) -> ResultStream<Page<SoundSummary>> {
        let descriptor = self.client.user_sounds_descriptor(&user.username);
        self.dispatch("user_sounds", Ok(descriptor), |client, descriptor, response| {
            client.parse_sound_page_for(descriptor, response)
        })
    }

    /// Follow `page.next`. `None` on the last page.
    ///
    /// The page is bounded by the cursor's own `page_size`, and the cursor
    /// must share the configured base URL's origin.
    pub fn next_page(&self, page: &Page<SoundSummary>) -> Option<ResultStream<Page<SoundSummary>>> {
        let cursor = page.next.as_deref()?;
        let descriptor = self.client.cursor_descriptor(cursor);
        Some(self.dispatch("next_page", descriptor, |client, descriptor, response| {
            client.parse_sound_page_for(descriptor, response)
        }))
    }

    /// Cancel every outstanding request; returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        self.transport.cancel_all()
    }

    /// Cancel everything and release the HTTP session.
    pub fn dispose(&self) {
        self.transport.dispose();
    }

    pub fn in_flight(&self) -> usize {
        self.transport.in_flight()
    }

    fn dispatch<T, F>(
        &self,
        op: &'static str,
        descriptor: ApiResult<RequestDescriptor>,
        parse: F,
    ) -> ResultStream<T>
    where
        T: Send + 'static,
        F: FnOnce(&FreesoundClient, &RequestDescriptor, &HttpResponse) -> ApiResult<T> + Send + 'static,
    {
        let built = descriptor.and_then(|d| self.client.build(&d).map(|request| (d, request)));
        let (descriptor, request) = match built {
            Ok(built) => built,
            Err(e) => {
                warn!(op, error = %e, "request not dispatched");
                return ResultStream::ready(Err(e));
            }
        };
        let Ok(runtime) = Handle::try_current() else {
            return ResultStream::ready(Err(ApiError::config(format!(
                "{op} must be called from within a tokio runtime"
            ))));
        };

        let handle = self.transport.register();
        let cancel = handle.token().clone();
        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let transport = Arc::clone(&self.transport);

        runtime.spawn(async move {
            let result = {
                let handle = handle;
                debug!(op, request_id = handle.id(), url = %request.url, "dispatching");
                match transport.execute(request, &handle).await {
                    Ok(response) => {
                        debug!(op, request_id = handle.id(), status = response.status, "response received");
                        parse(&client, &descriptor, &response)
                    }
                    Err(e) => Err(e),
                }
            };
            if let Err(e) = &result {
                debug!(op, error = %e, "request failed");
            }
            // The subscriber may have gone away; then nothing is delivered.
            let _ = tx.send(result);
        });

        ResultStream::pending(rx, cancel)
    }
}
