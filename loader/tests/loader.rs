//! Loader behavior against the live mock server.

use std::time::Duration;

use freesound_loader::{
    ApiError, ClientConfig, Credentials, FilterField, Loader, Page, SoundSummary, SortParameter,
    TransportFailure, User,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Bind a random port and serve the fixture catalog with `latency`.
async fn start_mock_server(latency: Duration) -> String {
    init_tracing();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::from_std(listener).unwrap();
        mock_server::run_with_latency(listener, latency).await.unwrap();
    });
    format!("http://{addr}")
}

fn loader(base_url: &str) -> Loader {
    Loader::new(
        ClientConfig::new(base_url)
            .with_credentials(Credentials::new("client", "secret"))
            .with_request_timeout(Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn search_piano_by_relevance() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = loader(&base);

    let page = loader
        .search_sounds("piano", Some(SortParameter::Relevance), None)
        .await
        .unwrap();

    assert_eq!(page.count, 2);
    assert!(page.next.is_none());
    let names: Vec<_> = page.results.iter().map(|s| (s.name.as_str(), s.username.as_str())).collect();
    assert_eq!(names, [("Piano C4", "alice"), ("Piano loop", "bob")]);
    assert_eq!(loader.in_flight(), 0);
}

#[tokio::test]
async fn search_with_filter_and_sort() {
    let base = start_mock_server(Duration::ZERO).await;
    let page = loader(&base)
        .search_sounds("drum", Some(SortParameter::Downloads), Some(FilterField::Tag))
        .await
        .unwrap();

    let names: Vec<_> = page.results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Kick drum 808", "Snare roll"]);
}

#[tokio::test]
async fn missing_sound_is_server_status() {
    let base = start_mock_server(Duration::ZERO).await;
    let err = loader(&base).load_sound_detail(999).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::ServerStatus {
            code: 404,
            message: "Not Found".to_string()
        }
    );
}

#[tokio::test]
async fn sound_detail_decodes_nested_fields() {
    let base = start_mock_server(Duration::ZERO).await;
    let detail = loader(&base).load_sound_detail(1003).await.unwrap();
    assert_eq!(detail.name, "Rain on window");
    assert_eq!(detail.kind.as_deref(), Some("flac"));
    assert_eq!(detail.tags.len(), 3);
    let previews = detail.previews.unwrap();
    assert!(previews.preview_lq_ogg.unwrap().ends_with("/previews/1003-lq.ogg"));
}

#[tokio::test]
async fn user_then_their_sounds() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = loader(&base);

    let user = loader.load_user("carol").await.unwrap();
    assert_eq!(user.num_sounds, Some(2));
    assert_eq!(user.avatar.as_ref().unwrap().large, None);

    let page = loader.sounds_for_user(&user).await.unwrap();
    assert_eq!(page.count, 2);
    assert!(page.results.iter().all(|s| s.username == "carol"));
}

#[tokio::test]
async fn next_page_walks_to_the_end() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = Loader::new(
        ClientConfig::new(&base)
            .with_credentials(Credentials::new("client", "secret"))
            .with_page_size(2),
    );

    let mut page = loader.search_sounds("", None, None).await.unwrap();
    let mut names: Vec<String> = page.results.iter().map(|s| s.name.clone()).collect();
    while let Some(next) = loader.next_page(&page) {
        page = next.await.unwrap();
        names.extend(page.results.iter().map(|s| s.name.clone()));
    }

    assert_eq!(names.len(), 7);
    assert_eq!(names.first().map(String::as_str), Some("Piano C4"));
    assert_eq!(names.last().map(String::as_str), Some("Snare roll"));
    assert!(loader.next_page(&page).is_none());
}

fn page_pointing_at(next: String) -> Page<SoundSummary> {
    Page {
        count: 7,
        next: Some(next),
        previous: None,
        results: Vec::new(),
    }
}

#[tokio::test]
async fn next_page_honors_the_cursor_page_size() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = Loader::new(
        ClientConfig::new(&base)
            .with_credentials(Credentials::new("client", "secret"))
            .with_page_size(2),
    );

    let cursor = format!("{base}/search/text/?query=&page=1&page_size=3");
    let page = loader.next_page(&page_pointing_at(cursor)).unwrap().await.unwrap();
    assert_eq!(page.results.len(), 3);
    assert!(page.next.as_deref().is_some_and(|n| n.contains("page_size=3")));
}

#[tokio::test]
async fn next_page_refuses_a_foreign_cursor() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = loader(&base);

    let cursor = "http://evil.example/steal/?page=2&page_size=15".to_string();
    let err = loader.next_page(&page_pointing_at(cursor)).unwrap().await.unwrap_err();
    assert!(matches!(err, ApiError::Config(_)));
    assert_eq!(loader.in_flight(), 0);
}

#[tokio::test]
async fn cancel_all_right_after_search_yields_cancelled() {
    let base = start_mock_server(Duration::from_secs(2)).await;
    let loader = loader(&base);

    let stream = loader.search_sounds("piano", Some(SortParameter::Relevance), None);
    assert_eq!(loader.in_flight(), 1);
    assert_eq!(loader.cancel_all(), 1);

    let err = stream.await.unwrap_err();
    assert_eq!(err, ApiError::Transport(TransportFailure::Cancelled));
    assert_eq!(loader.in_flight(), 0);
}

#[tokio::test]
async fn cancel_all_reaches_requests_already_on_the_wire() {
    let base = start_mock_server(Duration::from_secs(2)).await;
    let loader = loader(&base);

    let detail = loader.load_sound_detail(1001);
    let user = loader.load_user("alice");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(loader.cancel_all(), 2);

    assert!(detail.await.unwrap_err().is_cancelled());
    assert!(user.await.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn cancel_all_with_nothing_in_flight_is_a_no_op() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = loader(&base);
    assert_eq!(loader.cancel_all(), 0);

    // The loader is still usable afterwards.
    let user = loader.load_user("bob").await.unwrap();
    assert_eq!(user.username, "bob");
}

#[tokio::test]
async fn dropping_a_stream_abandons_its_request() {
    let base = start_mock_server(Duration::from_secs(2)).await;
    let loader = loader(&base);

    let stream = loader.load_sound_detail(1001);
    assert_eq!(loader.in_flight(), 1);
    drop(stream);

    tokio::time::timeout(Duration::from_secs(1), async {
        while loader.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("abandoned request should leave the in-flight set");
}

#[tokio::test]
async fn missing_credentials_fail_without_network() {
    let loader = Loader::new(ClientConfig::new("http://127.0.0.1:9"));
    let err = loader.search_sounds("piano", None, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Config(_)));
    assert_eq!(loader.in_flight(), 0);

    let err = loader.sounds_for_user(&User::named("alice")).await.unwrap_err();
    assert!(matches!(err, ApiError::Config(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Port 9 (discard) is closed on test machines.
    let err = loader("http://127.0.0.1:9").load_user("alice").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(TransportFailure::Network(_))));
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = start_mock_server(Duration::from_secs(2)).await;
    let loader = Loader::new(
        ClientConfig::new(&base).with_request_timeout(Duration::from_millis(200)),
    );
    let err = loader.load_user("alice").await.unwrap_err();
    assert_eq!(err, ApiError::Transport(TransportFailure::Timeout));
}

#[tokio::test]
async fn dispose_releases_session_and_loader_recovers() {
    let base = start_mock_server(Duration::ZERO).await;
    let loader = loader(&base);

    loader.load_user("alice").await.unwrap();
    loader.dispose();
    assert_eq!(loader.in_flight(), 0);

    let user = loader.load_user("dave").await.unwrap();
    assert_eq!(user.username, "dave");
}

#[test]
fn calling_outside_a_runtime_resolves_with_an_error() {
    let loader = loader("http://127.0.0.1:9");
    let stream = loader.load_user("alice");
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let err = rt.block_on(stream).unwrap_err();
    assert!(matches!(err, ApiError::Config(msg) if msg.contains("tokio runtime")));
}
