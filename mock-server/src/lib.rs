//! In-process fake of the Freesound `apiv2` read endpoints.
//!
//! Serves a fixed catalog with the same envelope, cursor and error shapes as
//! the real service: token auth on protected routes, `fields` projections,
//! page-number pagination with absolute `next`/`previous` URLs, and
//! `{"detail": ...}` error bodies. An optional artificial latency keeps
//! requests in flight long enough to exercise cancellation.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};

pub const DEFAULT_PAGE_SIZE: usize = 15;
pub const MAX_PAGE_SIZE: usize = 150;
const DEFAULT_FIELDS: &str = "id,name,tags,username,license";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sound {
    pub id: u64,
    pub name: String,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub num_downloads: u64,
    pub duration: f64,
    pub tags: Vec<String>,
    pub description: String,
    pub license: String,
    pub created: String,
    pub avg_rating: f64,
    pub num_ratings: u64,
    #[serde(skip)]
    pub comments: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub about: Option<String>,
    pub home_page: Option<String>,
    pub date_joined: String,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub sounds: Vec<Sound>,
    pub users: Vec<UserProfile>,
}

impl Catalog {
    /// The catalog every test relies on. Order is the relevance order.
    pub fn fixture() -> Self {
        let sound = |id, name: &str, username: &str, kind: &str, downloads, duration, tags: &[&str], description: &str, rating| Sound {
            id,
            name: name.to_string(),
            username: username.to_string(),
            kind: kind.to_string(),
            num_downloads: downloads,
            duration,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: description.to_string(),
            license: "http://creativecommons.org/publicdomain/zero/1.0/".to_string(),
            created: "2016-05-05T12:00:00".to_string(),
            avg_rating: rating,
            num_ratings: 10,
            comments: Vec::new(),
        };

        let mut sounds = vec![
            sound(1001, "Piano C4", "alice", "wav", 320, 2.5, &["piano", "note", "c4"], "Single piano note, middle C.", 4.2),
            sound(1002, "Piano loop", "bob", "mp3", 150, 8.0, &["piano", "loop"], "Four bar piano loop in A minor.", 3.9),
            sound(1003, "Rain on window", "carol", "flac", 900, 62.3, &["rain", "field-recording", "ambience"], "Heavy rain recorded from inside.", 4.8),
            sound(1004, "Thunder clap", "carol", "wav", 1200, 4.1, &["thunder", "storm", "field-recording"], "Close thunder during a summer storm.", 4.5),
            sound(1005, "Kick drum 808", "bob", "wav", 2500, 0.8, &["drum", "kick", "808"], "Classic boomy kick.", 3.1),
            sound(1006, "Birdsong at dawn", "alice", "ogg", 410, 120.0, &["birds", "nature", "field recording"], "Blackbirds and robins at first light.", 4.9),
            sound(1007, "Snare roll", "dave", "wav", 75, 3.2, &["drum", "snare"], "Tight marching snare roll.", 2.7),
        ];
        sounds[2].comments.push("lovely texture, thanks".to_string());
        sounds[4].comments.push("punchy".to_string());

        let user = |username: &str, about: Option<&str>| UserProfile {
            username: username.to_string(),
            about: about.map(str::to_string),
            home_page: None,
            date_joined: "2015-01-01T00:00:00".to_string(),
        };
        let users = vec![
            user("alice", Some("Pianist and field recordist.")),
            user("bob", Some("Beats.")),
            user("carol", None),
            user("dave", None),
            user("jo smith", None),
        ];

        Self { sounds, users }
    }
}

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    latency: Duration,
}

pub fn app() -> Router {
    app_with(Catalog::fixture(), Duration::ZERO)
}

/// Router over `catalog`, delaying every response by `latency`.
pub fn app_with(catalog: Catalog, latency: Duration) -> Router {
    let state = AppState {
        catalog: Arc::new(catalog),
        latency,
    };
    Router::new()
        .route("/search/text/", get(search_text))
        .route("/sounds/{id}/", get(sound_instance))
        .route("/users/{username}/", get(user_instance))
        .route("/users/{username}/sounds/", get(user_sounds))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_latency(listener, Duration::ZERO).await
}

pub async fn run_with_latency(listener: TcpListener, latency: Duration) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, latency_ms = latency.as_millis() as u64, "mock freesound api listening");
    }
    axum::serve(listener, app_with(Catalog::fixture(), latency)).await
}

/// Error body in the service's `{"detail": ...}` shape.
#[derive(Debug)]
pub struct Failure(StatusCode, &'static str);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub query: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub fields: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

async fn search_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    delay(&state).await;

    let filter = params.filter.as_deref().map(parse_filter).transpose()?;
    let mut matches: Vec<&Sound> = state
        .catalog
        .sounds
        .iter()
        .filter(|s| matches_text(s, params.query.as_deref().unwrap_or("")))
        .filter(|s| filter.as_ref().is_none_or(|(field, value)| matches_filter(s, field, value)))
        .collect();
    sort_sounds(&mut matches, params.sort.as_deref())?;
    debug!(query = ?params.query, filter = ?params.filter, hits = matches.len(), "search");

    page_response(&headers, "/search/text/", &params, &matches).map(Json)
}

async fn sound_instance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    delay(&state).await;

    let sound = state
        .catalog
        .sounds
        .iter()
        .find(|s| s.id == id)
        .ok_or(Failure(StatusCode::NOT_FOUND, "Not found."))?;

    let origin = origin(&headers);
    let mut body = match serde_json::to_value(sound) {
        Ok(Value::Object(map)) => map,
        _ => return Err(Failure(StatusCode::INTERNAL_SERVER_ERROR, "Serialization failed.")),
    };
    body.insert("url".into(), json!(format!("{origin}/people/{}/sounds/{id}/", sound.username)));
    body.insert(
        "previews".into(),
        json!({
            "preview-hq-mp3": format!("{origin}/previews/{id}-hq.mp3"),
            "preview-lq-mp3": format!("{origin}/previews/{id}-lq.mp3"),
            "preview-hq-ogg": format!("{origin}/previews/{id}-hq.ogg"),
            "preview-lq-ogg": format!("{origin}/previews/{id}-lq.ogg"),
        }),
    );
    Ok(Json(Value::Object(body)))
}

async fn user_instance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<Value>, Failure> {
    delay(&state).await;

    let user = find_user(&state, &username)?;
    let num_sounds = state.catalog.sounds.iter().filter(|s| s.username == username).count();
    let origin = origin(&headers);
    Ok(Json(json!({
        "username": user.username,
        "url": format!("{origin}/people/{}/", user.username),
        "about": user.about,
        "home_page": user.home_page,
        "avatar": {
            "small": format!("{origin}/avatars/{}_S.jpg", user.username),
            "medium": format!("{origin}/avatars/{}_M.jpg", user.username),
            "large": null,
        },
        "date_joined": user.date_joined,
        "num_sounds": num_sounds,
        "num_packs": 0,
        "num_posts": 0,
        "num_comments": 0,
    })))
}

async fn user_sounds(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    delay(&state).await;

    find_user(&state, &username)?;
    let sounds: Vec<&Sound> = state
        .catalog
        .sounds
        .iter()
        .filter(|s| s.username == username)
        .collect();
    let path = format!(
        "/users/{}/sounds/",
        url::form_urlencoded::byte_serialize(username.as_bytes()).collect::<String>().replace('+', "%20")
    );
    page_response(&headers, &path, &params, &sounds).map(Json)
}

fn find_user<'a>(state: &'a AppState, username: &str) -> Result<&'a UserProfile, Failure> {
    state
        .catalog
        .users
        .iter()
        .find(|u| u.username == username)
        .ok_or(Failure(StatusCode::NOT_FOUND, "Not found."))
}

fn authorize(headers: &HeaderMap) -> Result<(), Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .map(str::trim)
        .unwrap_or("");
    if token.is_empty() {
        return Err(Failure(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided."));
    }
    Ok(())
}

async fn delay(state: &AppState) {
    if !state.latency.is_zero() {
        tokio::time::sleep(state.latency).await;
    }
}

fn origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

fn matches_text(sound: &Sound, query: &str) -> bool {
    let haystack = format!("{} {} {}", sound.name, sound.tags.join(" "), sound.description).to_lowercase();
    query
        .split_whitespace()
        .all(|word| haystack.contains(&word.to_lowercase()))
}

/// Split `field:value` or `field:"quoted value"`.
fn parse_filter(raw: &str) -> Result<(String, String), Failure> {
    let (field, value) = raw
        .split_once(':')
        .ok_or(Failure(StatusCode::BAD_REQUEST, "Invalid filter."))?;
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .replace("\\\"", "\"");
    match field {
        "username" | "tag" | "description" | "comment" => Ok((field.to_string(), value)),
        _ => Err(Failure(StatusCode::BAD_REQUEST, "Invalid filter.")),
    }
}

fn matches_filter(sound: &Sound, field: &str, value: &str) -> bool {
    let needle = value.to_lowercase();
    match field {
        "username" => sound.username == value,
        "tag" => sound.tags.iter().any(|t| t.to_lowercase() == needle),
        "description" => sound.description.to_lowercase().contains(&needle),
        "comment" => sound.comments.iter().any(|c| c.to_lowercase().contains(&needle)),
        _ => false,
    }
}

fn sort_sounds(sounds: &mut [&Sound], sort: Option<&str>) -> Result<(), Failure> {
    match sort.unwrap_or("score") {
        "score" => {}
        "duration_asc" => sounds.sort_by(|a, b| a.duration.total_cmp(&b.duration)),
        "rating_desc" => sounds.sort_by(|a, b| b.avg_rating.total_cmp(&a.avg_rating)),
        "downloads_desc" => sounds.sort_by(|a, b| b.num_downloads.cmp(&a.num_downloads)),
        _ => return Err(Failure(StatusCode::BAD_REQUEST, "Invalid sort parameter.")),
    }
    Ok(())
}

fn page_response(
    headers: &HeaderMap,
    path: &str,
    params: &ListParams,
    sounds: &[&Sound],
) -> Result<Value, Failure> {
    let page = params.page.unwrap_or(1);
    let size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let start = page.saturating_sub(1).saturating_mul(size);
    if page == 0 || (page > 1 && start >= sounds.len()) {
        return Err(Failure(StatusCode::NOT_FOUND, "Invalid page."));
    }

    let fields: Vec<&str> = params.fields.as_deref().unwrap_or(DEFAULT_FIELDS).split(',').collect();
    let results: Vec<Value> = sounds
        .iter()
        .skip(start)
        .take(size)
        .map(|s| project(s, &fields))
        .collect();

    let link = |target: usize| {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("query", &params.query),
            ("filter", &params.filter),
            ("sort", &params.sort),
            ("fields", &params.fields),
        ] {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
        query.append_pair("page", &target.to_string());
        query.append_pair("page_size", &size.to_string());
        format!("{}{path}?{}", origin(headers), query.finish())
    };

    let next = (start + size < sounds.len()).then(|| link(page + 1));
    let previous = (page > 1).then(|| link(page - 1));

    Ok(json!({
        "count": sounds.len(),
        "next": next,
        "previous": previous,
        "results": results,
    }))
}

fn project(sound: &Sound, fields: &[&str]) -> Value {
    match serde_json::to_value(sound) {
        Ok(Value::Object(map)) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .collect::<Map<String, Value>>(),
        ),
        _ => Value::Null,
    }
}
