//! Domain DTOs for the Freesound API.
//!
//! # Design
//! Decoding is schema-driven: required fields are plain types and fail the
//! decode when missing, optional fields are `Option`s (or empty vectors) and
//! an absent or `null` value never raises an error. The mock-server crate
//! defines its own copies of these shapes; integration tests catch drift.

use serde::{Deserialize, Deserializer, Serialize};

/// Paginated list envelope.
///
/// `next` and `previous` are absolute cursor URLs exactly as the server sent
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Lightweight projection of a sound, as listed in search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub username: String,
    /// File type (`wav`, `mp3`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Preview URLs attached to a sound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Previews {
    #[serde(rename = "preview-hq-mp3", default)]
    pub preview_hq_mp3: Option<String>,
    #[serde(rename = "preview-lq-mp3", default)]
    pub preview_lq_mp3: Option<String>,
    #[serde(rename = "preview-hq-ogg", default)]
    pub preview_hq_ogg: Option<String>,
    #[serde(rename = "preview-lq-ogg", default)]
    pub preview_lq_ogg: Option<String>,
}

/// Full sound instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDetail {
    pub id: u64,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub samplerate: Option<f64>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub num_downloads: Option<u64>,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub num_ratings: Option<u64>,
    #[serde(default)]
    pub previews: Option<Previews>,
}

impl SoundDetail {
    /// Lightweight projection used by list screens.
    pub fn summary(&self) -> SoundSummary {
        SoundSummary {
            id: Some(self.id),
            name: self.name.clone(),
            username: self.username.clone(),
            kind: self.kind.clone(),
            num_downloads: self.num_downloads,
            duration: self.duration,
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// Public profile of a Freesound user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub home_page: Option<String>,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub date_joined: Option<String>,
    #[serde(default)]
    pub num_sounds: Option<u64>,
    #[serde(default)]
    pub num_packs: Option<u64>,
    #[serde(default)]
    pub num_posts: Option<u64>,
    #[serde(default)]
    pub num_comments: Option<u64>,
}

impl User {
    /// A bare user reference, enough to list their sounds.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            url: None,
            about: None,
            home_page: None,
            avatar: None,
            date_joined: None,
            num_sounds: None,
            num_packs: None,
            num_posts: None,
            num_comments: None,
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_requires_only_name_and_username() {
        let sound: SoundSummary =
            serde_json::from_str(r#"{"name":"Piano C4","username":"alice"}"#).unwrap();
        assert_eq!(sound.name, "Piano C4");
        assert_eq!(sound.id, None);
        assert_eq!(sound.kind, None);
        assert!(sound.tags.is_empty());
    }

    #[test]
    fn summary_rejects_missing_username() {
        let result: Result<SoundSummary, _> = serde_json::from_str(r#"{"name":"Piano C4"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn summary_reads_type_field_as_kind() {
        let sound: SoundSummary = serde_json::from_str(
            r#"{"id":7,"name":"Kick","username":"bob","type":"wav","num_downloads":12,"tags":null}"#,
        )
        .unwrap();
        assert_eq!(sound.kind.as_deref(), Some("wav"));
        assert_eq!(sound.num_downloads, Some(12));
        assert!(sound.tags.is_empty());
    }

    #[test]
    fn detail_tolerates_null_nested_fields() {
        let detail: SoundDetail = serde_json::from_str(
            r#"{"id":1,"name":"Rain","username":"carol","description":null,"previews":null,"tags":["rain","field-recording"]}"#,
        )
        .unwrap();
        assert_eq!(detail.description, None);
        assert_eq!(detail.previews, None);
        assert_eq!(detail.tags, vec!["rain", "field-recording"]);
    }

    #[test]
    fn detail_reads_hyphenated_preview_keys() {
        let detail: SoundDetail = serde_json::from_str(
            r#"{"id":1,"name":"Rain","username":"carol","previews":{"preview-hq-mp3":"https://cdn/1-hq.mp3"}}"#,
        )
        .unwrap();
        let previews = detail.previews.unwrap();
        assert_eq!(previews.preview_hq_mp3.as_deref(), Some("https://cdn/1-hq.mp3"));
        assert_eq!(previews.preview_lq_ogg, None);
    }

    #[test]
    fn detail_summary_keeps_identity() {
        let detail: SoundDetail = serde_json::from_str(
            r#"{"id":42,"name":"Rain","username":"carol","type":"flac","num_downloads":3}"#,
        )
        .unwrap();
        let summary = detail.summary();
        assert_eq!(summary.id, Some(42));
        assert_eq!(summary.kind.as_deref(), Some("flac"));
        assert_eq!(summary.num_downloads, Some(3));
    }

    #[test]
    fn page_roundtrip_preserves_cursors_and_order() {
        let raw = r#"{"count":40,"next":"https://freesound.org/apiv2/search/text/?page=3","previous":"https://freesound.org/apiv2/search/text/?page=1","results":[{"name":"b","username":"x"},{"name":"a","username":"y"}]}"#;
        let page: Page<SoundSummary> = serde_json::from_str(raw).unwrap();
        let back: Page<SoundSummary> =
            serde_json::from_str(&serde_json::to_string(&page).unwrap()).unwrap();
        assert_eq!(back.count, 40);
        assert_eq!(back.next, page.next);
        assert_eq!(back.previous, page.previous);
        let names: Vec<_> = back.results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn user_requires_only_username() {
        let user: User = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(user, User::named("alice"));
    }
}
