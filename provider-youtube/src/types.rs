//! YouTube Data API v3 wire types
//!
//! Only the fields the connector reads are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};

/// playlists.list response
///
/// See: https://developers.google.com/youtube/v3/docs/playlists/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistSnippet>,
    #[serde(default)]
    pub status: Option<PlaylistStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnippet {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStatus {
    #[serde(default)]
    pub privacy_status: Option<String>,
}

/// playlistItems.list response
///
/// See: https://developers.google.com/youtube/v3/docs/playlistItems/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItemResource>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A playlist membership. `id` identifies the membership, not the video.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemResource {
    pub id: String,

    /// Concurrency token of the membership
    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub snippet: PlaylistItemSnippet,

    #[serde(default)]
    pub content_details: Option<PlaylistItemContentDetails>,
}

impl PlaylistItemResource {
    /// Video reference, preferring the snippet copy
    pub fn video_id(&self) -> Option<&str> {
        self.snippet
            .resource_id
            .as_ref()
            .and_then(|resource| resource.video_id.as_deref())
            .or_else(|| {
                self.content_details
                    .as_ref()
                    .and_then(|details| details.video_id.as_deref())
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: Option<String>,

    /// Absent for deleted or private videos
    #[serde(default)]
    pub video_owner_channel_title: Option<String>,

    /// When the video was added to the playlist (RFC 3339)
    #[serde(default)]
    pub published_at: Option<String>,

    #[serde(default)]
    pub position: Option<u32>,

    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    #[serde(default)]
    pub video_id: Option<String>,

    /// When the video itself was published (RFC 3339)
    #[serde(default)]
    pub video_published_at: Option<String>,
}

/// playlistItems.update request body (`part=snippet`)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemUpdate {
    pub id: String,
    pub snippet: PlaylistItemUpdateSnippet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemUpdateSnippet {
    pub playlist_id: String,
    pub position: usize,
    pub resource_id: VideoReference,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoReference {
    pub kind: String,
    pub video_id: String,
}

impl VideoReference {
    pub fn video(video_id: impl Into<String>) -> Self {
        Self {
            kind: "youtube#video".to_string(),
            video_id: video_id.into(),
        }
    }
}

/// videos.list response (`part=contentDetails`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    #[serde(default)]
    pub content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContentDetails {
    /// ISO 8601 duration, e.g. `PT4M13S`
    #[serde(default)]
    pub duration: Option<String>,
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    /// Machine-readable reason of the first error, falling back to the message
    pub fn reason(&self) -> Option<&str> {
        self.error
            .errors
            .iter()
            .find_map(|detail| detail.reason.as_deref())
            .or(self.error.message.as_deref())
    }
}

/// Parse an ISO 8601 duration (`PT1H2M3S`, `P1DT5M`, `P0D`) into seconds.
///
/// Fractional seconds are truncated. Year and month designators are rejected
/// since they have no fixed length.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'T' if !in_time && number.is_empty() => in_time = true,
            designator => {
                let whole: u64 = number.split('.').next()?.parse().ok()?;
                let unit = match (in_time, designator) {
                    (false, 'W') => 7 * 86_400,
                    (false, 'D') => 86_400,
                    (true, 'H') => 3_600,
                    (true, 'M') => 60,
                    (true, 'S') => 1,
                    _ => return None,
                };
                total = total.checked_add(whole.checked_mul(unit)?)?;
                number.clear();
                saw_component = true;
            }
        }
    }

    (number.is_empty() && saw_component).then_some(total)
}
