//! YouTube Data API connector
//!
//! Implements [`PlaylistSync`] for YouTube Data API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_auth::CredentialProvider;
use core_playlist::sync::{ensure_not_cancelled, validate_permutation};
use core_playlist::{
    ApplyOutcome, Item, LoadedPlaylist, Playlist, PlaylistSync, SyncError, Visibility,
};
use core_runtime::config::{ApiSettings, CoreConfig};
use core_runtime::events::{CoreEvent, EventBus, PlaylistEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, YouTubeError};
use crate::types::{
    parse_iso8601_duration, ApiErrorResponse, PlaylistItemListResponse, PlaylistItemResource,
    PlaylistItemUpdate, PlaylistItemUpdateSnippet, PlaylistListResponse, PlaylistResource,
    VideoListResponse, VideoReference,
};

/// videos.list accepts at most this many ids per request
const VIDEO_BATCH_SIZE: usize = 50;

/// Title used when the playlist snippet carries none
const DEFAULT_PLAYLIST_TITLE: &str = "Playlist";

const APPLIED_MESSAGE: &str = "Applied";

/// A membership as read from the remote, with what an update needs
#[derive(Debug, Clone)]
struct RemoteMembership {
    item: Item,
    video_id: Option<String>,
    etag: Option<String>,
}

/// YouTube playlist connector
///
/// Every remote call goes through the same policy:
///
/// - a 401 clears the cached credential and retries once; a second 401 is
///   reported as permission-denied
/// - a 403 whose reason mentions quota is reported as quota-exceeded
/// - 404, 409 and 412 are reported as precondition-failed
/// - 429, 5xx and network failures are retried per [`RetryPolicy`]
/// - anything else is transient
///
/// The cancellation token is checked before each call.
///
/// [`RetryPolicy`]: bridge_traits::http::RetryPolicy
///
/// # Example
///
/// ```ignore
/// use provider_youtube::YouTubePlaylistConnector;
/// use core_playlist::PlaylistSync;
///
/// let connector = YouTubePlaylistConnector::from_config(&config, credentials);
/// let loaded = connector.load_playlist("PLxyz").await?;
/// ```
pub struct YouTubePlaylistConnector {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
    settings: ApiSettings,
    scopes: Vec<String>,
    event_bus: Option<EventBus>,
}

impl YouTubePlaylistConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialProvider>,
        settings: ApiSettings,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            http_client,
            credentials,
            settings,
            scopes,
            event_bus: None,
        }
    }

    pub fn from_config(config: &CoreConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::new(
            config.http_client.clone(),
            credentials,
            config.api.clone(),
            config.auth.scopes.clone(),
        )
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn emit(&self, event: PlaylistEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playlist(event));
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), resource)
    }

    /// Execute one logical API call under the connector's auth/retry policy
    #[instrument(skip(self, request, cancel), fields(method = ?request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<HttpResponse> {
        let policy = &self.settings.retry_policy;
        let mut refreshed = false;
        let mut attempt: u32 = 0;

        loop {
            ensure_not_cancelled(cancel)?;

            let token = self.credentials.get_access_token(&self.scopes).await?;
            let authorized = request
                .clone()
                .bearer_token(token)
                .timeout(self.settings.request_timeout);

            let (failure, hint) = match self.http_client.execute(authorized).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "API request succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    let reason = error_reason(&response);
                    match response.status {
                        401 if !refreshed => {
                            warn!("Access token rejected, refreshing credential once");
                            self.credentials.clear_access_token().await;
                            refreshed = true;
                            continue;
                        }
                        401 => return Err(YouTubeError::Unauthorized(reason)),
                        403 if is_quota_reason(&reason) => {
                            return Err(YouTubeError::QuotaExceeded(reason))
                        }
                        403 => return Err(YouTubeError::Forbidden(reason)),
                        status @ (404 | 409 | 412) => {
                            return Err(YouTubeError::PreconditionFailed { status, reason })
                        }
                        status @ (429 | 500..=599) => {
                            (format!("status {}: {}", status, reason), response.retry_after())
                        }
                        status_code => {
                            return Err(YouTubeError::ApiError {
                                status_code,
                                message: reason,
                            })
                        }
                    }
                }
                Err(e) if e.is_network() => (e.to_string(), None),
                Err(e) => return Err(e.into()),
            };

            attempt += 1;
            if !policy.allows_retry(attempt) {
                warn!(attempts = attempt, error = %failure, "API request failed, giving up");
                return Err(YouTubeError::RetriesExhausted {
                    attempts: attempt,
                    message: failure,
                });
            }

            let delay = policy.delay_with_hint(attempt, hint);
            warn!(
                attempt,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "API request failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(SyncError::Cancelled.into()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let request = HttpRequest::new(HttpMethod::Get, url).accept_json();
        let response = self.execute(request, cancel).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| YouTubeError::ParseError(format!("{}", e)))
    }

    async fn fetch_playlist(
        &self,
        playlist_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PlaylistResource>> {
        let url = format!(
            "{}?part=snippet,status,contentDetails&id={}",
            self.endpoint("playlists"),
            urlencoding::encode(playlist_id)
        );

        let response: PlaylistListResponse = self.get_json(url, cancel).await?;
        Ok(response.items.into_iter().next())
    }

    /// Read every membership of the playlist, following page tokens
    async fn fetch_memberships(
        &self,
        playlist_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteMembership>> {
        let mut memberships = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}?part=snippet,contentDetails&maxResults={}&playlistId={}",
                self.endpoint("playlistItems"),
                self.settings.page_size,
                urlencoding::encode(playlist_id)
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: PlaylistItemListResponse = self.get_json(url, cancel).await?;
            debug!(count = page.items.len(), "Fetched membership page");

            for resource in page.items {
                let index = memberships.len();
                memberships.push(convert_membership(resource, index));
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(memberships)
    }

    /// Fill in durations with batched videos.list reads
    async fn enrich_durations(
        &self,
        memberships: &mut [RemoteMembership],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        let video_ids: Vec<String> = memberships
            .iter()
            .filter_map(|m| m.video_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut durations: HashMap<String, u64> = HashMap::new();
        for batch in video_ids.chunks(VIDEO_BATCH_SIZE) {
            let url = format!(
                "{}?part=contentDetails&id={}",
                self.endpoint("videos"),
                urlencoding::encode(&batch.join(","))
            );

            let response: VideoListResponse = self.get_json(url, cancel).await?;
            for video in response.items {
                let seconds = video
                    .content_details
                    .and_then(|details| details.duration)
                    .and_then(|raw| parse_iso8601_duration(&raw));
                if let Some(seconds) = seconds {
                    durations.insert(video.id, seconds);
                }
            }
        }

        for membership in memberships.iter_mut() {
            membership.item.duration = membership
                .video_id
                .as_ref()
                .and_then(|id| durations.get(id).copied());
        }

        debug!(resolved = durations.len(), requested = video_ids.len(), "Resolved durations");
        Ok(())
    }

    async fn update_position(
        &self,
        playlist_id: &str,
        membership: &RemoteMembership,
        position: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let video_id = membership.video_id.clone().ok_or_else(|| {
            YouTubeError::ParseError(format!(
                "membership {} carries no video reference",
                membership.item.id
            ))
        })?;

        let body = PlaylistItemUpdate {
            id: membership.item.id.clone(),
            snippet: PlaylistItemUpdateSnippet {
                playlist_id: playlist_id.to_string(),
                position,
                resource_id: VideoReference::video(video_id),
            },
        };

        let mut request = HttpRequest::new(
            HttpMethod::Put,
            format!("{}?part=snippet", self.endpoint("playlistItems")),
        )
        .json(&body)?;
        if let Some(etag) = &membership.etag {
            request = request.if_match(etag.clone());
        }

        self.execute(request, cancel).await?;
        Ok(())
    }

    async fn load(&self, playlist_id: &str, cancel: &CancellationToken) -> Result<LoadedPlaylist> {
        ensure_not_cancelled(cancel)?;

        // A 404 while loading means the playlist itself is gone
        let missing = |e: YouTubeError| match e {
            YouTubeError::PreconditionFailed { status: 404, .. } => YouTubeError::PlaylistNotFound {
                playlist_id: playlist_id.to_string(),
            },
            other => other,
        };
        let (meta, mut memberships) = tokio::try_join!(
            async { self.fetch_playlist(playlist_id, cancel).await.map_err(&missing) },
            async { self.fetch_memberships(playlist_id, cancel).await.map_err(&missing) }
        )?;

        let meta = meta.ok_or_else(|| YouTubeError::PlaylistNotFound {
            playlist_id: playlist_id.to_string(),
        })?;

        if self.settings.fetch_durations && !memberships.is_empty() {
            self.enrich_durations(&mut memberships, cancel).await?;
        }

        let items: Vec<Item> = memberships.into_iter().map(|m| m.item).collect();
        let playlist = Playlist {
            id: meta.id,
            title: meta
                .snippet
                .and_then(|snippet| snippet.title)
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| DEFAULT_PLAYLIST_TITLE.to_string()),
            visibility: meta
                .status
                .and_then(|status| status.privacy_status)
                .map(|status| Visibility::from_privacy_status(&status))
                .unwrap_or_default(),
            item_count: items.len(),
        };

        Ok(LoadedPlaylist { playlist, items })
    }

    async fn apply(
        &self,
        playlist_id: &str,
        desired_order: &[String],
        cancel: &CancellationToken,
    ) -> std::result::Result<ApplyOutcome, SyncError> {
        let current = self.fetch_memberships(playlist_id, cancel).await?;
        let current_ids: Vec<String> = current.iter().map(|m| m.item.id.clone()).collect();
        validate_permutation(&current_ids, desired_order)?;

        let by_id: HashMap<&str, &RemoteMembership> = current
            .iter()
            .map(|m| (m.item.id.as_str(), m))
            .collect();

        let total = desired_order.len();
        self.emit(PlaylistEvent::ApplyStarted {
            playlist_id: playlist_id.to_string(),
            total: total as u64,
        });

        for (position, item_id) in desired_order.iter().enumerate() {
            let result = match by_id.get(item_id.as_str()) {
                Some(membership) => {
                    self.update_position(playlist_id, membership, position, cancel)
                        .await
                }
                None => Err(SyncError::PreconditionFailed(format!(
                    "item {} is no longer in the playlist",
                    item_id
                ))
                .into()),
            };

            if let Err(e) = result {
                let error = SyncError::from(e);
                warn!(
                    playlist_id = %playlist_id,
                    applied = position,
                    total,
                    error = %error,
                    "Reorder stopped before completion"
                );
                self.emit(PlaylistEvent::ApplyFailed {
                    playlist_id: playlist_id.to_string(),
                    applied: position as u64,
                    total: total as u64,
                    message: error.to_string(),
                });

                if position == 0 {
                    return Err(error);
                }
                return Err(SyncError::PartiallyApplied {
                    applied: position,
                    total,
                    source: Box::new(error),
                });
            }

            self.emit(PlaylistEvent::ItemPositioned {
                playlist_id: playlist_id.to_string(),
                item_id: item_id.clone(),
                position: position as u64,
            });
        }

        self.emit(PlaylistEvent::Applied {
            playlist_id: playlist_id.to_string(),
            total: total as u64,
        });
        info!(playlist_id = %playlist_id, total, "Reorder applied");

        Ok(ApplyOutcome {
            message: APPLIED_MESSAGE.to_string(),
            applied: total,
            committed_order: desired_order.to_vec(),
        })
    }
}

#[async_trait]
impl PlaylistSync for YouTubePlaylistConnector {
    #[instrument(skip(self, cancel), fields(playlist_id = %playlist_id))]
    async fn load_playlist_cancellable(
        &self,
        playlist_id: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<LoadedPlaylist, SyncError> {
        info!("Loading playlist from YouTube");

        let loaded = self.load(playlist_id, cancel).await.map_err(|e| {
            warn!(error = %e, "Playlist load failed");
            SyncError::from(e)
        })?;

        self.emit(PlaylistEvent::Loaded {
            playlist_id: playlist_id.to_string(),
            item_count: loaded.items.len() as u64,
        });
        info!(items = loaded.items.len(), "Loaded playlist");

        Ok(loaded)
    }

    #[instrument(skip(self, desired_order, cancel), fields(playlist_id = %playlist_id, items = desired_order.len()))]
    async fn apply_reorder_cancellable(
        &self,
        playlist_id: &str,
        desired_order: &[String],
        cancel: &CancellationToken,
    ) -> std::result::Result<ApplyOutcome, SyncError> {
        info!("Applying reorder to YouTube");
        self.apply(playlist_id, desired_order, cancel).await
    }
}

fn convert_membership(resource: PlaylistItemResource, index: usize) -> RemoteMembership {
    let video_id = resource.video_id().map(str::to_string);
    let date_uploaded = resource
        .content_details
        .as_ref()
        .and_then(|details| details.video_published_at.clone());
    let snippet = resource.snippet;

    let mut item = Item::new(resource.id, snippet.title.unwrap_or_default(), index)
        .with_channel(snippet.video_owner_channel_title.unwrap_or_default())
        .with_date_added(snippet.published_at.unwrap_or_default());
    if let Some(date) = date_uploaded {
        item = item.with_date_uploaded(date);
    }

    RemoteMembership {
        item,
        video_id,
        etag: resource.etag,
    }
}

/// Best-effort reason string from an error response
fn error_reason(response: &HttpResponse) -> String {
    if let Ok(envelope) = response.json::<ApiErrorResponse>() {
        if let Some(reason) = envelope.reason() {
            return reason.to_string();
        }
    }
    match response.text() {
        Ok(text) if !text.trim().is_empty() => text,
        _ => format!("HTTP {}", response.status),
    }
}

fn is_quota_reason(reason: &str) -> bool {
    reason.to_ascii_lowercase().contains("quota")
}
