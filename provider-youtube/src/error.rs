//! Error types for the YouTube provider

use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use core_playlist::SyncError;
use thiserror::Error;

/// YouTube provider errors
#[derive(Error, Debug)]
pub enum YouTubeError {
    /// Still unauthorized after one credential refresh
    #[error("YouTube API rejected the credential: {0}")]
    Unauthorized(String),

    #[error("YouTube API quota exhausted: {0}")]
    QuotaExceeded(String),

    /// 403 without a quota reason
    #[error("YouTube API refused the request: {0}")]
    Forbidden(String),

    /// Resource gone or concurrency token rejected (404, 409, 412)
    #[error("YouTube API precondition failed (status {status}): {reason}")]
    PreconditionFailed { status: u16, reason: String },

    #[error("Playlist not found or not accessible: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },

    /// 429, 5xx or network failures that outlived the retry policy
    #[error("YouTube API request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    #[error("YouTube API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result type for YouTube operations
pub type Result<T> = std::result::Result<T, YouTubeError>;

impl From<YouTubeError> for SyncError {
    fn from(error: YouTubeError) -> Self {
        match error {
            YouTubeError::Unauthorized(reason) => SyncError::PermissionDenied(reason),
            YouTubeError::PlaylistNotFound { playlist_id } => {
                SyncError::PermissionDenied(format!("playlist {} could not be resolved", playlist_id))
            }
            YouTubeError::Auth(e) => SyncError::PermissionDenied(e.to_string()),
            YouTubeError::QuotaExceeded(reason) => SyncError::QuotaExceeded(reason),
            YouTubeError::PreconditionFailed { status, reason } => {
                SyncError::PreconditionFailed(format!("status {}: {}", status, reason))
            }
            YouTubeError::Sync(e) => e,
            other @ (YouTubeError::Forbidden(_)
            | YouTubeError::RetriesExhausted { .. }
            | YouTubeError::ApiError { .. }
            | YouTubeError::ParseError(_)
            | YouTubeError::BridgeError(_)) => SyncError::Transient(other.to_string()),
        }
    }
}
