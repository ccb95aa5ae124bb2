//! Remote synchronization contract
//!
//! A [`PlaylistSync`] implementation owns the remote protocol. Callers only
//! see [`LoadedPlaylist`], [`ApplyOutcome`] and the [`SyncError`] taxonomy.

use crate::error::{Result, SyncError};
use crate::models::{Item, Playlist};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Playlist metadata plus its items in remote order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlaylist {
    pub playlist: Playlist,
    pub items: Vec<Item>,
}

/// Result of a fully applied reorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Human-readable confirmation
    pub message: String,
    /// Number of position updates issued
    pub applied: usize,
    /// Order the remote now holds
    pub committed_order: Vec<String>,
}

#[async_trait]
pub trait PlaylistSync: Send + Sync {
    /// Load metadata and every item of `playlist_id`.
    ///
    /// `cancel` is checked before each remote call.
    async fn load_playlist_cancellable(
        &self,
        playlist_id: &str,
        cancel: &CancellationToken,
    ) -> Result<LoadedPlaylist>;

    /// Rewrite remote positions so the playlist matches `desired_order`.
    ///
    /// Updates are issued one at a time in ascending target position. On the
    /// first unrecoverable error the remaining updates are skipped and
    /// nothing is rolled back; if some updates were already committed the
    /// error is wrapped in [`SyncError::PartiallyApplied`].
    async fn apply_reorder_cancellable(
        &self,
        playlist_id: &str,
        desired_order: &[String],
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome>;

    async fn load_playlist(&self, playlist_id: &str) -> Result<LoadedPlaylist> {
        self.load_playlist_cancellable(playlist_id, &CancellationToken::new())
            .await
    }

    async fn apply_reorder(
        &self,
        playlist_id: &str,
        desired_order: &[String],
    ) -> Result<ApplyOutcome> {
        self.apply_reorder_cancellable(playlist_id, desired_order, &CancellationToken::new())
            .await
    }
}

/// Check that `desired` is exactly a reordering of `current`.
pub fn validate_permutation(current: &[String], desired: &[String]) -> Result<()> {
    if current.len() != desired.len() {
        return Err(SyncError::PreconditionFailed(format!(
            "desired order has {} items but the playlist has {}",
            desired.len(),
            current.len()
        )));
    }

    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(desired.len());

    for id in desired {
        if !current_set.contains(id.as_str()) {
            return Err(SyncError::PreconditionFailed(format!(
                "item {} is no longer in the playlist",
                id
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(SyncError::PreconditionFailed(format!(
                "item {} appears more than once in the desired order",
                id
            )));
        }
    }

    // Same length, all distinct and all members: every current member is covered
    Ok(())
}

/// Return `Cancelled` if `cancel` fired
pub fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}
