//! Session composition
//!
//! [`PlaylistSession`] wires the working-state transitions to a
//! [`PlaylistSync`] implementation. It is the single writer of its state.

use crate::error::{Result, SyncError};
use crate::models::{Playlist, SortRule};
use crate::plan::ReorderPlan;
use crate::state::{self, WorkingState};
use crate::sync::{ApplyOutcome, PlaylistSync};
use bridge_traits::time::{Clock, SystemClock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub struct PlaylistSession {
    sync: Arc<dyn PlaylistSync>,
    clock: Arc<dyn Clock>,
    state: WorkingState,
    playlist: Option<Playlist>,
    /// Order last confirmed by the remote (load or apply)
    baseline: Vec<String>,
}

impl PlaylistSession {
    pub fn new(sync: Arc<dyn PlaylistSync>) -> Self {
        Self {
            sync,
            clock: Arc::new(SystemClock),
            state: state::initial_state(),
            playlist: None,
            baseline: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &WorkingState {
        &self.state
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub async fn load(&mut self, playlist_id: &str) -> Result<&WorkingState> {
        self.load_cancellable(playlist_id, &CancellationToken::new())
            .await
    }

    /// Load `playlist_id` and replace the working state with it.
    ///
    /// On failure the previous state is kept.
    #[instrument(skip(self, cancel))]
    pub async fn load_cancellable(
        &mut self,
        playlist_id: &str,
        cancel: &CancellationToken,
    ) -> Result<&WorkingState> {
        let loaded = self
            .sync
            .load_playlist_cancellable(playlist_id, cancel)
            .await?;

        self.baseline = loaded.items.iter().map(|item| item.id.clone()).collect();
        self.state = state::seed(playlist_id, loaded.items);
        self.playlist = Some(loaded.playlist);

        Ok(&self.state)
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.state = state::set_selection(&self.state, index);
    }

    pub fn move_by(&mut self, delta: isize) {
        self.state = state::apply_move_delta(&self.state, delta);
    }

    pub fn move_to(&mut self, to: usize) {
        self.state = state::apply_move_to(&self.state, to);
    }

    pub fn set_sort_rules(&mut self, rules: Vec<SortRule>) {
        self.state = state::set_sort_rules(&self.state, rules);
    }

    pub fn apply_sort(&mut self) {
        self.state = state::apply_sort(&self.state);
    }

    /// Moves that turn the last confirmed order into the working order
    pub fn plan(&self) -> Option<ReorderPlan> {
        ReorderPlan::between(&self.baseline, &self.state.order_ids()).ok()
    }

    /// Drop local edits and return to the last confirmed order
    pub fn discard_changes(&mut self) {
        let Some(playlist_id) = self.state.selected_playlist_id.clone() else {
            return;
        };

        let mut items = self.state.items.clone();
        items.sort_by_key(|item| {
            self.baseline
                .iter()
                .position(|id| id == &item.id)
                .unwrap_or(usize::MAX)
        });

        let last_applied_at = self.state.last_applied_at;
        self.state = WorkingState {
            last_applied_at,
            ..state::seed(playlist_id, items)
        };
    }

    pub async fn apply(&mut self) -> Result<ApplyOutcome> {
        self.apply_cancellable(&CancellationToken::new()).await
    }

    /// Push the working order to the remote.
    ///
    /// The state becomes clean only when the remote echoes exactly the
    /// working order back.
    #[instrument(skip(self, cancel))]
    pub async fn apply_cancellable(&mut self, cancel: &CancellationToken) -> Result<ApplyOutcome> {
        let playlist_id = self.state.selected_playlist_id.clone().ok_or_else(|| {
            SyncError::PreconditionFailed("no playlist is loaded".to_string())
        })?;
        let order = self.state.order_ids();

        let outcome = self
            .sync
            .apply_reorder_cancellable(&playlist_id, &order, cancel)
            .await?;

        match state::mark_applied(&self.state, &outcome.committed_order, self.clock.now()) {
            Some(clean) => {
                self.state = clean;
                self.baseline = outcome.committed_order.clone();
                if let Some(playlist) = self.playlist.as_mut() {
                    playlist.item_count = self.state.items.len();
                }
                info!(playlist_id = %playlist_id, updates = outcome.applied, "Working order committed");
            }
            None => {
                warn!(playlist_id = %playlist_id, "Remote order differs from working order, keeping changes unsaved");
            }
        }

        Ok(outcome)
    }
}

impl std::fmt::Debug for PlaylistSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistSession")
            .field("state", &self.state)
            .field("playlist", &self.playlist)
            .finish_non_exhaustive()
    }
}
