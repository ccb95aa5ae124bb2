//! Working-state transitions
//!
//! Every transition borrows the current [`WorkingState`] and returns a new
//! one. Commands that cannot apply (no selection, stale selection, empty
//! list) return an unchanged copy instead of failing.

use crate::models::{Item, SortRule, SortSpec};
use crate::reorder::{move_by_delta, move_to_position};
use crate::sort::stable_multi_sort;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session-local, possibly unsaved arrangement of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingState {
    pub selected_playlist_id: Option<String>,
    /// Working order
    pub items: Vec<Item>,
    /// Cursor into `items`
    pub selection: Option<usize>,
    pub sort_spec: SortSpec,
    /// True once the working order may differ from the last loaded/applied one
    pub dirty: bool,
    pub last_applied_at: Option<DateTime<Utc>>,
}

impl WorkingState {
    /// Membership identifiers in working order
    pub fn order_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.selection.and_then(|index| self.items.get(index))
    }
}

pub fn initial_state() -> WorkingState {
    WorkingState::default()
}

/// Replace the whole state with a freshly loaded playlist
pub fn seed(playlist_id: impl Into<String>, items: Vec<Item>) -> WorkingState {
    WorkingState {
        selected_playlist_id: Some(playlist_id.into()),
        items,
        ..WorkingState::default()
    }
}

pub fn set_selection(state: &WorkingState, index: Option<usize>) -> WorkingState {
    WorkingState {
        selection: index,
        ..state.clone()
    }
}

/// Move the selected item by `delta` and follow it with the cursor
pub fn apply_move_delta(state: &WorkingState, delta: isize) -> WorkingState {
    let Some(index) = state.selection else {
        return state.clone();
    };

    match move_by_delta(&state.items, index, delta) {
        Ok((items, new_index)) => WorkingState {
            items,
            selection: Some(new_index),
            dirty: true,
            ..state.clone()
        },
        Err(e) => {
            debug!(error = %e, "Ignoring move with stale selection");
            state.clone()
        }
    }
}

/// Move the selected item to `to`; the cursor is relocated by identifier
pub fn apply_move_to(state: &WorkingState, to: usize) -> WorkingState {
    let Some(index) = state.selection else {
        return state.clone();
    };
    let Some(selected_id) = state.items.get(index).map(|item| item.id.clone()) else {
        debug!(index, len = state.items.len(), "Ignoring move with stale selection");
        return state.clone();
    };

    match move_to_position(&state.items, index, to) {
        Ok(items) => {
            let selection = items.iter().position(|item| item.id == selected_id);
            WorkingState {
                items,
                selection,
                dirty: true,
                ..state.clone()
            }
        }
        Err(e) => {
            debug!(error = %e, "Ignoring move with stale selection");
            state.clone()
        }
    }
}

/// Store sort rules without reordering
pub fn set_sort_rules(state: &WorkingState, rules: Vec<SortRule>) -> WorkingState {
    WorkingState {
        sort_spec: SortSpec::new(rules),
        dirty: true,
        ..state.clone()
    }
}

/// Materialize the stored sort rules over the working order.
///
/// The selection follows the selected item. Without rules this is a no-op.
pub fn apply_sort(state: &WorkingState) -> WorkingState {
    if state.sort_spec.is_empty() {
        return state.clone();
    }

    let selected_id = state.selected_item().map(|item| item.id.clone());
    let items = stable_multi_sort(&state.items, state.sort_spec.rules());
    let selection = selected_id.and_then(|id| items.iter().position(|item| item.id == id));

    WorkingState {
        items,
        selection,
        dirty: true,
        ..state.clone()
    }
}

/// Mark the state clean if the remote echoed exactly the working order.
///
/// Returns `None` when `committed_order` differs, leaving the caller's
/// state dirty.
pub fn mark_applied(
    state: &WorkingState,
    committed_order: &[String],
    at: DateTime<Utc>,
) -> Option<WorkingState> {
    let matches = state.items.len() == committed_order.len()
        && state
            .items
            .iter()
            .zip(committed_order)
            .all(|(item, id)| &item.id == id);

    matches.then(|| WorkingState {
        dirty: false,
        last_applied_at: Some(at),
        ..state.clone()
    })
}
