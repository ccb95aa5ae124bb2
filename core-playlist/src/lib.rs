//! # Playlist Core
//!
//! Local reordering and sorting of a playlist plus the contract for pushing
//! the result back to the remote provider.
//!
//! ## Overview
//!
//! - [`reorder`]: pure move helpers over any sequence
//! - [`sort`]: stable multi-key sort with an unknown-last policy
//! - [`state`]: immutable transitions over [`WorkingState`]
//! - [`plan`]: derive elementary moves and undo information
//! - [`sync`]: the [`PlaylistSync`] facade contract and permutation checks
//! - [`session`]: [`PlaylistSession`] composing state and facade
//!
//! ## Usage
//!
//! ```ignore
//! use core_playlist::{PlaylistSession, SortField, SortRule};
//!
//! let mut session = PlaylistSession::new(sync);
//! session.load("PLxyz").await?;
//! session.select(Some(3));
//! session.move_by(-1);
//! session.apply().await?;
//! ```

pub mod error;
pub mod models;
pub mod plan;
pub mod reorder;
pub mod session;
pub mod sort;
pub mod state;
pub mod sync;

pub use error::{ReorderError, Result, SyncError, SyncErrorKind};
pub use models::{Item, Playlist, SortDirection, SortField, SortRule, SortSpec, Visibility};
pub use plan::{MoveOperation, ReorderPlan};
pub use reorder::{move_by_delta, move_to_position};
pub use session::PlaylistSession;
pub use sort::stable_multi_sort;
pub use state::WorkingState;
pub use sync::{validate_permutation, ApplyOutcome, LoadedPlaylist, PlaylistSync};
