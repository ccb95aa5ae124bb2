//! # YouTube Provider
//!
//! Implements the `PlaylistSync` contract for YouTube Data API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Playlist metadata and paginated membership reads
//! - Optional duration enrichment through batched `videos.list` reads
//! - Sequential position updates guarded by membership etags
//! - Credential refresh on 401 and bounded backoff for 429/5xx

pub mod connector;
pub mod error;
pub mod types;

pub use connector::YouTubePlaylistConnector;
pub use error::{Result, YouTubeError};
