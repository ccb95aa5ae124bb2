//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-playlist`, `provider-youtube`, `core-runtime`,
//! `core-auth`).
//! Host applications can depend on `playlist-reorder-workspace` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_auth;
#[cfg(feature = "desktop-shims")]
pub use core_playlist;
#[cfg(feature = "desktop-shims")]
pub use core_runtime;
#[cfg(feature = "desktop-shims")]
pub use provider_youtube;
