//! Runtime plumbing shared by the auth, playlist and provider crates:
//! validated configuration, tracing setup and the event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ApiSettings, AuthSettings, CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, EventStream, PlaylistEvent};
