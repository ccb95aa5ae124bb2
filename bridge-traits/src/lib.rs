//! Capabilities the playlist core needs from its host.
//!
//! Each trait is `Send + Sync` so implementations can be shared behind
//! `Arc` across tasks, and every failure is reported as a [`BridgeError`].
//! Desktop implementations live in `bridge-desktop`; tests use in-memory
//! fakes or `mockall` mocks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::SecureStore;
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
