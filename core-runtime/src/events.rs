//! Best-effort notifications from the auth and playlist layers.
//!
//! Publishers call `let _ = bus.emit(..)`: an event with no subscriber is
//! simply dropped. Slow subscribers see `RecvError::Lagged(n)`.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaylistEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut progress = bus.watch_playlist("PL123");
//!
//! let _ = bus.emit(CoreEvent::Playlist(PlaylistEvent::Applied {
//!     playlist_id: "PL123".to_string(),
//!     total: 12,
//! }));
//!
//! let event = progress.recv().await.unwrap();
//! assert_eq!(event.description(), "Reorder applied");
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Credential lifecycle
    Auth(AuthEvent),
    /// Playlist load/apply progress
    Playlist(PlaylistEvent),
}

impl CoreEvent {
    /// Short human-readable description
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Playlist(e) => e.description(),
        }
    }

    /// Playlist the event concerns, if any
    pub fn playlist_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Auth(_) => None,
            CoreEvent::Playlist(
                PlaylistEvent::Loaded { playlist_id, .. }
                | PlaylistEvent::ApplyStarted { playlist_id, .. }
                | PlaylistEvent::ItemPositioned { playlist_id, .. }
                | PlaylistEvent::Applied { playlist_id, .. }
                | PlaylistEvent::ApplyFailed { playlist_id, .. },
            ) => Some(playlist_id),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Playlist(PlaylistEvent::ApplyFailed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::TokenAcquired { .. }) => EventSeverity::Info,
            CoreEvent::Playlist(PlaylistEvent::Applied { .. }) => EventSeverity::Info,
            CoreEvent::Playlist(PlaylistEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// The user was asked for consent
    ConsentRequested { scopes: Vec<String> },
    /// A fresh access token was cached
    TokenAcquired { expires_at: Option<i64> },
    /// The cached token was discarded locally
    TokenCleared,
    /// The token was revoked at the provider
    TokenRevoked,
    AuthError { message: String, recoverable: bool },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::ConsentRequested { .. } => "User consent requested",
            AuthEvent::TokenAcquired { .. } => "Access token acquired",
            AuthEvent::TokenCleared => "Access token cleared",
            AuthEvent::TokenRevoked => "Access token revoked",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    Loaded {
        playlist_id: String,
        item_count: u64,
    },
    ApplyStarted {
        playlist_id: String,
        total: u64,
    },
    /// One membership was written to its target position
    ItemPositioned {
        playlist_id: String,
        item_id: String,
        position: u64,
    },
    Applied {
        playlist_id: String,
        total: u64,
    },
    /// Apply stopped; `applied` updates were already committed
    ApplyFailed {
        playlist_id: String,
        applied: u64,
        total: u64,
        message: String,
    },
}

impl PlaylistEvent {
    fn description(&self) -> &str {
        match self {
            PlaylistEvent::Loaded { .. } => "Playlist loaded",
            PlaylistEvent::ApplyStarted { .. } => "Reorder apply started",
            PlaylistEvent::ItemPositioned { .. } => "Item positioned",
            PlaylistEvent::Applied { .. } => "Reorder applied",
            PlaylistEvent::ApplyFailed { .. } => "Reorder apply failed",
        }
    }
}

/// Broadcast hub for [`CoreEvent`]s. Clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Fails only when nobody is subscribed; publishers ignore that.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscription that only yields events about `playlist_id`
    pub fn watch_playlist(&self, playlist_id: impl Into<String>) -> EventStream {
        let wanted = playlist_id.into();
        EventStream::new(self.subscribe())
            .filter(move |event| event.playlist_id() == Some(wanted.as_str()))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus({} subscribers)", self.subscriber_count())
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by its predicate
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Some(Box::new(predicate)),
            ..self
        }
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |keep| keep(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// `None` once the queue holds no accepted event
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(id: &str) -> CoreEvent {
        CoreEvent::Playlist(PlaylistEvent::Applied {
            playlist_id: id.to_string(),
            total: 3,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Auth(AuthEvent::TokenCleared)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = applied("PL1");
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Auth(_)));

        bus.emit(applied("PL1")).ok();
        let auth_event = CoreEvent::Auth(AuthEvent::TokenAcquired {
            expires_at: Some(1_700_000_000),
        });
        bus.emit(auth_event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), auth_event);
    }

    #[tokio::test]
    async fn test_watch_playlist_skips_other_playlists_and_auth() {
        let bus = EventBus::new(10);
        let mut watch = bus.watch_playlist("PL2");

        bus.emit(applied("PL1")).ok();
        bus.emit(CoreEvent::Auth(AuthEvent::TokenRevoked)).ok();
        bus.emit(applied("PL2")).ok();

        assert_eq!(watch.recv().await.unwrap().playlist_id(), Some("PL2"));
        assert!(watch.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_try_recv_empty_and_filtered() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Auth(_)));

        assert!(stream.try_recv().is_none());
        bus.emit(applied("PL1")).ok();
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Playlist(PlaylistEvent::ItemPositioned {
                playlist_id: "PL1".to_string(),
                item_id: format!("item-{}", i),
                position: i,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Playlist(PlaylistEvent::ApplyFailed {
            playlist_id: "PL1".to_string(),
            applied: 2,
            total: 5,
            message: "quota".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(applied("PL1").severity(), EventSeverity::Info);
        assert_eq!(
            CoreEvent::Auth(AuthEvent::TokenCleared).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(applied("PL9")).unwrap();
        assert_eq!(json["type"], "Playlist");
        assert_eq!(json["payload"]["event"], "Applied");
        assert_eq!(json["payload"]["playlist_id"], "PL9");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, applied("PL9"));
    }
}
