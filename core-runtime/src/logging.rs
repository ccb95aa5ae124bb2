//! # Logging
//!
//! Installs the global `tracing` subscriber for the playlist runtime:
//!
//! - one of three stderr formats ([`LogFormat`])
//! - an `EnvFilter` that follows the configured level for this workspace's
//!   crates and keeps HTTP internals at `warn`
//! - an optional bridge to a host [`LoggerSink`], with credential-looking
//!   fields redacted before they leave the process
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! tracing::info!(playlist_id = "PL123", "Session started");
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Crates of this workspace that follow the configured level by default.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_auth",
    "core_playlist",
    "provider_youtube",
    "bridge_desktop",
];

/// Transport crates kept quiet unless a custom filter says otherwise.
const NOISY_TARGETS: &[&str] = &["h2", "hyper", "reqwest", "rustls"];

/// Field-name fragments whose values never reach a sink.
const SENSITIVE_FIELDS: &[&str] = &[
    "token",
    "secret",
    "password",
    "authorization",
    "bearer",
    "api_key",
    "credential",
];

const REDACTED: &str = "[REDACTED]";

/// Output format of the stderr layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    /// Pretty in debug builds, JSON in release builds
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for this workspace's crates when no custom filter is set
    pub level: LogLevel,
    /// Full `EnvFilter` directive string, replacing the default one
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Report span closings (pretty) or include span context (json)
    pub enable_spans: bool,
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("has_logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .field("display_target", &self.display_target)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Install the global subscriber.
///
/// Only the first call in a process succeeds; later calls return
/// [`Error::LoggingInit`].
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(LoggerSinkLayer::new(config.logger_sink.clone()))
        .with(stderr_layer(&config))
        .try_init()
        .map_err(|e| Error::LoggingInit(e.to_string()))
}

fn stderr_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_writer(io::stderr);

    match config.format {
        LogFormat::Pretty => {
            let span_events = if config.enable_spans {
                FmtSpan::CLOSE
            } else {
                FmtSpan::NONE
            };
            base.pretty().with_span_events(span_events).boxed()
        }
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn default_directives(level: LogLevel) -> String {
    std::iter::once("warn".to_string())
        .chain(WORKSPACE_TARGETS.iter().map(|t| format!("{}={}", t, level)))
        .chain(NOISY_TARGETS.iter().map(|t| format!("{}=warn", t)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Mirrors filtered events into a host [`LoggerSink`].
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }

    fn dispatch(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
        let forward = async move {
            if let Err(err) = sink.log(entry).await {
                eprintln!("LoggerSink error: {}", err);
            }
        };

        // Inside a runtime the sink must not block the emitting task
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(forward);
            }
            Err(_) => futures::executor::block_on(forward),
        }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level_of(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        entry.fields = fields
            .values
            .into_iter()
            .map(|(name, value)| {
                let value = redact_if_sensitive(&name, &value);
                (name, value)
            })
            .collect();
        entry.span = ctx.lookup_current().map(|span| span.name().to_string());

        Self::dispatch(Arc::clone(sink), entry);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

fn log_level_of(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Value of `field_name` as it may be shown to a host logger.
///
/// Credential-looking field names are fully redacted; email-looking values
/// keep only their first character.
///
/// ```ignore
/// use core_runtime::logging::redact_if_sensitive;
///
/// info!(owner = %redact_if_sensitive("owner", owner), "Loaded playlist");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_ascii_lowercase();
    if SENSITIVE_FIELDS.iter().any(|fragment| name.contains(fragment)) {
        return REDACTED.to_string();
    }

    match value.split_once('@') {
        Some((local, domain)) if domain.contains('.') => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, REDACTED)
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Trace
        }
    }

    fn with_sink<F: FnOnce()>(f: F) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink)));
        tracing::subscriber::with_default(subscriber, f);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_filter("core_auth=trace")
            .with_spans(false)
            .with_target(false);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.filter.as_deref(), Some("core_auth=trace"));
        assert!(!config.enable_spans);
        assert!(!config.display_target);
    }

    #[test]
    fn test_default_format_follows_build_profile() {
        let expected = if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        };
        assert_eq!(LogFormat::default(), expected);
    }

    #[test]
    fn test_default_directives() {
        let directives = default_directives(LogLevel::Debug);

        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("provider_youtube=debug"));
        assert!(directives.contains("core_playlist=debug"));
        assert!(directives.contains("reqwest=warn"));
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_auth=[[[");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_redact_if_sensitive() {
        assert_eq!(redact_if_sensitive("access_token", "ya29.secret"), REDACTED);
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), REDACTED);
        assert_eq!(redact_if_sensitive("owner", "user@example.com"), "u***@[REDACTED]");
        assert_eq!(redact_if_sensitive("title", "live @ venue"), "live @ venue");
        assert_eq!(redact_if_sensitive("playlist_id", "PL123"), "PL123");
    }

    #[test]
    fn test_sink_layer_forwards_event() {
        let entries = with_sink(|| {
            tracing::info!(target: "test.target", playlist_id = "PL1", position = 3u64, "hello world");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.target, "test.target");
        assert_eq!(entry.message, "hello world");
        assert_eq!(entry.fields.get("playlist_id").map(String::as_str), Some("PL1"));
        assert_eq!(entry.fields.get("position").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_sink_layer_redacts_token_fields() {
        let entries = with_sink(|| {
            tracing::warn!(access_token = "ya29.abc", "token refreshed");
        });

        assert_eq!(
            entries[0].fields.get("access_token").map(String::as_str),
            Some(REDACTED)
        );
    }

    #[test]
    fn test_sink_layer_records_span_name() {
        let entries = with_sink(|| {
            let span = tracing::info_span!("apply_reorder");
            let _enter = span.enter();
            tracing::info!("inside");
        });

        assert_eq!(entries[0].span.as_deref(), Some("apply_reorder"));
    }
}
