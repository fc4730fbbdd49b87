//! `LOG_*` environment variable configuration surface, read once at
//! startup with documented per-field defaults.

use crate::level::Level;
use crate::writer::rotation::parse_size_limit;

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Snapshot of the `LOG_*` environment surface, read once at startup.
/// Every field has a documented default so an unset variable never panics.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnvConfig {
    pub level: Level,
    pub async_enabled: bool,
    pub buffer_size: usize,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub color: bool,
    pub metrics: bool,
    pub structured: bool,
    pub crash_handler: bool,
    pub max_queue_size: usize,
    pub batch_writing: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            level: Level::Info,
            async_enabled: true,
            buffer_size: 8192,
            batch_size: 100,
            flush_interval_ms: 1000,
            color: true,
            metrics: false,
            structured: false,
            crash_handler: false,
            max_queue_size: 100_000,
            batch_writing: false,
        }
    }
}

impl EnvConfig {
    /// Reads every `LOG_*` variable via `std::env::var`, falling back to
    /// [`EnvConfig::default`] per-field when unset or unparsable. A bad
    /// value is a configuration-time concern, not a panic: this function
    /// never fails.
    pub fn from_env() -> EnvConfig {
        let defaults = EnvConfig::default();
        EnvConfig {
            level: read_var("LOG_LEVEL")
                .and_then(|v| Level::parse(&v))
                .unwrap_or(defaults.level),
            async_enabled: read_var("LOG_ASYNC")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.async_enabled),
            buffer_size: read_var("LOG_BUFFER_SIZE")
                .and_then(|v| parse_size_limit(Some(&v)))
                .map(|n| n as usize)
                .unwrap_or(defaults.buffer_size),
            batch_size: read_var("LOG_BATCH_SIZE")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.batch_size),
            flush_interval_ms: read_var("LOG_FLUSH_INTERVAL")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.flush_interval_ms),
            color: read_var("LOG_COLOR")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.color),
            metrics: read_var("LOG_METRICS")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.metrics),
            structured: read_var("LOG_STRUCTURED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.structured),
            crash_handler: read_var("LOG_CRASH_HANDLER")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.crash_handler),
            max_queue_size: read_var("LOG_MAX_QUEUE_SIZE")
                .and_then(|v| parse_size_limit(Some(&v)))
                .map(|n| n as usize)
                .unwrap_or(defaults.max_queue_size),
            batch_writing: read_var("LOG_BATCH_WRITING")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.batch_writing),
        }
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Process-wide snapshot of the `LOG_*` environment, read exactly once on
/// first access. Consumers that want a fresh read (tests, long-lived
/// daemons reacting to config pushes) should call [`EnvConfig::from_env`]
/// directly instead.
static GLOBAL: once_cell::sync::Lazy<EnvConfig> = once_cell::sync::Lazy::new(EnvConfig::from_env);

/// Returns the cached process-wide [`EnvConfig`], computing it from the
/// environment on first call.
pub fn global() -> &'static EnvConfig {
    &GLOBAL
}
