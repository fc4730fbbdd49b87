//! Log levels and their string/env-variable spellings.

use std::fmt;

/// Severity of a [`crate::record::LogRecord`].
///
/// Ordering is total and `Off` sorts above `Critical`: a record whose level
/// is below a logger's threshold never pays construction cost (see
/// `Logger::log`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    /// Accepts nothing; used only as a threshold value to silence a Logger.
    Off,
}

impl Level {
    /// Parses the common spellings accepted by the `LOG_LEVEL` environment
    /// surface, including the aliases `warn`/`warning` and
    /// `fatal`/`critical`.
    pub fn parse(name: &str) -> Option<Level> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warning),
            "error" => Some(Level::Error),
            "critical" | "fatal" => Some(Level::Critical),
            "off" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Off => "OFF",
        }
    }

    /// Maps to the nearest `tracing::Level` for internal diagnostics; `Off`
    /// and `Critical` both fold onto `tracing::Level::ERROR`, the ceiling of
    /// that enum.
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            Level::Trace => tracing::Level::TRACE,
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warning => tracing::Level::WARN,
            Level::Error | Level::Critical | Level::Off => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!(Level::parse("warn"), Some(Level::Warning));
        assert_eq!(Level::parse("WARNING"), Some(Level::Warning));
        assert_eq!(Level::parse("fatal"), Some(Level::Critical));
        assert_eq!(Level::parse("nonsense"), None);
    }

    #[test]
    fn off_is_above_critical() {
        assert!(Level::Off > Level::Critical);
        assert!(Level::Critical > Level::Error);
        assert!(Level::Trace < Level::Debug);
    }
}
