//! Size/time rotation trigger parsing and period-label computation, shared
//! by [`super::file::RotatingWriter`], including the `check_interval`
//! write-count gate on the time trigger.

use chrono::Utc;

/// When a [`super::file::RotatingWriter`] hands the current file off to an
/// archive and opens a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationTrigger {
    Never,
    Daily,
    Hourly,
    Minutely,
}

impl RotationTrigger {
    pub fn from_str(s: Option<&str>) -> RotationTrigger {
        match s.unwrap_or("never") {
            "daily" => RotationTrigger::Daily,
            "hourly" => RotationTrigger::Hourly,
            "minutely" => RotationTrigger::Minutely,
            _ => RotationTrigger::Never,
        }
    }

    /// The current time-bucket label this trigger partitions wall-clock
    /// time into; a change in label across writes means the time trigger
    /// fired.
    pub fn period_label(self) -> String {
        let now = Utc::now();
        match self {
            RotationTrigger::Daily => now.format("%Y-%m-%d").to_string(),
            RotationTrigger::Hourly => now.format("%Y-%m-%d_%H").to_string(),
            RotationTrigger::Minutely => now.format("%Y-%m-%d_%H-%M").to_string(),
            RotationTrigger::Never => String::new(),
        }
    }
}

/// Parses human-readable byte sizes like `"5KB"`, `"10mb"`, `"1G"` into a
/// byte count. Case-insensitive; a bare number defaults to bytes.
///
/// Ported verbatim in behavior from `logly::backend::rotation::
/// parse_size_limit`, extended to accept a standalone `T`/`TB` suffix that
/// module also defines.
pub fn parse_size_limit(size_str: Option<&str>) -> Option<u64> {
    size_str.and_then(|s| {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let mut num_end = 0;
        for (i, c) in s.chars().enumerate() {
            if !c.is_ascii_digit() {
                num_end = i;
                break;
            }
            num_end = i + 1;
        }
        if num_end == 0 {
            return None;
        }

        let num_str = &s[..num_end];
        let unit = s[num_end..].trim().to_uppercase();

        let multiplier: u64 = match unit.as_str() {
            "B" | "" => 1,
            "KB" | "K" => 1024,
            "MB" | "M" => 1024 * 1024,
            "GB" | "G" => 1024 * 1024 * 1024,
            "TB" | "T" => 1024u64 * 1024 * 1024 * 1024,
            _ => return None,
        };

        num_str.parse::<u64>().ok().map(|n| n * multiplier)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_from_str() {
        assert_eq!(RotationTrigger::from_str(Some("daily")), RotationTrigger::Daily);
        assert_eq!(RotationTrigger::from_str(Some("hourly")), RotationTrigger::Hourly);
        assert_eq!(RotationTrigger::from_str(Some("bogus")), RotationTrigger::Never);
        assert_eq!(RotationTrigger::from_str(None), RotationTrigger::Never);
    }

    #[test]
    fn size_limit_units() {
        assert_eq!(parse_size_limit(Some("100")), Some(100));
        assert_eq!(parse_size_limit(Some("5KB")), Some(5 * 1024));
        assert_eq!(parse_size_limit(Some("10mb")), Some(10 * 1024 * 1024));
        assert_eq!(parse_size_limit(Some("1G")), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size_limit(Some("2TB")), Some(2 * 1024 * 1024 * 1024 * 1024));
        assert_eq!(parse_size_limit(Some("invalid")), None);
        assert_eq!(parse_size_limit(Some("")), None);
    }
}
