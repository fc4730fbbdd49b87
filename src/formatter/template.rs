//! Plain-line template formatter: `[time] [LEVEL] [file:line in function]
//! message | key=value ...`, using a fixed set of placeholders rather than
//! an open-ended `{name}` grammar over arbitrary extra fields.

use crate::formatter::Formatter;
use crate::record::{FieldValue, LogRecord};

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders `[time] [LEVEL] [location] message | k=v ...`, the default
/// plain-text line shape. `time_format` follows `chrono`'s strftime
/// syntax, letting a caller embed a custom `{time:FORMAT}`-equivalent
/// without a template mini-language.
pub struct TemplateFormatter {
    pub time_format: String,
}

impl TemplateFormatter {
    pub fn new() -> Self {
        TemplateFormatter {
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }

    pub fn with_time_format(time_format: impl Into<String>) -> Self {
        TemplateFormatter {
            time_format: time_format.into(),
        }
    }
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TemplateFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let timestamp: chrono::DateTime<chrono::Utc> = record.timestamp.into();
        let time = timestamp.format(&self.time_format);

        let mut line = format!("[{time}] [{}]", record.level);

        if let Some(loc) = &record.location {
            line.push_str(&format!(" [{}:{} in {}]", loc.file, loc.line, loc.function));
        }

        line.push(' ');
        line.push_str(&record.message);

        if let Some(tc) = &record.trace_context {
            line.push_str(&format!(" trace_id={} span_id={}", tc.trace_id, tc.span_id));
        }

        if !record.fields.is_empty() {
            line.push_str(" |");
            for (key, value) in record.fields.iter() {
                line.push_str(&format!(" {key}={}", format_value(value)));
            }
        }

        line
    }
}

fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => s.clone(),
        FieldValue::I64(n) => n.to_string(),
        FieldValue::F64(n) => n.to_string(),
        FieldValue::Bool(b) => b.to_string(),
    }
}
