//! JSON-per-line formatter. A `serde_json::Value::Object` would re-sort
//! keys without the `preserve_order` feature, so this formatter instead
//! assembles the JSON text field-by-field, each scalar value serialized
//! through `serde_json` for correct escaping, which keeps fields in
//! insertion order.

use std::fmt::Write as _;

use crate::formatter::Formatter;
use crate::record::{FieldValue, LogRecord};

/// Formats each record as one JSON object per line, matching the wire
/// schema `{"ts":...,"level":...,"msg":...,"file":...,"line":N,"fn":...,
/// "fields":{...},"trace":{...}}`. `file`/`line`/`fn` are emitted only
/// when the record carries a location; `trace` only when it carries a
/// trace context. `fields` is always present, even if empty.
pub struct JsonFormatter {
    pub include_location: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        JsonFormatter { include_location: true }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(128);
        out.push('{');

        let timestamp: chrono::DateTime<chrono::Utc> = record.timestamp.into();
        write_kv(&mut out, true, "ts", &json_string(&timestamp.to_rfc3339()));
        write_kv(&mut out, false, "level", &json_string(record.level.as_str()));
        write_kv(&mut out, false, "msg", &json_string(&record.message));

        if self.include_location {
            if let Some(loc) = &record.location {
                write_kv(&mut out, false, "file", &json_string(loc.file));
                write_kv(&mut out, false, "line", &loc.line.to_string());
                write_kv(&mut out, false, "fn", &json_string(loc.function));
            }
        }

        let mut fields_json = String::from("{");
        for (i, (key, value)) in record.fields.iter().enumerate() {
            write_kv(&mut fields_json, i == 0, key, &field_value_json(value));
        }
        fields_json.push('}');
        write_kv(&mut out, false, "fields", &fields_json);

        if let Some(tc) = &record.trace_context {
            let mut trace_json = String::from("{");
            write_kv(&mut trace_json, true, "trace_id", &json_string(&tc.trace_id));
            write_kv(&mut trace_json, false, "span_id", &json_string(&tc.span_id));
            trace_json.push('}');
            write_kv(&mut out, false, "trace", &trace_json);
        }

        out.push('}');
        out
    }
}

fn write_kv(out: &mut String, first: bool, key: &str, value_json: &str) {
    if !first {
        out.push(',');
    }
    let _ = write!(out, "{}:{}", json_string(key), value_json);
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn field_value_json(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => json_string(s),
        FieldValue::I64(n) => n.to_string(),
        FieldValue::F64(n) => {
            if n.is_finite() {
                n.to_string()
            } else {
                "null".to_string()
            }
        }
        FieldValue::Bool(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::record::{Fields, LogRecordBuilder};

    #[test]
    fn formats_core_fields_and_preserves_field_order() {
        let mut fields = Fields::new();
        fields.set("b", "second");
        fields.set("a", "first");
        let record = LogRecordBuilder::new(Level::Info, "hello").fields(fields).build();

        let text = JsonFormatter::new().format(&record);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["msg"], "hello");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["fields"]["b"], "second");
        assert_eq!(parsed["fields"]["a"], "first");

        let b_pos = text.find("\"b\"").unwrap();
        let a_pos = text.find("\"a\"").unwrap();
        assert!(b_pos < a_pos, "fields must serialize in insertion order");
    }

    #[test]
    fn escapes_special_characters_in_message() {
        let record = LogRecordBuilder::new(Level::Info, "line\nwith \"quotes\"").build();
        let text = JsonFormatter::new().format(&record);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["msg"], "line\nwith \"quotes\"");
    }

    #[test]
    fn nests_location_and_trace_under_their_own_keys() {
        use crate::record::{Location, TraceContext};

        let record = LogRecordBuilder::new(Level::Info, "hello")
            .location(Location {
                file: "main.rs",
                line: 42,
                function: "run",
            })
            .trace_context(
                TraceContext::new(
                    "4bf92f3577b34da6a3ce929d0e0e4736",
                    "00f067aa0ba902b7",
                    "01",
                    "",
                )
                .unwrap(),
            )
            .build();

        let text = JsonFormatter::new().format(&record);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["file"], "main.rs");
        assert_eq!(parsed["line"], 42);
        assert_eq!(parsed["fn"], "run");
        assert_eq!(parsed["trace"]["trace_id"], "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(parsed["trace"]["span_id"], "00f067aa0ba902b7");
    }

    #[test]
    fn fields_key_present_but_empty_when_record_has_no_fields() {
        let record = LogRecordBuilder::new(Level::Info, "hello").build();
        let text = JsonFormatter::new().format(&record);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["fields"], serde_json::json!({}));
    }
}
