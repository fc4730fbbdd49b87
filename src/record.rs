//! The immutable [`LogRecord`] value and its structured field/trace-context
//! payloads.

use std::time::SystemTime;

use crate::level::Level;

/// Truncation ceiling for `LogRecord::message` when a caller opts into
/// bounded messages: unlimited by default, but a caller may truncate at
/// 1 MiB and append a marker.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;
const TRUNCATION_MARKER: &str = "...[truncated]";

/// A structured field value, deliberately closed to four kinds — an open
/// `serde_json::Value` would let a filter or formatter accidentally depend
/// on nested-structure shapes no writer is guaranteed to preserve.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}
impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}
impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::I64(v)
    }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::F64(v)
    }
}
impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// Ordered string→[`FieldValue`] map with enforced key uniqueness: setting
/// an existing key replaces its value in place rather than appending a
/// duplicate, keeping JSON field order insertion-order-stable.
///
/// A plain `Vec<(String, FieldValue)>` rather than `serde_json::Map`
/// (default-built as a `BTreeMap`, re-sorting keys) or a hashmap (no
/// ordering at all) is the only representation that satisfies both
/// constraints without adding an ordered-map dependency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Fields(Vec::new())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays `other` on top of `self`: keys in `other` win on collision,
    /// new keys from `other` are appended in `other`'s order. Used by
    /// `Logger::log` to merge call-site fields over the context-scope
    /// snapshot, where the call site wins on key collision.
    pub fn overlay(&mut self, other: &Fields) {
        for (k, v) in other.iter() {
            self.set(k, v.clone());
        }
    }
}

impl FromIterator<(String, FieldValue)> for Fields {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.set(k, v);
        }
        fields
    }
}

/// W3C-trace-context-shaped identifiers carried alongside a record.
///
/// `trace_id` and `span_id` must be hex-valid and length-correct;
/// `TraceContext::new` enforces that at construction so a record can never
/// carry an invalid one.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub flags: String,
    pub state: String,
}

impl TraceContext {
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        flags: impl Into<String>,
        state: impl Into<String>,
    ) -> Option<TraceContext> {
        let trace_id = trace_id.into();
        let span_id = span_id.into();
        let flags = flags.into();
        if !is_hex_of_len(&trace_id, 32) || !is_hex_of_len(&span_id, 16) || !is_hex_of_len(&flags, 2)
        {
            return None;
        }
        Some(TraceContext {
            trace_id,
            span_id,
            flags,
            state: state.into(),
        })
    }
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Source location captured at the call site, if requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

/// An immutable logging event. Once built, nothing downstream may rewrite
/// `level`, `message`, `timestamp`, or `fields` — every decorator in the
/// writer stack depends on that immutability holding all the way to the
/// innermost writer.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub timestamp: SystemTime,
    pub location: Option<Location>,
    pub fields: Fields,
    pub trace_context: Option<TraceContext>,
}

/// Builder for a [`LogRecord`]; the only place message truncation and
/// context-merge happen, keeping `LogRecord` itself a plain immutable
/// value.
pub struct LogRecordBuilder {
    level: Level,
    message: String,
    location: Option<Location>,
    fields: Fields,
    trace_context: Option<TraceContext>,
    max_message_bytes: Option<usize>,
}

impl LogRecordBuilder {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogRecordBuilder {
            level,
            message: message.into(),
            location: None,
            fields: Fields::new(),
            trace_context: None,
            max_message_bytes: None,
        }
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn trace_context(mut self, trace_context: TraceContext) -> Self {
        self.trace_context = Some(trace_context);
        self
    }

    pub fn max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = Some(max);
        self
    }

    pub fn build(self) -> LogRecord {
        let limit = self.max_message_bytes.unwrap_or(usize::MAX);
        let message = truncate_message(self.message, limit);
        LogRecord {
            level: self.level,
            message,
            timestamp: SystemTime::now(),
            location: self.location,
            fields: self.fields,
            trace_context: self.trace_context,
        }
    }
}

fn truncate_message(message: String, limit: usize) -> String {
    if message.len() <= limit {
        return message;
    }
    let mut cut = limit.saturating_sub(TRUNCATION_MARKER.len());
    while cut > 0 && !message.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
    out.push_str(&message[..cut]);
    out.push_str(TRUNCATION_MARKER);
    out
}
