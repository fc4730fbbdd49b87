//! An in-memory, `Vec`-backed writer for tests: a reusable writer so
//! scenario tests can assert on ordering and content without touching the
//! filesystem.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::WriteError;
use crate::record::LogRecord;
use crate::writer::Writer;

/// Shared handle to a [`MemoryWriter`]'s captured records, clonable so a
/// test can hold one end while the `Logger` owns the writer.
#[derive(Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<LogRecord>>>);

impl MemorySink {
    pub fn new() -> Self {
        MemorySink(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Writer half of [`MemorySink`]; never reports unhealthy, never fails.
pub struct MemoryWriter {
    name: String,
    sink: MemorySink,
    flushed: bool,
}

impl MemoryWriter {
    pub fn new(name: impl Into<String>) -> (MemoryWriter, MemorySink) {
        let sink = MemorySink::new();
        let writer = MemoryWriter {
            name: name.into(),
            sink: sink.clone(),
            flushed: true,
        };
        (writer, sink)
    }
}

impl Writer for MemoryWriter {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        self.sink.0.lock().push(record.clone());
        self.flushed = false;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        self.flushed = true;
        Ok(())
    }

    fn healthy(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}
