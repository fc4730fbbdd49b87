//! `Critical` decorator: for each record at or above a configured
//! threshold, takes a critical lock and forces a flush after the write,
//! trading throughput for durability on those records only. Records below
//! the threshold pass through unchanged, so `Critical` stacked around a
//! `Batch` only defeats batching for the traffic that actually needs the
//! guarantee.

use parking_lot::Mutex;

use crate::error::WriteError;
use crate::level::Level;
use crate::record::LogRecord;
use crate::writer::Writer;

pub struct Critical<W: Writer> {
    inner: W,
    threshold: Level,
    lock: Mutex<()>,
    name: String,
}

impl<W: Writer> Critical<W> {
    pub fn new(inner: W, threshold: Level) -> Self {
        let name = format!("critical({})", inner.name());
        Critical {
            inner,
            threshold,
            lock: Mutex::new(()),
            name,
        }
    }
}

impl<W: Writer> Writer for Critical<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        if record.level < self.threshold {
            return self.inner.write(record);
        }
        let _guard = self.lock.lock();
        self.inner.write(record)?;
        self.inner.flush()
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        self.inner.flush()
    }

    fn healthy(&self) -> bool {
        self.inner.healthy()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
