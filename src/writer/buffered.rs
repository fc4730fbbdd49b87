//! `Buffered` decorator: accumulates records in a bounded memory buffer and
//! flushes to the inner writer once `capacity` records have queued, once
//! `flush_interval` has elapsed since the last drain, or on an explicit
//! `flush` (which drains it regardless of either trigger).
//!
//! Synchronous and single-inner; a channel-backed worker is
//! [`super::sink_async`]'s concern instead.

use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::error::WriteError;
use crate::record::LogRecord;
use crate::writer::{BatchWriter, Writer};

const INLINE_CAPACITY: usize = 8;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

pub struct Buffered<W: Writer> {
    inner: W,
    capacity: usize,
    flush_interval: Duration,
    last_flush: Instant,
    pending: SmallVec<[LogRecord; INLINE_CAPACITY]>,
    name: String,
}

impl<W: Writer> Buffered<W> {
    pub fn new(inner: W, capacity: usize) -> Self {
        Self::with_flush_interval(inner, capacity, DEFAULT_FLUSH_INTERVAL)
    }

    pub fn with_flush_interval(inner: W, capacity: usize, flush_interval: Duration) -> Self {
        let name = format!("buffered({})", inner.name());
        Buffered {
            inner,
            capacity: capacity.max(1),
            flush_interval,
            last_flush: Instant::now(),
            pending: SmallVec::new(),
            name,
        }
    }

    fn drain(&mut self) -> Result<(), WriteError> {
        self.last_flush = Instant::now();
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch: Vec<LogRecord> = self.pending.drain(..).collect();
        for record in &batch {
            self.inner.write(record)?;
        }
        Ok(())
    }
}

impl<W: Writer> Writer for Buffered<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        self.pending.push(record.clone());
        if self.pending.len() >= self.capacity || self.last_flush.elapsed() >= self.flush_interval
        {
            self.drain()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        self.drain()?;
        self.inner.flush()
    }

    fn healthy(&self) -> bool {
        self.inner.healthy()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<W: Writer> BatchWriter for Buffered<W> {}

impl<W: Writer> Drop for Buffered<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
