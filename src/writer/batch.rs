//! `Batch` decorator: groups records into fixed-size batches and hands each
//! group to the inner writer's [`BatchWriter::write_batch`] in one call,
//! falling back to sequential `write` when the inner writer doesn't
//! implement it.
//!
//! Distinct from [`super::buffered::Buffered`]: `Buffered` exists to cut
//! down the number of `write` calls crossing into the inner writer; `Batch`
//! exists to give the inner writer a chance to exploit group writes (e.g. a
//! single syscall for N lines, or one HTTP POST for N records).

use crate::error::WriteError;
use crate::record::LogRecord;
use crate::writer::{BatchWriter, Writer};

pub struct Batch<W: BatchWriter> {
    inner: W,
    batch_size: usize,
    pending: Vec<LogRecord>,
    name: String,
}

impl<W: BatchWriter> Batch<W> {
    pub fn new(inner: W, batch_size: usize) -> Self {
        let name = format!("batch({})", inner.name());
        Batch {
            inner,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            name,
        }
    }

    fn drain(&mut self) -> Result<(), WriteError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        self.inner.write_batch(&batch)
    }
}

impl<W: BatchWriter> Writer for Batch<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        self.pending.push(record.clone());
        if self.pending.len() >= self.batch_size {
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

impl<W: BatchWriter> Drop for Batch<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
