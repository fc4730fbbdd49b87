//! `Filtered` decorator: runs a [`FilterChain`] before handing the record to
//! the inner writer; a rejected record is a silent success, never an error.

use crate::error::WriteError;
use crate::filter::FilterChain;
use crate::record::LogRecord;
use crate::writer::Writer;

pub struct Filtered<W: Writer> {
    inner: W,
    chain: FilterChain,
    name: String,
}

impl<W: Writer> Filtered<W> {
    pub fn new(inner: W, chain: FilterChain) -> Self {
        let name = format!("filtered({})", inner.name());
        Filtered { inner, chain, name }
    }
}

impl<W: Writer> Writer for Filtered<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        if !self.chain.accepts(record) {
            return Ok(());
        }
        self.inner.write(record)
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
