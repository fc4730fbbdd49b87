//! Writer trait and the decorator stack.
//!
//! `Writer` is a capability trait rather than an inheritance-shaped sink
//! hierarchy: decorators own their inner writer by value, never by shared
//! reference, so drop order is deterministic and no decorator cycle can
//! form.

pub mod batch;
pub mod buffered;
pub mod critical;
pub mod file;
pub mod filtered;
pub mod formatted;
pub mod memory;
pub mod network;
pub mod rotation;
pub mod sink_async;

use crate::error::WriteError;
use crate::record::LogRecord;

/// The sink contract every writer — plain or decorator — satisfies.
///
/// Implementors must:
/// - preserve the order of `write` calls passed through;
/// - propagate inner errors unless a documented class is absorbed;
/// - flush own state before calling inner `flush`;
/// - attempt a final flush on drop, logging (never propagating) its own
///   failure.
pub trait Writer: Send {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError>;

    /// Must block until every record accepted before this call is durable
    /// within this writer's responsibility.
    fn flush(&mut self) -> Result<(), WriteError>;

    /// Hint for routing/monitoring. `true` until an unrecoverable error is
    /// observed, then `false` until the next successful operation.
    fn healthy(&self) -> bool;

    /// Stable, non-empty, unique within a `Logger`.
    fn name(&self) -> &str;
}

/// A batch-aware extension: decorators that group records (`Batch`) call
/// this when the inner writer implements it, falling back to sequential
/// `write` otherwise.
pub trait BatchWriter: Writer {
    fn write_batch(&mut self, records: &[LogRecord]) -> Result<(), WriteError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }
}

/// Lets a boxed trait object be wrapped by another decorator generic over
/// `W: Writer`, so a decorator stack's depth can vary at runtime.
impl Writer for Box<dyn Writer> {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        (**self).flush()
    }

    fn healthy(&self) -> bool {
        (**self).healthy()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
