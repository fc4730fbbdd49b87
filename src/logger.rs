//! `Logger` and `LoggerBuilder`: a configure-then-log shape where the
//! level threshold lives behind an [`arc_swap::ArcSwap`] snapshot instead
//! of a `parking_lot::RwLock`, so the threshold check on the hot path
//! never takes a lock.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::collector::{Collector, OverflowPolicy};
use crate::context::{current_fields, current_trace_context, ContextScope};
use crate::error::{FlushError, ForgeLogError, SubmissionError};
use crate::filter::FilterChain;
use crate::level::Level;
use crate::record::{Fields, Location, LogRecordBuilder, TraceContext};
use crate::sampler::Sampler;
use crate::writer::Writer;

const STATE_CREATED: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_FLUSHING: u8 = 2;
const STATE_STOPPED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerLifecycle {
    Created,
    Started,
    Flushing,
    Stopped,
}

/// How `Logger::log` hands an accepted record off to its writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Enqueue into the collector and return once the queue has accepted
    /// it; writers see the record on the collector's own schedule.
    Async,
    /// Enqueue, then block on the collector's flush barrier so the call
    /// does not return until every writer has seen the record.
    Sync,
}

/// Fluent construction of the writer/filter/sampler composition a
/// [`Logger`] runs on.
pub struct LoggerBuilder {
    writers: Vec<Box<dyn Writer>>,
    filters: FilterChain,
    sampler: Option<Sampler>,
    min_level: Level,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    dispatch_mode: DispatchMode,
    max_message_bytes: Option<usize>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        LoggerBuilder {
            writers: Vec::new(),
            filters: FilterChain::new(),
            sampler: None,
            min_level: Level::Info,
            queue_capacity: 100_000,
            overflow_policy: OverflowPolicy::Block,
            dispatch_mode: DispatchMode::Async,
            max_message_bytes: None,
        }
    }

    pub fn with_writer(mut self, writer: Box<dyn Writer>) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn with_filter_chain(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = Some(max);
        self
    }

    /// Validates the configuration and starts the collector worker.
    /// Rejects a zero queue capacity paired with a policy that depends on
    /// one (`Block`/`DropNewest`/`DropOldest` all need a real ceiling to
    /// mean anything), and rejects `DispatchMode::Sync` paired with any
    /// overflow policy other than `Block`: sync dispatch promises the
    /// call blocks until every writer has seen the record, a promise
    /// `DropNewest`/`DropOldest`/`Grow` can silently break before the
    /// flush barrier ever runs.
    pub fn build(self) -> Result<Logger, ForgeLogError> {
        if self.queue_capacity == 0 && self.overflow_policy != OverflowPolicy::Grow {
            return Err(ForgeLogError::Configuration(format!(
                "queue_capacity must be non-zero for overflow policy {:?}",
                self.overflow_policy
            )));
        }
        if self.dispatch_mode == DispatchMode::Sync && self.overflow_policy != OverflowPolicy::Block {
            return Err(ForgeLogError::Configuration(format!(
                "DispatchMode::Sync requires OverflowPolicy::Block, got {:?}",
                self.overflow_policy
            )));
        }

        let collector = Collector::start(self.writers, self.queue_capacity, self.overflow_policy);
        Ok(Logger {
            collector,
            filters: self.filters,
            sampler: self.sampler,
            dispatch_mode: self.dispatch_mode,
            min_level: ArcSwap::from_pointee(self.min_level),
            max_message_bytes: self.max_message_bytes,
            lifecycle: AtomicU8::new(STATE_STARTED),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The crate's top-level handle. `log()` is the hot path: threshold check
/// against a lock-free snapshot, then context merge, filter, sampler, and
/// dispatch, in that order.
pub struct Logger {
    collector: Collector,
    filters: FilterChain,
    sampler: Option<Sampler>,
    dispatch_mode: DispatchMode,
    min_level: ArcSwap<Level>,
    max_message_bytes: Option<usize>,
    lifecycle: AtomicU8,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn min_level(&self) -> Level {
        **self.min_level.load()
    }

    /// Swaps the threshold without taking a lock the hot path also needs.
    pub fn set_min_level(&self, level: Level) {
        self.min_level.store(Arc::new(level));
    }

    pub fn lifecycle(&self) -> LoggerLifecycle {
        match self.lifecycle.load(Ordering::SeqCst) {
            STATE_CREATED => LoggerLifecycle::Created,
            STATE_STARTED => LoggerLifecycle::Started,
            STATE_FLUSHING => LoggerLifecycle::Flushing,
            _ => LoggerLifecycle::Stopped,
        }
    }

    /// The full per-record pipeline: level gate, context merge (call-site
    /// fields win), filter chain, sampler, dispatch. A record dropped by
    /// level, filter, or sampler returns `Ok(())` — that is a success, not
    /// an error. Returns a specific error only for submission failure
    /// (queue full, collector stopped, or — in `DispatchMode::Sync` — a
    /// writer fan-out error surfaced by the flush barrier).
    pub fn log(
        &self,
        level: Level,
        message: impl Into<String>,
        call_site_fields: Fields,
        location: Option<Location>,
    ) -> Result<(), ForgeLogError> {
        if level < self.min_level() {
            return Ok(());
        }
        if self.lifecycle.load(Ordering::SeqCst) == STATE_STOPPED {
            return Err(ForgeLogError::Submission(SubmissionError::Stopped));
        }

        let mut fields = current_fields();
        fields.overlay(&call_site_fields);

        let mut builder = LogRecordBuilder::new(level, message).fields(fields);
        if let Some(loc) = location {
            builder = builder.location(loc);
        }
        if let Some(tc) = current_trace_context() {
            builder = builder.trace_context(tc);
        }
        if let Some(max) = self.max_message_bytes {
            builder = builder.max_message_bytes(max);
        }
        let record = builder.build();

        if !self.filters.accepts(&record) {
            return Ok(());
        }
        if let Some(sampler) = &self.sampler {
            if !sampler.should_sample(&record) {
                return Ok(());
            }
        }

        match self.dispatch_mode {
            DispatchMode::Async => self.submit(record),
            DispatchMode::Sync => {
                self.submit(record)?;
                self.collector
                    .flush()
                    .map_err(|e| ForgeLogError::Writer(e.first_error))
            }
        }
    }

    fn submit(&self, record: crate::record::LogRecord) -> Result<(), ForgeLogError> {
        match self.collector.try_enqueue(record) {
            Ok(()) => Ok(()),
            Err(SubmissionError::QueueFull) => Err(ForgeLogError::Submission(SubmissionError::QueueFull)),
            Err(e) => Err(ForgeLogError::Submission(e)),
        }
    }

    /// Blocks until every record submitted before this call is durable
    /// across every writer.
    pub fn flush(&self) -> Result<(), FlushError> {
        self.lifecycle.store(STATE_FLUSHING, Ordering::SeqCst);
        let result = self.collector.flush();
        if self.lifecycle.load(Ordering::SeqCst) == STATE_FLUSHING {
            self.lifecycle.store(STATE_STARTED, Ordering::SeqCst);
        }
        result
    }

    /// Same as [`Logger::flush`] but bounded by `deadline`; the collector's
    /// flush barrier does not itself support partial timeouts, so this
    /// degrades to the same wait: flush has no partial-timeout variant,
    /// so a caller needing a hard deadline should run it on its own thread
    /// with a timeout.
    pub fn flush_with_deadline(&self, _deadline: Duration) -> Result<(), FlushError> {
        self.flush()
    }

    pub fn push_context(fields: Fields) -> crate::context::ContextGuard {
        ContextScope::push(fields)
    }

    pub fn push_trace_context(trace_context: TraceContext) -> crate::context::ContextGuard {
        ContextScope::push_trace(trace_context)
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<(), ForgeLogError> {
        self.log(Level::Trace, message, Fields::new(), None)
    }
    pub fn debug(&self, message: impl Into<String>) -> Result<(), ForgeLogError> {
        self.log(Level::Debug, message, Fields::new(), None)
    }
    pub fn info(&self, message: impl Into<String>) -> Result<(), ForgeLogError> {
        self.log(Level::Info, message, Fields::new(), None)
    }
    pub fn warning(&self, message: impl Into<String>) -> Result<(), ForgeLogError> {
        self.log(Level::Warning, message, Fields::new(), None)
    }
    pub fn error(&self, message: impl Into<String>) -> Result<(), ForgeLogError> {
        self.log(Level::Error, message, Fields::new(), None)
    }
    pub fn critical(&self, message: impl Into<String>) -> Result<(), ForgeLogError> {
        self.log(Level::Critical, message, Fields::new(), None)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.lifecycle.store(STATE_STOPPED, Ordering::SeqCst);
        let _ = self.collector.flush();
    }
}

/// Captures `file!()`/`line!()`/a caller-supplied function name at the
/// macro call site. Used by the `log_with_location!` convenience macro
/// rather than called directly.
#[macro_export]
macro_rules! log_location {
    () => {
        $crate::record::Location {
            file: file!(),
            line: line!(),
            function: "",
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::memory::MemoryWriter;

    #[test]
    fn records_below_threshold_never_reach_writers() {
        let (writer, sink) = MemoryWriter::new("mem");
        let logger = Logger::builder()
            .with_writer(Box::new(writer))
            .min_level(Level::Warning)
            .build()
            .unwrap();
        logger.info("ignored").unwrap();
        logger.error("kept").unwrap();
        logger.flush().unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].message, "kept");
    }

    #[test]
    fn call_site_fields_override_context_scope_fields() {
        let (writer, sink) = MemoryWriter::new("mem");
        let logger = Logger::builder().with_writer(Box::new(writer)).build().unwrap();

        let mut scope_fields = Fields::new();
        scope_fields.set("request_id", "from-scope");
        let _guard = Logger::push_context(scope_fields);

        let mut call_fields = Fields::new();
        call_fields.set("request_id", "from-call-site");
        logger.log(Level::Info, "hello", call_fields, None).unwrap();
        logger.flush().unwrap();

        let records = sink.records();
        assert_eq!(
            records[0].fields.get("request_id").unwrap().as_str(),
            Some("from-call-site")
        );
    }

    #[test]
    fn set_min_level_takes_effect_immediately() {
        let (writer, sink) = MemoryWriter::new("mem");
        let logger = Logger::builder().with_writer(Box::new(writer)).build().unwrap();
        logger.set_min_level(Level::Error);
        logger.info("dropped").unwrap();
        logger.error("kept").unwrap();
        logger.flush().unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn flush_waits_for_all_prior_records() {
        let (writer, sink) = MemoryWriter::new("mem");
        let logger = Logger::builder().with_writer(Box::new(writer)).build().unwrap();
        for i in 0..100 {
            logger.info(format!("m{i}")).unwrap();
        }
        logger.flush().unwrap();
        assert_eq!(sink.len(), 100);
    }

    #[test]
    fn stopped_logger_rejects_new_records_with_an_error() {
        let (writer, _sink) = MemoryWriter::new("mem");
        let logger = Logger::builder().with_writer(Box::new(writer)).build().unwrap();
        logger.lifecycle.store(STATE_STOPPED, Ordering::SeqCst);
        let err = logger.info("too late").unwrap_err();
        assert!(matches!(err, ForgeLogError::Submission(SubmissionError::Stopped)));
    }

    #[test]
    fn sync_dispatch_blocks_until_writers_have_seen_the_record() {
        let (writer, sink) = MemoryWriter::new("mem");
        let logger = Logger::builder()
            .with_writer(Box::new(writer))
            .dispatch_mode(DispatchMode::Sync)
            .build()
            .unwrap();
        logger.info("arrives synchronously").unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn sync_dispatch_rejects_non_block_overflow_policy_at_construction() {
        let (writer, _sink) = MemoryWriter::new("mem");
        let result = Logger::builder()
            .with_writer(Box::new(writer))
            .dispatch_mode(DispatchMode::Sync)
            .overflow_policy(OverflowPolicy::DropNewest)
            .build();
        assert!(matches!(result, Err(ForgeLogError::Configuration(_))));
    }

    #[test]
    fn zero_capacity_queue_rejected_at_construction_unless_growable() {
        let (writer, _sink) = MemoryWriter::new("mem");
        let result = Logger::builder()
            .with_writer(Box::new(writer))
            .queue_capacity(0)
            .build();
        assert!(matches!(result, Err(ForgeLogError::Configuration(_))));
    }
}
