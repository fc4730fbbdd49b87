//! Bounded collector: a worker thread pulls batches off a bounded queue
//! carrying an explicit overflow policy, and fans out across more than
//! four writers with `rayon` rather than writing to each sequentially —
//! a collector backing more than a handful of writers should not
//! serialize on the slowest one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender as ReplySender;
use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;

use crate::error::{FlushError, SubmissionError, WriteError};
use crate::record::LogRecord;
use crate::writer::Writer;

/// What happens to a submission when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// `enqueue_blocking` waits for space; `try_enqueue` fails immediately.
    Block,
    /// The incoming record is dropped; the call still returns success.
    DropNewest,
    /// The oldest queued record is evicted to make room.
    DropOldest,
    /// The queue grows without a capacity ceiling.
    Grow,
}

const STATE_UNINITIALIZED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_DRAINING: u8 = 2;
const STATE_STOPPED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Uninitialized,
    Running,
    Draining,
    Stopped,
}

enum Message {
    Record(LogRecord),
    Flush(ReplySender<Result<(), FlushError>>),
}

struct Shared {
    items: Mutex<VecDeque<Message>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    policy: OverflowPolicy,
    state: AtomicU8,
}

/// Owns the worker thread and the writer set it drains into. `Logger`
/// holds one `Collector` per async dispatch path.
pub struct Collector {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Collector {
    pub fn start(writers: Vec<Box<dyn Writer>>, capacity: usize, policy: OverflowPolicy) -> Collector {
        let effective_capacity = match policy {
            OverflowPolicy::Grow => usize::MAX,
            _ => capacity.max(1),
        };
        let shared = Arc::new(Shared {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: effective_capacity,
            policy,
            state: AtomicU8::new(STATE_RUNNING),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("forge-log-collector".into())
            .spawn(move || run_worker(worker_shared, writers))
            .expect("spawning collector worker thread");

        Collector {
            shared,
            worker: Some(worker),
        }
    }

    pub fn state(&self) -> CollectorState {
        match self.shared.state.load(Ordering::SeqCst) {
            STATE_UNINITIALIZED => CollectorState::Uninitialized,
            STATE_RUNNING => CollectorState::Running,
            STATE_DRAINING => CollectorState::Draining,
            _ => CollectorState::Stopped,
        }
    }

    /// Non-blocking submission; fails immediately rather than waiting for
    /// space, regardless of `OverflowPolicy`. Never blocks.
    pub fn try_enqueue(&self, record: LogRecord) -> Result<(), SubmissionError> {
        if self.shared.state.load(Ordering::SeqCst) == STATE_STOPPED {
            return Err(SubmissionError::Stopped);
        }
        let mut items = self.shared.items.lock();
        self.push_with_policy(&mut items, record)
    }

    /// Blocking submission honoring `OverflowPolicy::Block`'s wait
    /// semantics up to `deadline`; other policies behave the same as
    /// `try_enqueue` since they never need to wait.
    pub fn enqueue_blocking(&self, record: LogRecord, deadline: Duration) -> Result<(), SubmissionError> {
        if self.shared.state.load(Ordering::SeqCst) == STATE_STOPPED {
            return Err(SubmissionError::Stopped);
        }
        let mut items = self.shared.items.lock();
        if self.shared.policy != OverflowPolicy::Block {
            return self.push_with_policy(&mut items, record);
        }

        let deadline_at = Instant::now() + deadline;
        while items.len() >= self.shared.capacity {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SubmissionError::Timeout);
            }
            let timed_out = self.shared.not_full.wait_for(&mut items, remaining).timed_out();
            if timed_out && items.len() >= self.shared.capacity {
                return Err(SubmissionError::Timeout);
            }
        }
        items.push_back(Message::Record(record));
        drop(items);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    fn push_with_policy(
        &self,
        items: &mut VecDeque<Message>,
        record: LogRecord,
    ) -> Result<(), SubmissionError> {
        match self.shared.policy {
            OverflowPolicy::Block => {
                if items.len() >= self.shared.capacity {
                    return Err(SubmissionError::QueueFull);
                }
                items.push_back(Message::Record(record));
            }
            OverflowPolicy::DropNewest => {
                if items.len() >= self.shared.capacity {
                    return Ok(());
                }
                items.push_back(Message::Record(record));
            }
            OverflowPolicy::DropOldest => {
                if items.len() >= self.shared.capacity {
                    items.pop_front();
                }
                items.push_back(Message::Record(record));
            }
            OverflowPolicy::Grow => {
                items.push_back(Message::Record(record));
            }
        }
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until every record enqueued before this call has been
    /// dispatched to every writer and every writer has flushed: the flush
    /// barrier.
    pub fn flush(&self) -> Result<(), FlushError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        {
            let mut items = self.shared.items.lock();
            items.push_back(Message::Flush(reply_tx));
            self.shared.not_empty.notify_one();
        }
        reply_rx.recv().unwrap_or(Ok(()))
    }

    /// Waits for the queue to drain, then stops the worker. Already-queued
    /// records are delivered; new submissions after this call are
    /// rejected.
    pub fn shutdown_graceful(&mut self) {
        self.shared.state.store(STATE_DRAINING, Ordering::SeqCst);
        let _ = self.flush();
        self.shared.state.store(STATE_STOPPED, Ordering::SeqCst);
        self.shared.not_empty.notify_all();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    /// Stops the worker immediately; anything still queued is discarded.
    pub fn shutdown_forced(&mut self) {
        self.shared.state.store(STATE_STOPPED, Ordering::SeqCst);
        {
            let mut items = self.shared.items.lock();
            items.clear();
        }
        self.shared.not_empty.notify_all();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if self.shared.state.load(Ordering::SeqCst) != STATE_STOPPED {
            self.shutdown_graceful();
        }
    }
}

fn run_worker(shared: Arc<Shared>, mut writers: Vec<Box<dyn Writer>>) {
    loop {
        let batch = {
            let mut items = shared.items.lock();
            while items.is_empty() && shared.state.load(Ordering::SeqCst) != STATE_STOPPED {
                shared.not_empty.wait(&mut items);
            }
            if items.is_empty() {
                break;
            }
            let drained: Vec<Message> = items.drain(..).collect();
            shared.not_full.notify_all();
            drained
        };

        let mut records: Vec<LogRecord> = Vec::with_capacity(batch.len());
        let mut flush_replies: Vec<ReplySender<Result<(), FlushError>>> = Vec::new();
        for message in batch {
            match message {
                Message::Record(r) => records.push(r),
                Message::Flush(reply) => flush_replies.push(reply),
            }
        }

        if !records.is_empty() {
            dispatch_batch(&mut writers, &records);
        }

        if !flush_replies.is_empty() {
            let result = flush_all(&mut writers);
            for reply in flush_replies {
                let _ = reply.send(match &result {
                    Ok(()) => Ok(()),
                    Err(e) => Err(FlushError {
                        first_error: clone_write_error(&e.first_error),
                        failed_count: e.failed_count,
                    }),
                });
            }
        }
    }
}

fn dispatch_batch(writers: &mut [Box<dyn Writer>], batch: &[LogRecord]) {
    if writers.len() > 4 {
        writers.par_iter_mut().for_each(|writer| {
            for record in batch {
                if let Err(e) = writer.write(record) {
                    tracing::warn!(writer = writer.name(), error = %e, "write failed, dropping rest of batch for this writer");
                    break;
                }
            }
        });
    } else {
        for writer in writers.iter_mut() {
            for record in batch {
                if let Err(e) = writer.write(record) {
                    tracing::warn!(writer = writer.name(), error = %e, "write failed, dropping rest of batch for this writer");
                    break;
                }
            }
        }
    }
}

fn flush_all(writers: &mut [Box<dyn Writer>]) -> Result<(), FlushError> {
    let mut first_error: Option<WriteError> = None;
    let mut failed_count = 0usize;
    for writer in writers.iter_mut() {
        if let Err(e) = writer.flush() {
            failed_count += 1;
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }
    match first_error {
        Some(first_error) => Err(FlushError {
            first_error,
            failed_count,
        }),
        None => Ok(()),
    }
}

fn clone_write_error(e: &WriteError) -> WriteError {
    match e {
        WriteError::Io(io_err) => WriteError::Io(std::io::Error::new(io_err.kind(), io_err.to_string())),
        WriteError::Transient(msg) => WriteError::Transient(msg.clone()),
        WriteError::Rotation(msg) => WriteError::Rotation(msg.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::record::LogRecordBuilder;
    use crate::writer::memory::MemoryWriter;

    fn rec(msg: &str) -> LogRecord {
        LogRecordBuilder::new(Level::Info, msg).build()
    }

    #[test]
    fn preserves_fifo_order_through_one_writer() {
        let (writer, sink) = MemoryWriter::new("mem");
        let collector = Collector::start(vec![Box::new(writer)], 1024, OverflowPolicy::Block);
        for i in 0..50 {
            collector.try_enqueue(rec(&format!("m{i}"))).unwrap();
        }
        collector.flush().unwrap();
        let messages: Vec<_> = sink.records().iter().map(|r| r.message.clone()).collect();
        let expected: Vec<_> = (0..50).map(|i| format!("m{i}")).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn drop_newest_silently_discards_when_full() {
        let (writer, sink) = MemoryWriter::new("mem");
        let collector = Collector::start(vec![Box::new(writer)], 2, OverflowPolicy::DropNewest);
        // Fill and overflow before the worker can drain, by enqueueing
        // from this thread with no yield in between is best-effort under
        // a real scheduler; this test only asserts no error and no panic.
        for i in 0..10 {
            let _ = collector.try_enqueue(rec(&format!("m{i}")));
        }
        collector.flush().unwrap();
        assert!(sink.len() <= 10);
    }

    #[test]
    fn flush_waits_for_all_queued_records() {
        let (writer, sink) = MemoryWriter::new("mem");
        let collector = Collector::start(vec![Box::new(writer)], 1024, OverflowPolicy::Block);
        for i in 0..200 {
            collector.try_enqueue(rec(&format!("m{i}"))).unwrap();
        }
        collector.flush().unwrap();
        assert_eq!(sink.len(), 200);
    }

    #[test]
    fn fans_out_to_more_than_four_writers() {
        let mut writers: Vec<Box<dyn Writer>> = Vec::new();
        let mut sinks = Vec::new();
        for i in 0..6 {
            let (writer, sink) = MemoryWriter::new(format!("mem{i}"));
            writers.push(Box::new(writer));
            sinks.push(sink);
        }
        let collector = Collector::start(writers, 1024, OverflowPolicy::Block);
        collector.try_enqueue(rec("hello")).unwrap();
        collector.flush().unwrap();
        for sink in sinks {
            assert_eq!(sink.len(), 1);
        }
    }

    #[test]
    fn stopped_collector_rejects_submissions() {
        let (writer, _sink) = MemoryWriter::new("mem");
        let mut collector = Collector::start(vec![Box::new(writer)], 16, OverflowPolicy::Block);
        collector.shutdown_graceful();
        assert_eq!(collector.try_enqueue(rec("late")), Err(SubmissionError::Stopped));
    }
}
