//! `Async` decorator: moves the inner writer onto its own worker thread
//! behind a bounded channel, so a slow inner writer (disk, network) never
//! blocks the caller of `Logger::log`.
//!
//! Narrowed to own a single inner `Writer` — the collector in
//! `crate::collector` already fans out across multiple writers; this
//! decorator's job is purely to detach one writer from the caller.

use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};

use crate::error::WriteError;
use crate::record::LogRecord;
use crate::writer::Writer;

enum Message {
    Record(LogRecord),
    Flush(Sender<Result<(), WriteError>>),
}

pub struct Async {
    name: String,
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
    healthy: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl Async {
    pub fn new<W: Writer + 'static>(mut inner: W, queue_capacity: usize) -> Self {
        let name = format!("async({})", inner.name());
        let (sender, receiver) = bounded::<Message>(queue_capacity.max(1));
        let healthy = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
        let healthy_worker = healthy.clone();

        let worker = std::thread::Builder::new()
            .name("forge-log-async-writer".into())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Message::Record(record) => {
                            if inner.write(&record).is_err() {
                                healthy_worker.store(false, std::sync::atomic::Ordering::Relaxed);
                            } else {
                                healthy_worker.store(true, std::sync::atomic::Ordering::Relaxed);
                            }
                        }
                        Message::Flush(reply) => {
                            let result = inner.flush();
                            if result.is_err() {
                                healthy_worker.store(false, std::sync::atomic::Ordering::Relaxed);
                            }
                            let _ = reply.send(result);
                        }
                    }
                }
            })
            .expect("spawning async writer worker thread");

        Async {
            name,
            sender: Some(sender),
            worker: Some(worker),
            healthy,
        }
    }

    fn sender(&self) -> Result<&Sender<Message>, WriteError> {
        self.sender
            .as_ref()
            .ok_or_else(|| WriteError::Transient("async writer worker has stopped".into()))
    }
}

impl Writer for Async {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        self.sender()?
            .send(Message::Record(record.clone()))
            .map_err(|_| WriteError::Transient("async writer worker has stopped".into()))
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.sender()?
            .send(Message::Flush(reply_tx))
            .map_err(|_| WriteError::Transient("async writer worker has stopped".into()))?;
        reply_rx
            .recv()
            .map_err(|_| WriteError::Transient("async writer worker dropped its reply".into()))?
    }

    fn healthy(&self) -> bool {
        self.healthy.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Async {
    fn drop(&mut self) {
        let _ = self.flush();
        // Dropping the sender closes the channel, ending the worker's
        // receive loop so the join below cannot deadlock.
        self.sender.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::record::LogRecordBuilder;
    use crate::writer::memory::MemoryWriter;

    #[test]
    fn records_reach_inner_writer_in_order() {
        let (inner, sink) = MemoryWriter::new("mem");
        let mut async_writer = Async::new(inner, 16);
        for i in 0..20 {
            async_writer
                .write(&LogRecordBuilder::new(Level::Info, format!("m{i}")).build())
                .unwrap();
        }
        async_writer.flush().unwrap();

        let messages: Vec<_> = sink.records().iter().map(|r| r.message.clone()).collect();
        let expected: Vec<_> = (0..20).map(|i| format!("m{i}")).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn flush_waits_for_queue_to_drain() {
        let (inner, sink) = MemoryWriter::new("mem");
        let mut async_writer = Async::new(inner, 4);
        async_writer
            .write(&LogRecordBuilder::new(Level::Info, "x").build())
            .unwrap();
        async_writer.flush().unwrap();
        assert_eq!(sink.len(), 1);
    }
}
