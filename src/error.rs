//! Error taxonomy: configuration, submission, writer, and fatal errors,
//! each with a hand-written `Display`/`std::error::Error` pair rather than
//! a `thiserror` derive.

use std::fmt;

/// Why a record failed to enter the collector's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// `try_enqueue` found the queue full under `OverflowPolicy::DropNewest`
    /// or `OverflowPolicy::Block` past its deadline.
    QueueFull,
    /// The collector's worker has already stopped; no further records are
    /// accepted.
    Stopped,
    /// `enqueue_blocking` hit its deadline before space freed.
    Timeout,
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::QueueFull => write!(f, "collector queue is full"),
            SubmissionError::Stopped => write!(f, "collector has stopped accepting records"),
            SubmissionError::Timeout => write!(f, "submission deadline elapsed before space freed"),
        }
    }
}

/// Failures a [`crate::writer::Writer`] surfaces from `write`/`flush`.
#[derive(Debug)]
pub enum WriteError {
    Io(std::io::Error),
    /// A retryable failure from a network-backed sink, e.g. a transient
    /// network write failure.
    Transient(String),
    Rotation(String),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Io(e) => write!(f, "I/O error: {e}"),
            WriteError::Transient(msg) => write!(f, "transient write failure: {msg}"),
            WriteError::Rotation(msg) => write!(f, "rotation failure: {msg}"),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<std::io::Error> for WriteError {
    fn from(e: std::io::Error) -> Self {
        WriteError::Io(e)
    }
}

/// The crate-wide error type surfaced from construction and submission
/// paths. The hot path (`Logger::log`) never returns this for drops by
/// level/filter/sampler — those are successes, not errors.
#[derive(Debug)]
pub enum ForgeLogError {
    /// Invalid level string, invalid queue size, conflicting strategy —
    /// reported only at construction time.
    Configuration(String),
    Submission(SubmissionError),
    Writer(WriteError),
    /// Unrecoverable internal invariant violation.
    Fatal(String),
}

impl fmt::Display for ForgeLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForgeLogError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            ForgeLogError::Submission(e) => write!(f, "submission error: {e}"),
            ForgeLogError::Writer(e) => write!(f, "writer error: {e}"),
            ForgeLogError::Fatal(msg) => write!(f, "fatal error: {msg}"),
        }
    }
}

impl std::error::Error for ForgeLogError {}

impl From<SubmissionError> for ForgeLogError {
    fn from(e: SubmissionError) -> Self {
        ForgeLogError::Submission(e)
    }
}

impl From<WriteError> for ForgeLogError {
    fn from(e: WriteError) -> Self {
        ForgeLogError::Writer(e)
    }
}

/// Aggregate of one or more flush failures across a writer set: reported
/// to the flush caller as a first-error plus a failure count.
#[derive(Debug)]
pub struct FlushError {
    pub first_error: WriteError,
    pub failed_count: usize,
}

impl fmt::Display for FlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} writer(s) failed to flush; first error: {}",
            self.failed_count, self.first_error
        )
    }
}

impl std::error::Error for FlushError {}

pub type Result<T> = std::result::Result<T, ForgeLogError>;
