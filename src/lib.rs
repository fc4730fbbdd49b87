//! High-throughput structured logging core.
//!
//! `forge_log` provides a `Logger` built from a composable stack of
//! `Writer`s (plain, rotating, buffered, batched, filtered, formatted,
//! asynchronous, network), gated by a filter chain and an optional
//! sampler, with scoped thread-local context and a best-effort crash-safe
//! flush path. See `DESIGN.md` in the repository root for how each piece
//! is put together and why.

pub mod collector;
pub mod config_env;
pub mod context;
#[cfg(unix)]
pub mod crash_guard;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod level;
pub mod logger;
pub mod record;
pub mod sampler;
pub mod writer;

pub use collector::{Collector, CollectorState, OverflowPolicy};
pub use config_env::{global as global_env_config, EnvConfig};
pub use context::ContextScope;
pub use error::{FlushError, ForgeLogError, Result, SubmissionError, WriteError};
pub use filter::{Filter, FilterChain};
pub use formatter::{Formatter, JsonFormatter, TemplateFormatter};
pub use level::Level;
pub use logger::{DispatchMode, Logger, LoggerBuilder, LoggerLifecycle};
pub use record::{FieldValue, Fields, Location, LogRecord, LogRecordBuilder, TraceContext};
pub use sampler::{Bypass, Sampler, SamplerConfig, Strategy as SamplerStrategy};
pub use writer::Writer;

#[cfg(unix)]
pub use crash_guard::{CrashFlushTarget, CrashGuard};
