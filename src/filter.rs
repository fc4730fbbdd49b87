//! Filter chain: a predicate over a [`LogRecord`], combined with
//! short-circuiting AND/OR/NOT, evaluated before the sampler in
//! `Logger::log`.
//!
//! Level-and-regex predicates generalized into composable combinators over
//! a chain, rather than a single flat level-plus-module check.

use regex::Regex;

use crate::level::Level;
use crate::record::LogRecord;

/// A single decision point in the filter chain. Filters are evaluated in
/// chain order; the first filter that rejects short-circuits the rest.
pub trait Filter: Send + Sync {
    fn accepts(&self, record: &LogRecord) -> bool;
}

/// Rejects records below a minimum level.
pub struct LevelAtLeast(pub Level);

impl Filter for LevelAtLeast {
    fn accepts(&self, record: &LogRecord) -> bool {
        record.level >= self.0
    }
}

/// Matches a compiled regex against a named field (or the message, for
/// `field == "message"`).
pub struct FieldMatches {
    field: String,
    pattern: Regex,
}

impl FieldMatches {
    pub fn new(field: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(FieldMatches {
            field: field.into(),
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Filter for FieldMatches {
    fn accepts(&self, record: &LogRecord) -> bool {
        if self.field == "message" {
            return self.pattern.is_match(&record.message);
        }
        record
            .fields
            .get(&self.field)
            .and_then(|v| v.as_str())
            .map(|s| self.pattern.is_match(s))
            .unwrap_or(false)
    }
}

/// Wraps an arbitrary closure as a filter, for one-off predicates a caller
/// doesn't want to name a type for.
pub struct Predicate<F>(pub F)
where
    F: Fn(&LogRecord) -> bool + Send + Sync;

impl<F> Filter for Predicate<F>
where
    F: Fn(&LogRecord) -> bool + Send + Sync,
{
    fn accepts(&self, record: &LogRecord) -> bool {
        (self.0)(record)
    }
}

/// `a AND b`, short-circuiting on `a`'s rejection.
pub struct And<A, B>(pub A, pub B);

impl<A: Filter, B: Filter> Filter for And<A, B> {
    fn accepts(&self, record: &LogRecord) -> bool {
        self.0.accepts(record) && self.1.accepts(record)
    }
}

/// `a OR b`, short-circuiting on `a`'s acceptance.
pub struct Or<A, B>(pub A, pub B);

impl<A: Filter, B: Filter> Filter for Or<A, B> {
    fn accepts(&self, record: &LogRecord) -> bool {
        self.0.accepts(record) || self.1.accepts(record)
    }
}

/// Negation.
pub struct Not<A>(pub A);

impl<A: Filter> Filter for Not<A> {
    fn accepts(&self, record: &LogRecord) -> bool {
        !self.0.accepts(record)
    }
}

/// An ordered chain of boxed filters, evaluated in order with short-circuit
/// on the first rejection — the shape `Logger` actually stores, since a
/// writer's filter list is configured at runtime and can't be a fixed
/// generic type.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        FilterChain { filters: Vec::new() }
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn accepts(&self, record: &LogRecord) -> bool {
        self.filters.iter().all(|f| f.accepts(record))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecordBuilder;

    fn rec(level: Level, msg: &str) -> LogRecord {
        LogRecordBuilder::new(level, msg).build()
    }

    #[test]
    fn level_filter_rejects_below_threshold() {
        let f = LevelAtLeast(Level::Warning);
        assert!(!f.accepts(&rec(Level::Info, "x")));
        assert!(f.accepts(&rec(Level::Error, "x")));
    }

    #[test]
    fn field_matches_checks_message_by_name() {
        let f = FieldMatches::new("message", "^boot").unwrap();
        assert!(f.accepts(&rec(Level::Info, "boot sequence")));
        assert!(!f.accepts(&rec(Level::Info, "shutdown sequence")));
    }

    #[test]
    fn combinators_short_circuit() {
        let calls = std::cell::Cell::new(0);
        let always_false = Predicate(|_: &LogRecord| false);
        let counting = Predicate(|_: &LogRecord| {
            calls.set(calls.get() + 1);
            true
        });
        let chain = And(always_false, counting);
        assert!(!chain.accepts(&rec(Level::Info, "x")));
        assert_eq!(calls.get(), 0, "second predicate must not run after AND short-circuits");
    }

    #[test]
    fn chain_evaluates_in_order_and_short_circuits() {
        let mut chain = FilterChain::new();
        chain.push(Box::new(LevelAtLeast(Level::Warning)));
        chain.push(Box::new(FieldMatches::new("message", "critical").unwrap()));
        assert!(!chain.accepts(&rec(Level::Info, "critical failure")));
        assert!(!chain.accepts(&rec(Level::Error, "routine")));
        assert!(chain.accepts(&rec(Level::Error, "critical failure")));
    }
}
