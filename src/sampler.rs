//! Sampling strategies and bypass precedence: level bypass, then
//! field-presence bypass, then a per-field-value rate entry, then a
//! per-category rate, then the base strategy. Config is a lock-free
//! snapshot since `Logger::log` reads it on every call and cannot afford a
//! lock there.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::level::Level;
use crate::record::LogRecord;

/// Base sampling strategy, chosen when no bypass rule applies.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Accept with fixed probability `rate` in `[0.0, 1.0]`.
    Random { rate: f64 },
    /// Token-bucket: at most `max_per_second` accepted records per rolling
    /// one-second window.
    RateLimiting { max_per_second: u32 },
    /// Gain/decay toward `p_min`/`p_max` driven by the observed accept rate
    /// over a sliding window, converging on `target_rate`.
    Adaptive {
        p_min: f64,
        p_max: f64,
        target_rate: f64,
    },
    /// Deterministic accept/reject keyed by an FNV-1a hash of a chosen
    /// field, for consistently sampling (or excluding) a cohort.
    HashBased { field: String, accept_fraction: f64 },
}

/// A bypass rule evaluated before the base strategy; the first matching
/// rule decides the record's fate outright.
#[derive(Debug, Clone)]
pub enum Bypass {
    /// Records at or above this level always sample.
    LevelAtLeast(Level),
    /// Records carrying this field (any value) always sample.
    FieldPresent(String),
    /// Records where `field == value` get `rate` instead of the base
    /// strategy's rate.
    FieldValueRate { field: String, value: String, rate: f64 },
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub strategy: Strategy,
    pub bypasses: Vec<Bypass>,
    /// Per-category (by `category` field) override rate, checked after
    /// field-value bypasses and before the base strategy. `AHashMap` over
    /// `std::collections::HashMap` since this is a hot-path lookup keyed by
    /// plain strings with no need for DoS-resistant hashing.
    pub category_rates: AHashMap<String, f64>,
}

impl SamplerConfig {
    pub fn new(strategy: Strategy) -> Self {
        SamplerConfig {
            strategy,
            bypasses: Vec::new(),
            category_rates: AHashMap::new(),
        }
    }

    pub fn with_bypass(mut self, bypass: Bypass) -> Self {
        self.bypasses.push(bypass);
        self
    }

    pub fn with_category_rate(mut self, category: impl Into<String>, rate: f64) -> Self {
        self.category_rates.insert(category.into(), rate);
        self
    }
}

struct RandomState {
    rng: AtomicU64,
}

impl RandomState {
    fn new(seed: u64) -> Self {
        RandomState {
            rng: AtomicU64::new(seed | 1),
        }
    }

    /// xorshift64: a fast non-cryptographic PRNG on the hot path, avoiding
    /// the extra dependency a full `rand` crate would add.
    fn next_f64(&self) -> f64 {
        let mut x = self.rng.load(Ordering::Relaxed);
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng.store(x, Ordering::Relaxed);
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

struct RateLimiterState {
    window_start: Mutex<Instant>,
    count_in_window: AtomicU64,
}

impl RateLimiterState {
    fn new() -> Self {
        RateLimiterState {
            window_start: Mutex::new(Instant::now()),
            count_in_window: AtomicU64::new(0),
        }
    }

    fn allow(&self, max_per_second: u32) -> bool {
        let mut window_start = self.window_start.lock();
        if window_start.elapsed() >= Duration::from_secs(1) {
            *window_start = Instant::now();
            self.count_in_window.store(0, Ordering::Relaxed);
        }
        let prev = self.count_in_window.fetch_add(1, Ordering::Relaxed);
        prev < max_per_second as u64
    }
}

struct AdaptiveState {
    current_rate: Mutex<f64>,
    window_start: Mutex<Instant>,
    seen: AtomicU64,
    accepted: AtomicU64,
}

impl AdaptiveState {
    fn new(initial: f64) -> Self {
        AdaptiveState {
            current_rate: Mutex::new(initial),
            window_start: Mutex::new(Instant::now()),
            seen: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    /// Gain/decay toward `p_min`/`p_max` once per one-second window: if the
    /// observed accept rate undershot `target_rate`, increase the sampling
    /// probability toward `p_max`; if it overshot, decrease it toward
    /// `p_min`.
    fn sample(&self, rng: &RandomState, p_min: f64, p_max: f64, target_rate: f64) -> bool {
        self.seen.fetch_add(1, Ordering::Relaxed);
        let rate = *self.current_rate.lock();
        let accept = rng.next_f64() < rate;
        if accept {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        }

        let mut window_start = self.window_start.lock();
        if window_start.elapsed() >= Duration::from_secs(1) {
            let seen = self.seen.swap(0, Ordering::Relaxed).max(1);
            let accepted = self.accepted.swap(0, Ordering::Relaxed);
            let observed = accepted as f64 / seen as f64;
            let mut rate = self.current_rate.lock();
            const STEP: f64 = 0.1;
            if observed < target_rate {
                *rate = (*rate + STEP * (p_max - *rate)).min(p_max);
            } else {
                *rate = (*rate - STEP * (*rate - p_min)).max(p_min);
            }
            *window_start = Instant::now();
        }
        accept
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Runtime sampler state. Config is held behind an [`ArcSwap`] so
/// `should_sample` never blocks on a writer reconfiguring it.
pub struct Sampler {
    config: ArcSwap<SamplerConfig>,
    random: RandomState,
    rate_limiter: RateLimiterState,
    adaptive: AdaptiveState,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        let adaptive_initial = match &config.strategy {
            Strategy::Adaptive { p_min, p_max, .. } => (p_min + p_max) / 2.0,
            _ => 1.0,
        };
        Sampler {
            config: ArcSwap::from_pointee(config),
            random: RandomState::new(0x9e3779b97f4a7c15),
            rate_limiter: RateLimiterState::new(),
            adaptive: AdaptiveState::new(adaptive_initial),
        }
    }

    pub fn reconfigure(&self, config: SamplerConfig) {
        self.config.store(std::sync::Arc::new(config));
    }

    /// Evaluates bypass rules in order, then the base strategy: level
    /// bypass, field-presence bypass, field-value rate, category rate,
    /// base strategy.
    pub fn should_sample(&self, record: &LogRecord) -> bool {
        let config = self.config.load();

        for bypass in &config.bypasses {
            match bypass {
                Bypass::LevelAtLeast(level) => {
                    if record.level >= *level {
                        return true;
                    }
                }
                Bypass::FieldPresent(field) => {
                    if record.fields.contains_key(field) {
                        return true;
                    }
                }
                Bypass::FieldValueRate { field, value, rate } => {
                    if record.fields.get(field).and_then(|v| v.as_str()) == Some(value.as_str()) {
                        return self.random.next_f64() < *rate;
                    }
                }
            }
        }

        if let Some(category) = record.fields.get("category").and_then(|v| v.as_str()) {
            if let Some(rate) = config.category_rates.get(category) {
                return self.random.next_f64() < *rate;
            }
        }

        match &config.strategy {
            Strategy::Random { rate } => self.random.next_f64() < *rate,
            Strategy::RateLimiting { max_per_second } => self.rate_limiter.allow(*max_per_second),
            Strategy::Adaptive {
                p_min,
                p_max,
                target_rate,
            } => self.adaptive.sample(&self.random, *p_min, *p_max, *target_rate),
            Strategy::HashBased { field, accept_fraction } => {
                let value = record
                    .fields
                    .get(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let hash = fnv1a(value.as_bytes());
                let normalized = (hash >> 11) as f64 / (1u64 << 53) as f64;
                normalized < *accept_fraction
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Fields, LogRecordBuilder};

    fn rec(level: Level, category: Option<&str>) -> LogRecord {
        let mut fields = Fields::new();
        if let Some(c) = category {
            fields.set("category", c);
        }
        LogRecordBuilder::new(level, "x").fields(fields).build()
    }

    #[test]
    fn level_bypass_always_samples() {
        let config = SamplerConfig::new(Strategy::Random { rate: 0.0 })
            .with_bypass(Bypass::LevelAtLeast(Level::Error));
        let sampler = Sampler::new(config);
        assert!(sampler.should_sample(&rec(Level::Error, None)));
    }

    #[test]
    fn hash_based_is_deterministic_for_same_key() {
        let config = SamplerConfig::new(Strategy::HashBased {
            field: "category".into(),
            accept_fraction: 0.5,
        });
        let sampler = Sampler::new(config);
        let a = rec(Level::Info, Some("checkout"));
        let first = sampler.should_sample(&a);
        for _ in 0..10 {
            assert_eq!(sampler.should_sample(&a), first);
        }
    }

    #[test]
    fn category_rate_overrides_base_strategy() {
        let config = SamplerConfig::new(Strategy::Random { rate: 0.0 })
            .with_category_rate("noisy", 1.0);
        let sampler = Sampler::new(config);
        assert!(sampler.should_sample(&rec(Level::Info, Some("noisy"))));
    }

    #[test]
    fn rate_limiting_caps_accepts_per_window() {
        let config = SamplerConfig::new(Strategy::RateLimiting { max_per_second: 3 });
        let sampler = Sampler::new(config);
        let accepted: usize = (0..10)
            .filter(|_| sampler.should_sample(&rec(Level::Info, None)))
            .count();
        assert_eq!(accepted, 3);
    }

    #[test]
    fn random_rate_zero_never_samples_one_always_does() {
        let never = Sampler::new(SamplerConfig::new(Strategy::Random { rate: 0.0 }));
        let always = Sampler::new(SamplerConfig::new(Strategy::Random { rate: 1.0 }));
        for _ in 0..50 {
            assert!(!never.should_sample(&rec(Level::Info, None)));
            assert!(always.should_sample(&rec(Level::Info, None)));
        }
    }
}
