//! Timing instrumentation for oracle calls, compositing and codec work.
//!
//! Worker threads and the interaction context both record into a shared
//! [`WorkTimings`] so slow oracle implementations show up in the logs.
//!
//! Enable extra scope timing with the `profiling` feature:
//! ```ignore
//! fn composite() {
//!     recolor::profile_scope!("composite");
//!     // ... work ...
//! }
//! ```

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Number of samples kept per operation
const STATS_SAMPLE_COUNT: usize = 100;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Time a scope when the `profiling` feature is on; nothing otherwise.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _timer = $crate::perf::ScopedTimer::new($name, 1.0);
        #[cfg(not(feature = "profiling"))]
        let _ = $name;
    };
    ($name:expr, $threshold_ms:expr) => {
        #[cfg(feature = "profiling")]
        let _timer = $crate::perf::ScopedTimer::new($name, $threshold_ms);
        #[cfg(not(feature = "profiling"))]
        let _ = ($name, $threshold_ms);
    };
}

pub use profile_scope;

// ============================================================================
// Operation Statistics
// ============================================================================

/// Rolling statistics for one kind of operation.
#[derive(Debug, Clone)]
pub struct OperationStats {
    samples: VecDeque<f64>,
    count: u64,
    max_ms: f64,
    sum_ms: f64,
}

impl Default for OperationStats {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(STATS_SAMPLE_COUNT),
            count: 0,
            max_ms: 0.0,
            sum_ms: 0.0,
        }
    }
}

impl OperationStats {
    pub fn record(&mut self, ms: f64) {
        if self.samples.len() >= STATS_SAMPLE_COUNT {
            if let Some(old) = self.samples.pop_front() {
                self.sum_ms -= old;
            }
        }
        self.samples.push_back(ms);
        self.sum_ms += ms;
        self.count += 1;
        self.max_ms = self.max_ms.max(ms);
    }

    /// Total number of recorded runs
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Average over the retained samples
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum_ms / self.samples.len() as f64
        }
    }

    pub fn max(&self) -> f64 {
        self.max_ms
    }

    /// 95th percentile of the retained samples
    pub fn p95(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((sorted.len() as f64) * 0.95).floor() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

/// Thread-safe registry of per-operation timings, cheap to clone.
#[derive(Clone, Default)]
pub struct WorkTimings {
    inner: Arc<Mutex<HashMap<&'static str, OperationStats>>>,
}

impl WorkTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &'static str, ms: f64) {
        self.inner.lock().entry(name).or_default().record(ms);
    }

    /// Run `f`, record its duration under `name` and warn above `warn_ms`
    pub fn time<T>(&self, name: &'static str, warn_ms: f64, f: impl FnOnce() -> T) -> T {
        let (result, elapsed_ms) = measure(f);
        self.record(name, elapsed_ms);
        if elapsed_ms > warn_ms {
            warn!(
                operation = name,
                elapsed_ms = format!("{:.2}", elapsed_ms),
                threshold_ms = format!("{:.2}", warn_ms),
                "Slow operation"
            );
        }
        result
    }

    pub fn stats(&self, name: &str) -> Option<OperationStats> {
        self.inner.lock().get(name).cloned()
    }

    /// Log one debug line per operation
    pub fn log_summary(&self) {
        let stats = self.inner.lock();
        for (name, s) in stats.iter() {
            debug!(
                operation = *name,
                count = s.count(),
                avg_ms = format!("{:.2}", s.average()),
                p95_ms = format!("{:.2}", s.p95()),
                max_ms = format!("{:.2}", s.max()),
                "Timing summary"
            );
        }
    }
}

// ============================================================================
// Scoped Timer
// ============================================================================

/// Logs the scope's duration on drop if it exceeds the threshold.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    threshold_ms: f64,
}

impl ScopedTimer {
    pub fn new(name: &'static str, threshold_ms: f64) -> Self {
        Self {
            name,
            start: Instant::now(),
            threshold_ms,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms > self.threshold_ms {
            debug!(
                operation = self.name,
                elapsed_ms = format!("{:.2}", elapsed_ms),
                "Scope timing"
            );
        }
    }
}

/// Run a closure and return its result with the elapsed milliseconds.
#[inline]
pub fn measure<T, F: FnOnce() -> T>(f: F) -> (T, f64) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed().as_secs_f64() * 1000.0)
}
