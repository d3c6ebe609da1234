//! Sliding-window range evaluation
//!
//! This module is the execution primitive behind range-style queries
//! ("rate over 5m, every 15s"). A [`RangeWindowIterator`] slides a
//! trailing window of fixed width over a globally time-ordered sample
//! stream, one step at a time:
//!
//! ```text
//!              selector range
//!          ◄──────────────────►
//! ─────────(────────────────────]──────────────────► time
//!       range_start         range_end
//!                               └── advances by `step` per advance()
//! ```
//!
//! Per-series state is retained across overlapping windows: each
//! `advance()` trims expired points from the front of every series buffer
//! and appends newly in-range samples pulled from the source. A sample is
//! consumed from the source exactly once over the whole run; overlap
//! between consecutive windows is achieved purely by not evicting a point
//! until its timestamp falls behind the trailing edge, never by
//! re-reading.
//!
//! The aggregation function is supplied by the caller at
//! [`materialize`](RangeWindowIterator::materialize) time, so the engine
//! stays agnostic of what is being computed (sum, rate, quantile, ...).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{Error, LabelError, Result};
use crate::labels::LabelResolver;
use crate::metrics;
use crate::pool::BufferPool;
use crate::source::SampleSource;
use crate::types::{Labels, OutputSample, Point};

// ============================================================================
// Window Specification
// ============================================================================

/// Window geometry for one range evaluation
///
/// All fields are nanosecond timestamps or durations. A sample belongs to
/// the current window iff `range_start < t <= range_end` (lower bound
/// exclusive, upper bound inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    /// Width of the trailing window
    pub selector_ns: i64,
    /// Distance between successive window positions (>= 1)
    pub step_ns: i64,
    /// First evaluation timestamp
    pub start_ns: i64,
    /// Last evaluation timestamp (inclusive)
    pub end_ns: i64,
}

impl WindowSpec {
    /// Create a window specification
    ///
    /// A non-positive step is coerced to 1 so the window always makes
    /// forward progress.
    pub fn new(selector_ns: i64, step_ns: i64, start_ns: i64, end_ns: i64) -> Self {
        Self {
            selector_ns,
            step_ns: step_ns.max(1),
            start_ns,
            end_ns,
        }
    }
}

// ============================================================================
// Series Window Entry
// ============================================================================

/// Per-fingerprint state inside the current window
///
/// Points stay ascending by construction: eviction trims the front,
/// ingestion appends to the back, so no re-sort is ever needed.
#[derive(Debug)]
struct SeriesEntry {
    labels: Arc<Labels>,
    points: Vec<Point>,
}

// ============================================================================
// Engine Statistics
// ============================================================================

/// Per-iterator counters
///
/// Cheap relaxed atomics; use [`snapshot`](EngineStats::snapshot) for a
/// consistent-enough read. `resolve_failures` surfaces the otherwise
/// silent drop of samples whose fingerprint could not be resolved.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Successful `advance()` calls
    pub advances: AtomicU64,
    /// Samples appended to a window entry
    pub samples_ingested: AtomicU64,
    /// Samples consumed because they were already behind the trailing edge
    pub stale_discards: AtomicU64,
    /// Samples dropped because label resolution failed
    pub resolve_failures: AtomicU64,
    /// Samples dropped by the per-window series limit
    pub limit_drops: AtomicU64,
    /// Series entries created
    pub series_created: AtomicU64,
    /// Series entries removed after becoming empty
    pub series_evicted: AtomicU64,
}

impl EngineStats {
    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            advances: self.advances.load(Ordering::Relaxed),
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
            resolve_failures: self.resolve_failures.load(Ordering::Relaxed),
            limit_drops: self.limit_drops.load(Ordering::Relaxed),
            series_created: self.series_created.load(Ordering::Relaxed),
            series_evicted: self.series_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of engine statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    /// Successful `advance()` calls
    pub advances: u64,
    /// Samples appended to a window entry
    pub samples_ingested: u64,
    /// Samples consumed because they were already behind the trailing edge
    pub stale_discards: u64,
    /// Samples dropped because label resolution failed
    pub resolve_failures: u64,
    /// Samples dropped by the per-window series limit
    pub limit_drops: u64,
    /// Series entries created
    pub series_created: u64,
    /// Series entries removed after becoming empty
    pub series_evicted: u64,
}

/// Callback invoked for every sample dropped on label resolution failure
pub type DropHook = Box<dyn Fn(&str, &LabelError) + Send>;

// ============================================================================
// Range Window Iterator
// ============================================================================

/// Slides a trailing window over a time-ordered sample stream
///
/// Driven by the evaluator in a plain loop:
///
/// ```rust
/// use range_engine::aggregators;
/// use range_engine::labels::FingerprintResolver;
/// use range_engine::source::VecSampleSource;
/// use range_engine::types::Sample;
/// use range_engine::window::{RangeWindowIterator, WindowSpec};
///
/// let source = VecSampleSource::new(vec![
///     Sample::new(r#"{job="api"}"#, 1, 1.0),
///     Sample::new(r#"{job="api"}"#, 3, 2.0),
/// ]);
/// let spec = WindowSpec::new(5, 5, 5, 10);
/// let mut iter = RangeWindowIterator::new(source, FingerprintResolver::new(), spec);
///
/// while iter.advance() {
///     let (ts_ms, vector) = iter.materialize(aggregators::sum_over_time);
///     for sample in &vector {
///         println!("{} {} {}", ts_ms, sample.labels, sample.value);
///     }
/// }
/// assert!(iter.last_error().is_none());
/// iter.close().unwrap();
/// ```
///
/// Not re-entrant: `advance()` and `materialize()` must be invoked
/// sequentially by a single caller. The only shared resource is the
/// injected [`BufferPool`].
pub struct RangeWindowIterator<S, R> {
    source: S,
    resolver: R,
    selector_ns: i64,
    step_ns: i64,
    end_ns: i64,
    current_ns: i64,
    window: HashMap<String, SeriesEntry>,
    labels_cache: HashMap<String, Arc<Labels>>,
    pool: Arc<BufferPool>,
    max_series: usize,
    stats: EngineStats,
    drop_hook: Option<DropHook>,
}

impl<S, R> RangeWindowIterator<S, R>
where
    S: SampleSource,
    R: LabelResolver,
{
    /// Create an iterator with a private default pool
    ///
    /// The first `advance()` lands exactly on `spec.start_ns`. No I/O
    /// happens at construction time.
    pub fn new(source: S, resolver: R, spec: WindowSpec) -> Self {
        Self {
            source,
            resolver,
            selector_ns: spec.selector_ns,
            step_ns: spec.step_ns,
            end_ns: spec.end_ns,
            current_ns: spec.start_ns - spec.step_ns,
            window: HashMap::new(),
            labels_cache: HashMap::new(),
            pool: Arc::new(BufferPool::default()),
            max_series: 0,
            stats: EngineStats::default(),
            drop_hook: None,
        }
    }

    /// Create an iterator configured from a validated [`EngineConfig`]
    pub fn from_config(
        source: S,
        resolver: R,
        spec: WindowSpec,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(source, resolver, spec)
            .with_pool(Arc::new(BufferPool::new(config.pool.clone())))
            .with_max_series(config.max_series))
    }

    /// Share a buffer pool with other iterators
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Bound the number of live series per window (0 = unlimited)
    pub fn with_max_series(mut self, max_series: usize) -> Self {
        self.max_series = max_series;
        self
    }

    /// Observe samples dropped on label resolution failure
    pub fn with_drop_hook(mut self, hook: DropHook) -> Self {
        self.drop_hook = Some(hook);
        self
    }

    /// Slide the window forward by one step
    ///
    /// Returns `false` once the next position would pass the configured
    /// end; that state is terminal and repeated calls keep returning
    /// `false` without touching the source. On `true`, expired points have
    /// been evicted and newly in-range samples ingested.
    pub fn advance(&mut self) -> bool {
        self.current_ns += self.step_ns;
        if self.current_ns > self.end_ns {
            return false;
        }

        let range_end = self.current_ns;
        let range_start = self.current_ns - self.selector_ns;

        self.stats.advances.fetch_add(1, Ordering::Relaxed);
        metrics::WINDOWS_ADVANCED_TOTAL.inc();

        self.evict(range_start);
        self.ingest(range_start, range_end);
        true
    }

    /// Drop every point at or before the new trailing edge
    ///
    /// Points are ascending, so a single forward scan per series finds the
    /// expired prefix. Entries that become empty are removed immediately
    /// and their buffers returned to the pool.
    fn evict(&mut self, new_start: i64) {
        let pool = &self.pool;
        let stats = &self.stats;
        self.window.retain(|_, entry| {
            let expired = entry
                .points
                .iter()
                .take_while(|p| p.timestamp_ns <= new_start)
                .count();
            if expired > 0 {
                entry.points.drain(..expired);
            }
            if entry.points.is_empty() {
                pool.release(std::mem::take(&mut entry.points));
                stats.series_evicted.fetch_add(1, Ordering::Relaxed);
                metrics::LIVE_SERIES.dec();
                false
            } else {
                true
            }
        });
    }

    /// Pull newly in-range samples from the source
    ///
    /// Stops without consuming as soon as the head belongs to a future
    /// window, which is what keeps source consumption at exactly once per
    /// sample across the whole run.
    fn ingest(&mut self, range_start: i64, range_end: i64) {
        loop {
            let head = match self.source.peek() {
                Some(sample) => sample,
                None => return,
            };

            if head.timestamp_ns > range_end {
                // belongs to a future window, leave it unconsumed
                return;
            }

            if head.timestamp_ns <= range_start {
                // already fully behind the current window
                self.source.next();
                self.stats.stale_discards.fetch_add(1, Ordering::Relaxed);
                metrics::SAMPLES_DROPPED_TOTAL
                    .with_label_values(&[metrics::DROP_REASON_BEHIND_WINDOW])
                    .inc();
                continue;
            }

            // fast path: series already live, append without allocating
            if let Some(entry) = self.window.get_mut(&head.fingerprint) {
                entry.points.push(Point::new(head.timestamp_ns, head.value));
                self.stats.samples_ingested.fetch_add(1, Ordering::Relaxed);
                metrics::SAMPLES_INGESTED_TOTAL.inc();
                self.source.next();
                continue;
            }

            let ts = head.timestamp_ns;
            let value = head.value;
            let fingerprint = head.fingerprint.clone();

            if self.max_series > 0 && self.window.len() >= self.max_series {
                warn!(
                    fingerprint = %fingerprint,
                    max_series = self.max_series,
                    "Series limit reached, dropping sample"
                );
                self.stats.limit_drops.fetch_add(1, Ordering::Relaxed);
                metrics::SAMPLES_DROPPED_TOTAL
                    .with_label_values(&[metrics::DROP_REASON_SERIES_LIMIT])
                    .inc();
                self.source.next();
                continue;
            }

            let labels = match self.cached_labels(&fingerprint) {
                Ok(labels) => labels,
                Err(err) => {
                    debug!(
                        fingerprint = %fingerprint,
                        error = %err,
                        "Dropping sample with unresolvable fingerprint"
                    );
                    self.stats.resolve_failures.fetch_add(1, Ordering::Relaxed);
                    metrics::SAMPLES_DROPPED_TOTAL
                        .with_label_values(&[metrics::DROP_REASON_LABEL_PARSE])
                        .inc();
                    if let Some(hook) = &self.drop_hook {
                        hook(&fingerprint, &err);
                    }
                    self.source.next();
                    continue;
                }
            };

            let mut points = self.pool.acquire();
            points.push(Point::new(ts, value));
            self.window.insert(fingerprint, SeriesEntry { labels, points });
            self.stats.series_created.fetch_add(1, Ordering::Relaxed);
            metrics::LIVE_SERIES.inc();
            self.stats.samples_ingested.fetch_add(1, Ordering::Relaxed);
            metrics::SAMPLES_INGESTED_TOTAL.inc();
            self.source.next();
        }
    }

    /// Resolve a fingerprint, consulting the lifetime cache first
    ///
    /// The cache is never evicted, so a series that leaves and re-enters
    /// the window is not re-parsed.
    fn cached_labels(&mut self, fingerprint: &str) -> std::result::Result<Arc<Labels>, LabelError> {
        if let Some(labels) = self.labels_cache.get(fingerprint) {
            return Ok(Arc::clone(labels));
        }
        let labels = Arc::new(self.resolver.resolve(fingerprint)?);
        self.labels_cache
            .insert(fingerprint.to_string(), Arc::clone(&labels));
        Ok(labels)
    }

    /// Render the current window through an aggregator
    ///
    /// Emits one element per non-empty series entry, timestamped with the
    /// leading edge truncated from nanoseconds to milliseconds. The
    /// emission order is unspecified; callers needing determinism must
    /// sort by label set afterwards. The aggregator must be a pure
    /// function over the ordered point slice.
    pub fn materialize<F>(&self, aggregator: F) -> (i64, Vec<OutputSample>)
    where
        F: Fn(&[Point]) -> f64,
    {
        let timestamp_ms = self.current_ns / 1_000_000;
        let mut vector = Vec::with_capacity(self.window.len());
        for entry in self.window.values() {
            vector.push(OutputSample {
                timestamp_ms,
                value: aggregator(&entry.points),
                labels: Arc::clone(&entry.labels),
            });
        }
        (timestamp_ms, vector)
    }

    /// Number of series currently inside the window
    pub fn series_count(&self) -> usize {
        self.window.len()
    }

    /// Current window bounds `(range_start, range_end]`
    pub fn bounds(&self) -> (i64, i64) {
        (self.current_ns - self.selector_ns, self.current_ns)
    }

    /// Delegates to the source's sticky error accessor
    pub fn last_error(&self) -> Option<&Error> {
        self.source.last_error()
    }

    /// Get a snapshot of engine statistics
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the underlying source
    pub fn close(&mut self) -> Result<()> {
        debug!(
            series = self.window.len(),
            cached_labels = self.labels_cache.len(),
            "Closing range window iterator"
        );
        self.source.close()
    }
}

impl<S, R> Drop for RangeWindowIterator<S, R> {
    /// Settle the live-series gauge and recycle buffers still in the window
    ///
    /// A query normally ends with series still in range, so without this
    /// the process-wide gauge would drift upward with every finished
    /// iterator.
    fn drop(&mut self) {
        metrics::LIVE_SERIES.sub(self.window.len() as i64);
        for (_, mut entry) in self.window.drain() {
            self.pool.release(std::mem::take(&mut entry.points));
        }
    }
}
