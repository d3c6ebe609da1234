//! Integration tests for the sliding-window range engine
//!
//! These tests drive the full advance/materialize loop the way a query
//! evaluator would:
//! - the canonical three-step scenario with eviction, buffer pooling and
//!   clean exhaustion
//! - single consumption of the source across overlapping windows
//! - unordered emission contract and post-sort determinism
//! - shared buffer pool across concurrent iterators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use range_engine::aggregators;
use range_engine::labels::FingerprintResolver;
use range_engine::source::{SampleSource, VecSampleSource};
use range_engine::types::{OutputSample, Point, Sample};
use range_engine::window::{RangeWindowIterator, WindowSpec};
use range_engine::{BufferPool, Error, Result};

const FP_A: &str = r#"{series="a"}"#;
const FP_B: &str = r#"{series="b"}"#;

// ============================================================================
// Helpers
// ============================================================================

/// Counts `next()` calls on an inner source
struct CountingSource<S> {
    inner: S,
    next_calls: Arc<AtomicUsize>,
}

impl<S: SampleSource> SampleSource for CountingSource<S> {
    fn peek(&mut self) -> Option<&Sample> {
        self.inner.peek()
    }

    fn next(&mut self) -> bool {
        self.next_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.next()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn last_error(&self) -> Option<&Error> {
        self.inner.last_error()
    }
}

fn sum(points: &[Point]) -> f64 {
    points.iter().map(|p| p.value).sum()
}

/// Sort an emitted vector by label set for deterministic assertions
fn sorted_by_labels(mut vector: Vec<OutputSample>) -> Vec<OutputSample> {
    vector.sort_by(|a, b| a.labels.cmp(&b.labels));
    vector
}

// ============================================================================
// Canonical Scenario
// ============================================================================

/// Selector 5ns, step 5ns, start 0, end 10; samples at T=0, 3, 11.
#[test]
fn test_three_step_scenario() {
    let samples = vec![
        Sample::new(FP_A, 0, 1.0),
        Sample::new(FP_A, 3, 2.0),
        Sample::new(FP_A, 11, 3.0),
    ];
    let source = VecSampleSource::new(samples);
    let mut iter = RangeWindowIterator::new(
        source,
        FingerprintResolver::new(),
        WindowSpec::new(5, 5, 0, 10),
    );

    // construction leaves the window one step before start
    assert_eq!(iter.bounds(), (-10, -5));

    // step 1: bounds (-5, 0], T=0 ingested, T=3 left for the future
    assert!(iter.advance());
    assert_eq!(iter.bounds(), (-5, 0));
    let (ts, vector) = iter.materialize(sum);
    assert_eq!(ts, 0);
    assert_eq!(vector.len(), 1);
    assert_eq!(vector[0].value, 1.0);
    assert_eq!(vector[0].labels.get("series"), Some("a"));

    // step 2: bounds (0, 5], T=0 evicted to empty, T=3 ingested
    assert!(iter.advance());
    let (ts, vector) = iter.materialize(sum);
    assert_eq!(ts, 0); // 5ns / 1_000_000 truncates to 0ms
    assert_eq!(vector.len(), 1);
    assert_eq!(vector[0].value, 2.0);

    // step 3: bounds (5, 10], window empty, T=11 not pulled
    assert!(iter.advance());
    let (ts, vector) = iter.materialize(sum);
    assert_eq!(ts, 0);
    assert!(vector.is_empty());

    // step 4 would land on 15 > 10: terminal, clean exhaustion
    assert!(!iter.advance());
    assert!(!iter.advance());
    assert!(iter.last_error().is_none());

    assert!(iter.close().is_ok());
}

// ============================================================================
// Source Consumption
// ============================================================================

#[test]
fn test_source_consumed_exactly_once_across_overlapping_windows() {
    // window 6ns wide stepping 2ns: every sample overlaps three windows
    let samples: Vec<Sample> = (1..=20)
        .map(|t| Sample::new(FP_A, t, t as f64))
        .collect();
    let sample_count = samples.len();

    let next_calls = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: VecSampleSource::new(samples),
        next_calls: Arc::clone(&next_calls),
    };

    let mut iter = RangeWindowIterator::new(
        source,
        FingerprintResolver::new(),
        WindowSpec::new(6, 2, 2, 20),
    );

    let mut emitted = 0;
    while iter.advance() {
        let (_, vector) = iter.materialize(aggregators::count_over_time);
        emitted += vector.len();
    }

    assert_eq!(next_calls.load(Ordering::Relaxed), sample_count);
    assert!(emitted > 0);
    assert_eq!(iter.stats().samples_ingested as usize, sample_count);
}

#[test]
fn test_failed_source_surfaces_through_last_error() {
    let mut source = VecSampleSource::new(vec![Sample::new(FP_A, 1, 1.0)]);
    source.fail(range_engine::SourceError::Read("chunk fetch failed".to_string()).into());

    let mut iter = RangeWindowIterator::new(
        source,
        FingerprintResolver::new(),
        WindowSpec::new(5, 5, 5, 10),
    );

    // a failed source looks exhausted; the evaluator distinguishes via last_error
    assert!(iter.advance());
    let (_, vector) = iter.materialize(sum);
    assert!(vector.is_empty());
    assert!(iter.last_error().is_some());
}

// ============================================================================
// Emission Contract
// ============================================================================

#[test]
fn test_materialize_unordered_but_deterministic_after_sort() {
    let samples = vec![
        Sample::new(FP_B, 1, 10.0),
        Sample::new(FP_A, 2, 1.0),
        Sample::new(FP_B, 3, 20.0),
        Sample::new(FP_A, 4, 2.0),
    ];
    let mut iter = RangeWindowIterator::new(
        VecSampleSource::new(samples),
        FingerprintResolver::new(),
        WindowSpec::new(5, 5, 5, 5),
    );

    assert!(iter.advance());

    // aggregated values must not depend on internal iteration order
    let first = sorted_by_labels(iter.materialize(sum).1);
    let second = sorted_by_labels(iter.materialize(sum).1);
    assert_eq!(first, second);

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].labels.get("series"), Some("a"));
    assert_eq!(first[0].value, 3.0);
    assert_eq!(first[1].labels.get("series"), Some("b"));
    assert_eq!(first[1].value, 30.0);
}

#[test]
fn test_plugged_aggregators_over_same_window() {
    let samples = vec![
        Sample::new(FP_A, 1, 4.0),
        Sample::new(FP_A, 2, 8.0),
        Sample::new(FP_A, 3, 6.0),
    ];
    let mut iter = RangeWindowIterator::new(
        VecSampleSource::new(samples),
        FingerprintResolver::new(),
        WindowSpec::new(5, 5, 5, 5),
    );
    assert!(iter.advance());

    assert_eq!(iter.materialize(aggregators::sum_over_time).1[0].value, 18.0);
    assert_eq!(iter.materialize(aggregators::count_over_time).1[0].value, 3.0);
    assert_eq!(iter.materialize(aggregators::avg_over_time).1[0].value, 6.0);
    assert_eq!(iter.materialize(aggregators::min_over_time).1[0].value, 4.0);
    assert_eq!(iter.materialize(aggregators::max_over_time).1[0].value, 8.0);
    assert_eq!(iter.materialize(aggregators::last_over_time).1[0].value, 6.0);
}

// ============================================================================
// Shared Buffer Pool
// ============================================================================

#[test]
fn test_pool_shared_across_parallel_iterators() {
    let pool = Arc::new(BufferPool::default());
    let mut handles = Vec::new();

    for worker in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(std::thread::spawn(move || {
            let samples: Vec<Sample> = (1..=100)
                .map(|t| Sample::new(format!(r#"{{worker="{worker}", shard="{}"}}"#, t % 5), t, 1.0))
                .collect();
            let mut iter = RangeWindowIterator::new(
                VecSampleSource::new(samples),
                FingerprintResolver::new(),
                WindowSpec::new(10, 10, 10, 100),
            )
            .with_pool(pool);

            let mut total = 0.0;
            while iter.advance() {
                let (_, vector) = iter.materialize(sum);
                total += vector.iter().map(|s| s.value).sum::<f64>();
            }
            assert!(iter.last_error().is_none());
            iter.close().unwrap();
            total
        }));
    }

    let grand_total: f64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    // every worker's 100 samples land in exactly one window each
    assert_eq!(grand_total, 400.0);

    let stats = pool.stats();
    assert!(stats.releases > 0);
    assert!(stats.hits > 0);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_from_config_applies_series_limit() {
    let config: range_engine::EngineConfig = toml::from_str(
        r#"
        max_series = 1

        [pool]
        initial_buffer_capacity = 16
        "#,
    )
    .unwrap();

    let samples = vec![Sample::new(FP_A, 1, 1.0), Sample::new(FP_B, 2, 2.0)];
    let mut iter = RangeWindowIterator::from_config(
        VecSampleSource::new(samples),
        FingerprintResolver::new(),
        WindowSpec::new(5, 5, 5, 5),
        &config,
    )
    .unwrap();

    assert!(iter.advance());
    assert_eq!(iter.series_count(), 1);
    assert_eq!(iter.stats().limit_drops, 1);
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let config: range_engine::EngineConfig = toml::from_str(
        r#"
        [pool]
        initial_buffer_capacity = 0
        "#,
    )
    .unwrap();

    let result = RangeWindowIterator::from_config(
        VecSampleSource::new(vec![]),
        FingerprintResolver::new(),
        WindowSpec::new(5, 5, 5, 5),
        &config,
    );

    assert!(matches!(
        result,
        Err(range_engine::Error::Configuration(_))
    ));
}
