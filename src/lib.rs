//! Range Engine - sliding-window aggregation over labeled sample streams
//!
//! This library is the execution primitive behind range-style queries in a
//! log/metrics query language ("rate over 5m, every 15s"). Given a
//! time-ordered stream of labeled samples, it produces, at fixed time
//! steps, a vector of per-series values aggregated over a trailing window:
//!
//! - Per-series state is maintained across overlapping windows without
//!   re-reading already-seen input
//! - Expired points are evicted incrementally, never by re-scanning
//! - Point buffers are pooled to bound allocation churn on the hot path
//! - Aggregation functions are plugged in by the caller, so the engine
//!   stays agnostic of sum vs. rate vs. quantile
//!
//! # Example
//!
//! ```rust
//! use range_engine::aggregators;
//! use range_engine::labels::FingerprintResolver;
//! use range_engine::source::VecSampleSource;
//! use range_engine::types::Sample;
//! use range_engine::window::{RangeWindowIterator, WindowSpec};
//!
//! let source = VecSampleSource::new(vec![
//!     Sample::new(r#"{job="api"}"#, 1_000_000_000, 12.0),
//!     Sample::new(r#"{job="api"}"#, 2_000_000_000, 30.0),
//! ]);
//!
//! // 5s window every 5s, from t=0s to t=10s
//! let spec = WindowSpec::new(5_000_000_000, 5_000_000_000, 0, 10_000_000_000);
//! let mut iter = RangeWindowIterator::new(source, FingerprintResolver::new(), spec);
//!
//! let mut totals = Vec::new();
//! while iter.advance() {
//!     let (ts_ms, vector) = iter.materialize(aggregators::sum_over_time);
//!     totals.push((ts_ms, vector.iter().map(|s| s.value).sum::<f64>()));
//! }
//! assert!(iter.last_error().is_none());
//! iter.close().unwrap();
//!
//! assert_eq!(totals, vec![(0, 0.0), (5000, 42.0), (10000, 0.0)]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregators;
pub mod config;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod pool;
pub mod source;
pub mod types;
pub mod window;

// Re-export main types
pub use config::{EngineConfig, PoolConfig};
pub use error::{Error, LabelError, Result, SourceError};
pub use labels::{FingerprintResolver, LabelResolver};
pub use pool::{BufferPool, PoolStatsSnapshot};
pub use source::{SampleSource, VecSampleSource};
pub use types::{Label, Labels, OutputSample, Point, Sample};
pub use window::{EngineStats, EngineStatsSnapshot, RangeWindowIterator, WindowSpec};
