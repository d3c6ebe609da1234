//! Core data types used throughout the range engine
//!
//! This module defines the fundamental data structures shared across the
//! crate:
//!
//! # Key Types
//!
//! - **`Sample`**: A raw labeled measurement pulled from a [`SampleSource`](crate::source::SampleSource)
//! - **`Point`**: A (timestamp, value) pair held inside the current window
//! - **`Label`** / **`Labels`**: Canonical sorted label pairs for one series
//! - **`OutputSample`**: One aggregated element of a materialized vector
//!
//! # Example
//!
//! ```rust
//! use range_engine::types::{Labels, Point, Sample};
//!
//! let sample = Sample::new(r#"{job="api", instance="host1"}"#, 1_000_000_000, 42.5);
//!
//! let labels = Labels::from_pairs(vec![
//!     ("job".to_string(), "api".to_string()),
//!     ("instance".to_string(), "host1".to_string()),
//! ]);
//! assert_eq!(labels.get("job"), Some("api"));
//!
//! let point = Point::new(sample.timestamp_ns, sample.value);
//! assert_eq!(point.value, 42.5);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A raw sample as delivered by a sample source
///
/// The fingerprint is an opaque string that uniquely identifies one series'
/// label set. The engine treats it purely as a map key; only the
/// [`LabelResolver`](crate::labels::LabelResolver) knows how to turn it
/// into canonical labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Opaque series fingerprint (serialized label set)
    pub fingerprint: String,
    /// Timestamp in nanoseconds
    pub timestamp_ns: i64,
    /// Sample value
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(fingerprint: impl Into<String>, timestamp_ns: i64, value: f64) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            timestamp_ns,
            value,
        }
    }
}

/// A single point inside a series' window buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Timestamp in nanoseconds
    pub timestamp_ns: i64,
    /// Point value
    pub value: f64,
}

impl Point {
    /// Create a new point
    pub fn new(timestamp_ns: i64, value: f64) -> Self {
        Self {
            timestamp_ns,
            value,
        }
    }
}

/// A single name/value label pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Label value
    pub value: String,
}

/// Canonical sorted label collection for one series
///
/// Labels are kept sorted by name so that two label sets describing the
/// same series always compare and hash identically, regardless of the
/// order in which they were parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Labels(Vec<Label>);

impl Labels {
    /// Create an empty label set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a label set from name/value pairs, sorting them by name
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut labels: Vec<Label> = pairs
            .into_iter()
            .map(|(name, value)| Label { name, value })
            .collect();
        labels.sort();
        Self(labels)
    }

    /// Look up a label value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the label set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the labels in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}=\"{}\"", label.name, label.value)?;
        }
        write!(f, "}}")
    }
}

/// One element of a materialized output vector
///
/// Labels are shared with the iterator's internal cache, so cloning an
/// output sample never re-parses or deep-copies the label set.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSample {
    /// Output timestamp in milliseconds
    pub timestamp_ms: i64,
    /// Aggregated value for this series over the current window
    pub value: f64,
    /// Resolved labels for the series
    pub labels: Arc<Labels>,
}
