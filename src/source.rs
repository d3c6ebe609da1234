//! Sample source abstraction
//!
//! The engine pulls its input from a [`SampleSource`]: a lazy, finite,
//! forward-only cursor over labeled samples with exactly one element of
//! non-consuming lookahead. Multiple concrete producers can satisfy it
//! (merged per-series log readers, decompressed chunk iterators, network
//! fetchers); the engine only needs this minimal contract.
//!
//! Samples must be delivered in non-decreasing timestamp order across the
//! whole stream, globally merge-ordered across all series. The engine does
//! not defensively check this; an out-of-order source silently corrupts
//! eviction correctness.

use crate::error::{Error, Result};
use crate::types::Sample;

/// A pull-based, peekable cursor over a time-ordered sample stream
pub trait SampleSource {
    /// Non-consuming look at the next sample, `None` when exhausted
    fn peek(&mut self) -> Option<&Sample>;

    /// Consume the current head, advancing the cursor
    ///
    /// Returns `true` iff a sample was actually available.
    fn next(&mut self) -> bool;

    /// Release any resources held by the source
    ///
    /// Safe to call exactly once; idempotence beyond that is up to the
    /// concrete implementation.
    fn close(&mut self) -> Result<()>;

    /// Sticky error accessor
    ///
    /// `None` while healthy or merely exhausted; `Some` only after a
    /// failure. Callers distinguish clean exhaustion from failure by
    /// checking this after the stream reports no more data.
    fn last_error(&self) -> Option<&Error>;
}

/// In-memory sample source backed by a vector
///
/// Used in tests and for small pre-materialized inputs. Samples are served
/// in the order given; the caller is responsible for handing them over
/// sorted by timestamp.
#[derive(Debug, Default)]
pub struct VecSampleSource {
    samples: Vec<Sample>,
    pos: usize,
    consumed: usize,
    closed: bool,
    error: Option<Error>,
}

impl VecSampleSource {
    /// Create a source over the given samples
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            pos: 0,
            consumed: 0,
            closed: false,
            error: None,
        }
    }

    /// Number of samples consumed so far via `next`
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Inject a sticky error, as a failing upstream reader would
    pub fn fail(&mut self, error: Error) {
        self.error = Some(error);
    }
}

impl SampleSource for VecSampleSource {
    fn peek(&mut self) -> Option<&Sample> {
        if self.error.is_some() {
            return None;
        }
        self.samples.get(self.pos)
    }

    fn next(&mut self) -> bool {
        if self.error.is_some() || self.pos >= self.samples.len() {
            return false;
        }
        self.pos += 1;
        self.consumed += 1;
        true
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(crate::error::SourceError::Closed.into());
        }
        self.closed = true;
        Ok(())
    }

    fn last_error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;

    fn sample(ts: i64) -> Sample {
        Sample::new("{}", ts, 1.0)
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut source = VecSampleSource::new(vec![sample(1), sample(2)]);

        assert_eq!(source.peek().map(|s| s.timestamp_ns), Some(1));
        assert_eq!(source.peek().map(|s| s.timestamp_ns), Some(1));
        assert_eq!(source.consumed(), 0);
    }

    #[test]
    fn test_next_advances_and_exhausts() {
        let mut source = VecSampleSource::new(vec![sample(1), sample(2)]);

        assert!(source.next());
        assert_eq!(source.peek().map(|s| s.timestamp_ns), Some(2));
        assert!(source.next());
        assert!(!source.next());
        assert!(source.peek().is_none());
        assert_eq!(source.consumed(), 2);
    }

    #[test]
    fn test_close_twice_errors() {
        let mut source = VecSampleSource::new(vec![]);

        assert!(source.close().is_ok());
        assert!(source.close().is_err());
    }

    #[test]
    fn test_last_error_sticky() {
        let mut source = VecSampleSource::new(vec![sample(1)]);
        assert!(source.last_error().is_none());

        source.fail(SourceError::Read("connection reset".to_string()).into());

        assert!(source.peek().is_none());
        assert!(!source.next());
        assert!(source.last_error().is_some());
    }
}
