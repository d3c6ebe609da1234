//! Reusable point-buffer pool
//!
//! Range evaluation sits on the hot query path: series constantly enter
//! and leave the window as it slides, and allocating a fresh point vector
//! each time a series re-enters would churn the allocator. The pool keeps
//! a bounded free list of cleared buffers with retained capacity.
//!
//! One pool instance is explicitly constructed and injected; it may be
//! shared (via `Arc`) across many iterator instances running on parallel
//! queries. A buffer handed out to one series entry is exclusively owned
//! by that entry until released.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::PoolConfig;
use crate::types::Point;

/// Mutex-guarded free list of point buffers
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<Point>>>,
    config: PoolConfig,
    stats: PoolStats,
}

impl BufferPool {
    /// Create a pool with the given configuration
    pub fn new(config: PoolConfig) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            config,
            stats: PoolStats::default(),
        }
    }

    /// Take a zero-length buffer, reusing a pooled one when available
    pub fn acquire(&self) -> Vec<Point> {
        if let Some(buffer) = self.free.lock().pop() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            crate::metrics::POOL_ACQUIRES_TOTAL
                .with_label_values(&["hit"])
                .inc();
            return buffer;
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        crate::metrics::POOL_ACQUIRES_TOTAL
            .with_label_values(&["miss"])
            .inc();
        debug!(
            capacity = self.config.initial_buffer_capacity,
            "Allocating new point buffer"
        );
        Vec::with_capacity(self.config.initial_buffer_capacity)
    }

    /// Return a buffer to the pool
    ///
    /// The buffer is cleared but keeps its capacity. Buffers beyond the
    /// configured free-list bound are dropped instead of retained.
    pub fn release(&self, mut buffer: Vec<Point>) {
        buffer.clear();
        self.stats.releases.fetch_add(1, Ordering::Relaxed);

        let mut free = self.free.lock();
        if free.len() < self.config.max_pooled_buffers {
            free.push(buffer);
        }
    }

    /// Number of buffers currently sitting in the free list
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Get a snapshot of pool statistics
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

/// Statistics for pool operations
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Acquires served from the free list
    pub hits: AtomicU64,
    /// Acquires that allocated a new buffer
    pub misses: AtomicU64,
    /// Buffers returned to the pool
    pub releases: AtomicU64,
}

impl PoolStats {
    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Acquires served from the free list
    pub hits: u64,
    /// Acquires that allocated a new buffer
    pub misses: u64,
    /// Buffers returned to the pool
    pub releases: u64,
}
