//! Configuration for the range engine
//!
//! Plain serde structs with defaulting functions so a partially specified
//! TOML document deserializes into a fully usable configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Buffer pool tuning
    #[serde(default)]
    pub pool: PoolConfig,

    /// Maximum live series per window (0 = unlimited)
    ///
    /// Samples for series beyond the limit are consumed and dropped, with
    /// the drop counted. Guards one runaway query against unbounded
    /// cardinality.
    #[serde(default)]
    pub max_series: usize,
}

impl EngineConfig {
    /// Check the configuration for values that would misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        if self.pool.initial_buffer_capacity == 0 {
            return Err(Error::Configuration(
                "pool.initial_buffer_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            max_series: 0,
        }
    }
}

/// Buffer pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Capacity of freshly allocated point buffers
    #[serde(default = "default_initial_buffer_capacity")]
    pub initial_buffer_capacity: usize,

    /// Upper bound on buffers retained in the free list
    #[serde(default = "default_max_pooled_buffers")]
    pub max_pooled_buffers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_buffer_capacity: default_initial_buffer_capacity(),
            max_pooled_buffers: default_max_pooled_buffers(),
        }
    }
}

fn default_initial_buffer_capacity() -> usize {
    1024
}

fn default_max_pooled_buffers() -> usize {
    64
}
