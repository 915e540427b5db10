//! Error types
//!
//! The comparison core is infallible; only configuration can be rejected.
//! I/O-bearing code paths use `anyhow` with context instead.

use thiserror::Error;

/// Invalid engine configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("window_size must be at least 1")]
    ZeroWindow,
}
