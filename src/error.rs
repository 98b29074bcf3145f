//! Error types for configuration loading and simulation runs

use thiserror::Error;

/// Result type alias for sysmm operations
pub type Result<T> = std::result::Result<T, SysError>;

/// Errors raised by the outer surfaces (config, runner, event adapter).
///
/// The core itself has no error path; everything here is rejected before a
/// start pulse reaches the tile controller.
#[derive(Debug, Error)]
pub enum SysError {
  /// A core parameter is out of its supported range
  #[error("invalid configuration: {reason}")]
  InvalidConfig {
    /// What was wrong
    reason: String,
  },

  /// Matrix dimensions are not exact multiples of the tiling factors
  #[error("unsupported dimensions M={m} K={k} N={n}: {reason}")]
  InvalidDims {
    m: usize,
    k: usize,
    n: usize,
    reason: String,
  },

  /// Operand matrices disagree with each other or with the dimensions
  #[error("operand shape mismatch: {reason}")]
  ShapeMismatch {
    /// What was wrong
    reason: String,
  },

  /// Layered configuration could not be loaded
  #[error("failed to load configuration: {source}")]
  Config {
    #[from]
    source: config::ConfigError,
  },

  /// Effective configuration could not be written as TOML
  #[error("failed to serialize configuration: {source}")]
  TomlSer {
    #[from]
    source: toml::ser::Error,
  },

  /// I/O error (trace or config file)
  #[error("I/O error: {source}")]
  Io {
    #[from]
    source: std::io::Error,
  },

  /// JSON encoding/decoding of trace entries or model messages failed
  #[error("JSON error: {source}")]
  Json {
    #[from]
    source: serde_json::Error,
  },

  /// The run did not reach Done within the cycle limit
  #[error("run did not finish within {limit} cycles")]
  Timeout {
    /// Cycle limit that was hit
    limit: u64,
  },

  /// The discrete-event simulation reported an error
  #[error("event simulation failed: {reason}")]
  Simulation {
    /// Formatted simulation error
    reason: String,
  },
}

impl SysError {
  pub fn invalid_config(reason: impl Into<String>) -> Self {
    Self::InvalidConfig { reason: reason.into() }
  }

  pub fn shape_mismatch(reason: impl Into<String>) -> Self {
    Self::ShapeMismatch { reason: reason.into() }
  }
}
