use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::arch::tilemm::CoreParams;
use crate::error::{Result, SysError};
use crate::simulator::sim::RunMode;

const DEFAULT_CONFIG: &str = include_str!("default.toml");
const ENV_PREFIX: &str = "SYSMM";

/// Runner settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSection {
  pub quiet: bool,
  /// JSON-lines trace destination, empty disables tracing
  pub trace_file: String,
  pub run_mode: RunMode,
  /// Cycle limit per run; 0 derives it from the dimensions
  pub max_cycles: u64,
}

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
  pub core: CoreParams,
  pub simulation: SimulationSection,
}

fn env_source() -> Environment {
  Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("__")
    .separator("__")
    .try_parsing(true)
}

fn build(path: Option<&Path>, env: Environment) -> Result<AppConfig> {
  let mut builder = Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
  if let Some(path) = path {
    builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
  }
  let config = builder.add_source(env).build()?.try_deserialize::<AppConfig>()?;
  Ok(config)
}

/// Bundled defaults plus environment overrides.
pub fn load_default_config() -> Result<AppConfig> {
  build(None, env_source())
}

/// Bundled defaults, then `path`, then environment overrides.
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
  build(Some(path), env_source())
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
  build(path, env_source())
}

/// Validate the configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
  config.core.validate()?;
  if config.simulation.trace_file.trim() != config.simulation.trace_file {
    return Err(SysError::invalid_config(
      "trace_file must not have leading or trailing whitespace",
    ));
  }
  Ok(())
}

/// Effective configuration as TOML.
pub fn to_toml(config: &AppConfig) -> Result<String> {
  Ok(toml::to_string_pretty(config)?)
}

pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
  fs::write(path, to_toml(config)?)?;
  Ok(())
}
