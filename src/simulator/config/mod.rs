pub mod config;

pub use self::config::{
  load_config, load_config_file, load_default_config, save_config, to_toml, validate_config, AppConfig,
  SimulationSection,
};
