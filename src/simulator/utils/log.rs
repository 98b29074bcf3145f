/// Global logging configuration
use std::sync::atomic::{AtomicBool, Ordering};

use env_logger::Env;

static ENABLE_LOG: AtomicBool = AtomicBool::new(true);

/// Install the env_logger backend. `RUST_LOG` wins over the `info` default;
/// calling this more than once is harmless.
pub fn init_log() {
  let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
    .format_timestamp(None)
    .try_init();
}

/// Set logging enabled
pub fn set_log(enabled: bool) {
  ENABLE_LOG.store(enabled, Ordering::Relaxed);
}

/// Check if logging is enabled, default is true
pub fn is_log_enabled() -> bool {
  ENABLE_LOG.load(Ordering::Relaxed)
}
