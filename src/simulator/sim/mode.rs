use serde::{Deserialize, Serialize};

/// How the simulator drives the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
  /// Direct clock loop
  #[default]
  Cycle,
  /// Discrete-event simulation through `MatmulEngine`
  Event,
}
