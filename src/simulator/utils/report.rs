use sim::models::{Model, Reportable};
use sim::simulator::Simulation;

use super::log::is_log_enabled;
use crate::arch::tilemm::RunStats;

/// Log every model's records at info level.
pub fn log_simulation_records(simulation: &mut Simulation) {
  if !is_log_enabled() {
    return;
  }
  for model in simulation.models().iter() {
    log_model_records(model);
  }
}

fn log_model_records(model: &Model) {
  for record in model.records() {
    log::info!(
      "[{}] t={:.1} {}: {}",
      model.id(),
      record.time,
      record.action,
      record.subject
    );
  }
}

/// One-line summary of a finished run.
pub fn format_stats(stats: &RunStats) -> String {
  format!(
    "cycles={} tiles={} groups={} fill={} flood={} flush={} c_words={}",
    stats.cycles,
    stats.tiles,
    stats.start_groups,
    stats.fill_cycles,
    stats.flood_cycles,
    stats.flush_cycles,
    stats.c_words
  )
}
