use serde::{Deserialize, Serialize};
use sim::models::model_trait::{DevsModel, Reportable, ReportableModel, SerializableModel};
use sim::models::{ModelMessage, ModelRecord};
use sim::simulator::Services;
use sim::utils::errors::SimulationError;
use std::f64::INFINITY;

use super::controller::Phase;
use super::memory::MemorySet;
use super::params::{CoreParams, Dims};
use super::top::{MatmulCore, RunStats};
use crate::model_record;

/// Payload of the done port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoneReport {
  pub cycles: u64,
  pub tiles: u64,
  /// Final contents of the C memory, word by word
  pub c_words: Vec<Vec<i64>>,
  pub stats: RunStats,
}

/// Discrete-event wrapper around [`MatmulCore`]: one core cycle per time unit.
#[derive(Debug, Clone)]
pub struct MatmulEngine {
  start_port: String,
  done_port: String,
  core: MatmulCore,
  mem: MemorySet,
  stats: RunStats,
  last_phase: Phase,
  until_next_event: f64,
  records: Vec<ModelRecord>,
}

impl MatmulEngine {
  pub fn new(start_port: String, done_port: String, params: CoreParams, mem: MemorySet) -> Self {
    Self {
      start_port,
      done_port,
      core: MatmulCore::new(params),
      mem,
      stats: RunStats::default(),
      last_phase: Phase::Idle,
      until_next_event: INFINITY,
      records: Vec::new(),
    }
  }

  pub fn is_busy(&self) -> bool {
    self.until_next_event.is_finite()
  }
}

impl DevsModel for MatmulEngine {
  fn events_ext(&mut self, incoming_message: &ModelMessage, services: &mut Services) -> Result<(), SimulationError> {
    if incoming_message.port_name != self.start_port {
      return Ok(());
    }
    if self.is_busy() {
      // start is only sampled in Idle
      model_record!(self, services, "ignored_start", "core busy");
      return Ok(());
    }

    let dims = serde_json::from_str::<Dims>(&incoming_message.content).map_err(|_| SimulationError::InvalidModelState)?;
    self.core.reset();
    self.core.start(dims);
    self.stats = RunStats {
      tiles: dims.tiles(self.core.params()) as u64,
      ..RunStats::default()
    };
    self.last_phase = Phase::Idle;
    self.until_next_event = 1.0;

    model_record!(
      self,
      services,
      "start",
      format!("M={}, K={}, N={}", dims.m, dims.k, dims.n)
    );
    Ok(())
  }

  fn events_int(&mut self, services: &mut Services) -> Result<Vec<ModelMessage>, SimulationError> {
    let report = self.core.tick(&mut self.mem);
    self.stats.observe(&report);

    if report.phase != self.last_phase {
      model_record!(self, services, "phase", format!("{:?} at cycle {}", report.phase, report.cycle));
      self.last_phase = report.phase;
    }

    if !report.done {
      self.until_next_event = 1.0;
      return Ok(Vec::new());
    }

    self.until_next_event = INFINITY;
    let done = DoneReport {
      cycles: self.stats.cycles,
      tiles: self.stats.tiles,
      c_words: self.mem.c.words().to_vec(),
      stats: self.stats,
    };
    model_record!(
      self,
      services,
      "done",
      format!("cycles={}, c_words={}", done.cycles, self.stats.c_words)
    );
    let content = serde_json::to_string(&done).map_err(|_| SimulationError::InvalidModelState)?;
    Ok(vec![ModelMessage {
      port_name: self.done_port.clone(),
      content,
    }])
  }

  fn time_advance(&mut self, time_delta: f64) {
    self.until_next_event -= time_delta;
  }

  fn until_next_event(&self) -> f64 {
    self.until_next_event
  }
}

impl Reportable for MatmulEngine {
  fn status(&self) -> String {
    format!("phase={:?}, cycle={}", self.core.phase(), self.core.cycle())
  }

  fn records(&self) -> &Vec<ModelRecord> {
    &self.records
  }
}

impl ReportableModel for MatmulEngine {}

impl SerializableModel for MatmulEngine {
  fn get_type(&self) -> &'static str {
    "MatmulEngine"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sim::models::Model;
  use sim::simulator::{Connector, Message, Simulation};

  #[test]
  fn test_engine_emits_done_report() {
    let params = CoreParams {
      kernels: 1,
      ..CoreParams::default()
    };
    let dims = Dims::new(4, 2, 4);
    let a = vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8]];
    let b = vec![vec![1, 0, 2, 0], vec![0, 1, 0, 2]];
    let mem = MemorySet::load(&params, &dims, &a, &b).unwrap();

    let models = vec![Model::new(
      "engine".to_string(),
      Box::new(MatmulEngine::new("start".to_string(), "done".to_string(), params, mem)),
    )];
    let connectors = vec![Connector::new(
      "engine_host".to_string(),
      "engine".to_string(),
      "host".to_string(),
      "done".to_string(),
      "done".to_string(),
    )];
    let mut simulation = Simulation::post(models, connectors);
    simulation.inject_input(Message::new(
      "host".to_string(),
      "start".to_string(),
      "engine".to_string(),
      "start".to_string(),
      simulation.get_global_time(),
      serde_json::to_string(&dims).unwrap(),
    ));

    let mut report = None;
    for _ in 0..100 {
      let messages = simulation.step().unwrap();
      if let Some(msg) = messages.iter().find(|m| m.source_id() == "engine") {
        report = Some(serde_json::from_str::<DoneReport>(msg.content()).unwrap());
        break;
      }
    }
    let report = report.unwrap();
    assert_eq!(report.cycles, dims.expected_cycles(&params));
    assert_eq!(report.tiles, 1);
    // row-major C, one word per row
    assert_eq!(
      report.c_words,
      vec![vec![1, 2, 2, 4], vec![3, 4, 6, 8], vec![5, 6, 10, 12], vec![7, 8, 14, 16]]
    );
  }
}
