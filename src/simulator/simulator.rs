use sim::models::Model;
use sim::simulator::{Connector, Message, Simulation};

use super::config::{validate_config, AppConfig};
use super::sim::RunMode;
use super::trace::TraceWriter;
use super::utils::log::is_log_enabled;
use super::utils::report::{format_stats, log_simulation_records};
use crate::arch::tilemm::{unpack_c, DoneReport, MatmulCore, MatmulEngine, Matrix, MemorySet, RunStats};
use crate::arch::tilemm::{CoreParams, Dims};
use crate::error::{Result, SysError};

const ENGINE_ID: &str = "engine";
const HOST_ID: &str = "host";

/// Extra cycles allowed past the cycle law before a run counts as hung.
const CYCLE_MARGIN: u64 = 16;

/// Product and cycle accounting of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
  pub c: Matrix,
  pub stats: RunStats,
}

pub struct Simulator {
  config: AppConfig,
  core: MatmulCore,
}

impl Simulator {
  pub fn new(config: AppConfig) -> Result<Self> {
    validate_config(&config)?;
    let mut core = MatmulCore::new(config.core);
    core.set_quiet(config.simulation.quiet);
    Ok(Self { core, config })
  }

  /// Run summaries are silenced per instance by `simulation.quiet` and
  /// process-wide by `set_log(false)`.
  pub fn is_quiet(&self) -> bool {
    self.config.simulation.quiet || !is_log_enabled()
  }

  pub fn config(&self) -> &AppConfig {
    &self.config
  }

  pub fn params(&self) -> &CoreParams {
    &self.config.core
  }

  /// Core state after the last cycle-mode run.
  pub fn core(&self) -> &MatmulCore {
    &self.core
  }

  fn cycle_limit(&self, dims: &Dims) -> u64 {
    match self.config.simulation.max_cycles {
      0 => dims.expected_cycles(self.params()) + CYCLE_MARGIN,
      limit => limit,
    }
  }

  /// Compute `a · b` on the core.
  pub fn run(&mut self, a: &Matrix, b: &Matrix) -> Result<RunOutcome> {
    let dims = Dims::new(a.len(), b.len(), b.first().map_or(0, Vec::len));
    if a.iter().any(|row| row.len() != dims.k) {
      return Err(SysError::shape_mismatch(format!(
        "A rows must have {} columns to match B",
        dims.k
      )));
    }
    dims.validate(self.params())?;

    let params = self.config.core;
    let mem = MemorySet::load(&params, &dims, a, b)?;
    let mut trace = TraceWriter::create(&self.config.simulation.trace_file)?;
    let limit = self.cycle_limit(&dims);

    let (mem, stats) = match self.config.simulation.run_mode {
      RunMode::Cycle => self.run_cycles(dims, mem, limit, &mut trace)?,
      RunMode::Event => self.run_events(dims, mem, limit, &mut trace)?,
    };
    trace.finish()?;

    if !self.is_quiet() {
      log::info!("run finished: {}", format_stats(&stats));
    }
    Ok(RunOutcome {
      c: unpack_c(&mem.c, &params, &dims),
      stats,
    })
  }

  fn run_cycles(
    &mut self,
    dims: Dims,
    mut mem: MemorySet,
    limit: u64,
    trace: &mut TraceWriter,
  ) -> Result<(MemorySet, RunStats)> {
    let stats = self
      .core
      .run_with(dims, &mut mem, limit, |report| trace.record_tick(report))?;
    Ok((mem, stats))
  }

  fn run_events(
    &mut self,
    dims: Dims,
    mem: MemorySet,
    limit: u64,
    trace: &mut TraceWriter,
  ) -> Result<(MemorySet, RunStats)> {
    let params = self.config.core;
    let models = vec![Model::new(
      String::from(ENGINE_ID),
      Box::new(MatmulEngine::new(
        String::from("start"),
        String::from("done"),
        params,
        mem,
      )),
    )];
    let connectors = vec![Connector::new(
      String::from("engine_done"),
      String::from(ENGINE_ID),
      String::from(HOST_ID),
      String::from("done"),
      String::from("done"),
    )];
    let mut simulation = Simulation::post(models, connectors);

    let start = Message::new(
      String::from(HOST_ID),
      String::from("start"),
      String::from(ENGINE_ID),
      String::from("start"),
      simulation.get_global_time(),
      serde_json::to_string(&dims)?,
    );
    trace.record_message(&start)?;
    simulation.inject_input(start);

    // one extra step delivers the start message
    for _ in 0..=limit {
      let messages = simulation
        .step()
        .map_err(|e| SysError::Simulation { reason: format!("{:?}", e) })?;
      let done = messages
        .iter()
        .find(|msg| msg.source_id() == ENGINE_ID && msg.target_id() == HOST_ID);
      if let Some(msg) = done {
        trace.record_message(msg)?;
        let report: DoneReport = serde_json::from_str(msg.content())?;
        if !self.is_quiet() {
          log_simulation_records(&mut simulation);
        }

        let mut mem = MemorySet::for_run(&params, &dims);
        for (addr, word) in report.c_words.iter().enumerate() {
          mem.c.write(addr as u64, word);
        }
        return Ok((mem, report.stats));
      }
    }
    Err(SysError::Timeout { limit })
  }
}
