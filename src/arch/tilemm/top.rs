// Top-level wiring of the tiled matmul core: controller, shared A skew lines,
// replicated kernels and the three memory ports.

use serde::{Deserialize, Serialize};

use super::controller::{ControlSignals, ControllerInput, Phase, TileController};
use super::kernel::{Kernel, KernelInput};
use super::memory::MemorySet;
use super::params::{CoreParams, Dims};
use super::skew::SkewBank;
use crate::builtin::{Module, Wire};
use crate::error::{Result, SysError};
use crate::simulator::utils::log::is_log_enabled;

/// What the core did on one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
  pub cycle: u64,
  pub phase: Phase,
  /// C word written this cycle
  pub c_write: Option<(u64, Vec<i64>)>,
  pub done: bool,
}

/// Cycle accounting of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
  pub cycles: u64,
  pub tiles: u64,
  pub start_groups: u64,
  pub fill_cycles: u64,
  pub flood_cycles: u64,
  pub flush_cycles: u64,
  pub c_words: u64,
}

impl RunStats {
  pub fn observe(&mut self, report: &TickReport) {
    self.cycles += 1;
    match report.phase {
      Phase::StartKernels => self.start_groups += 1,
      Phase::Fill => self.fill_cycles += 1,
      Phase::Flood | Phase::FloodLast => self.flood_cycles += 1,
      Phase::Flush | Phase::FlushLast => self.flush_cycles += 1,
      _ => {},
    }
    if report.c_write.is_some() {
      self.c_words += 1;
    }
  }
}

/// Cycle-accurate tiled multi-kernel matmul core
#[derive(Debug, Clone)]
pub struct MatmulCore {
  params: CoreParams,
  controller: TileController,
  a_skew: SkewBank,
  kernels: Vec<Kernel>,
  dims: Dims,
  start_pending: bool,
  cycle: u64,
  quiet: bool,
}

impl MatmulCore {
  pub fn new(params: CoreParams) -> Self {
    Self {
      controller: TileController::new(&params),
      a_skew: SkewBank::new("a_skew", params.edge),
      kernels: (0..params.kernels).map(|i| Kernel::new(i, &params)).collect(),
      params,
      dims: Dims::default(),
      start_pending: false,
      cycle: 0,
      quiet: false,
    }
  }

  pub fn params(&self) -> &CoreParams {
    &self.params
  }

  pub fn phase(&self) -> Phase {
    self.controller.phase()
  }

  pub fn controller(&self) -> &TileController {
    &self.controller
  }

  pub fn kernels(&self) -> &[Kernel] {
    &self.kernels
  }

  /// Cycles ticked since the last reset.
  pub fn cycle(&self) -> u64 {
    self.cycle
  }

  /// Global reset: every register back to its initial value.
  pub fn reset(&mut self) {
    self.controller.reset();
    self.a_skew.reset();
    self.kernels.iter_mut().for_each(Kernel::reset);
    self.start_pending = false;
    self.cycle = 0;
  }

  /// Raise the start pulse for the next tick. `dims` stay applied until the
  /// next accepted start.
  ///
  /// The controller samples start only in Idle, so a start raised while a run
  /// is in flight is dropped and leaves that run's dimensions untouched.
  /// Returns whether the pulse was accepted.
  pub fn start(&mut self, dims: Dims) -> bool {
    if self.phase() != Phase::Idle {
      log::debug!("start ignored in {:?}", self.phase());
      return false;
    }
    self.dims = dims;
    self.start_pending = true;
    true
  }

  /// Silence the run summaries of this core only.
  pub fn set_quiet(&mut self, quiet: bool) {
    self.quiet = quiet;
  }

  fn log_enabled(&self) -> bool {
    !self.quiet && is_log_enabled()
  }

  pub fn signals(&self) -> ControlSignals {
    self.controller.signals(&self.dims)
  }

  /// Advance the whole core by one clock cycle.
  pub fn tick(&mut self, mem: &mut MemorySet) -> TickReport {
    let signals = self.signals();
    let lanes = self.params.edge;

    // operands enter the skew lines only while filling
    let mut a_word = Wire::new(Vec::new());
    let mut b_word = Wire::new(Vec::new());
    if signals.feed {
      a_word.set(mem.a.read(signals.a_addr));
      b_word.set(mem.b.read(signals.b_addr));
    }
    let a_word = a_word.get_or(vec![0; lanes]);
    let b_word = b_word.get_or(vec![0; self.params.tile_cols()]);

    let a_skewed = self.a_skew.output(&a_word);
    self.a_skew.run(&a_word);

    for kernel in self.kernels.iter_mut() {
      let input = KernelInput {
        ctrl: signals.ctrl,
        a: a_skewed.clone(),
        b: b_word[kernel.word_lanes()].to_vec(),
      };
      kernel.run(&input);
    }

    // one write-enable for every lane of every kernel
    let mut c_word = Wire::new(Vec::new());
    if signals.c_write {
      let word: Vec<i64> = self.kernels.iter().flat_map(|k| k.result(&signals.ctrl)).collect();
      log::trace!("cycle {}: C[{}] <- {:?}", self.cycle, signals.c_addr, word);
      mem.c.write(signals.c_addr, &word);
      c_word.set(word);
    }

    self.controller.run(&ControllerInput {
      start: self.start_pending,
      dims: self.dims,
    });

    self.controller.commit();
    self.a_skew.commit();
    self.kernels.iter_mut().for_each(Kernel::commit);

    // the start pulse lasts one cycle
    self.start_pending = false;
    let report = TickReport {
      cycle: self.cycle,
      phase: signals.phase,
      c_write: c_word.valid.then(|| (signals.c_addr, c_word.value)),
      done: signals.done,
    };
    self.cycle += 1;
    report
  }

  /// Reset, start and tick until the done pulse, at most `max_cycles` cycles.
  pub fn run(&mut self, dims: Dims, mem: &mut MemorySet, max_cycles: u64) -> Result<RunStats> {
    self.run_with(dims, mem, max_cycles, |_| Ok(()))
  }

  /// Same as [`MatmulCore::run`], handing every cycle's report to `on_tick`.
  pub fn run_with<F>(&mut self, dims: Dims, mem: &mut MemorySet, max_cycles: u64, mut on_tick: F) -> Result<RunStats>
  where
    F: FnMut(&TickReport) -> Result<()>,
  {
    self.reset();
    self.start(dims);
    if self.log_enabled() {
      log::info!(
        "matmul start: M={} K={} N={} edge={} kernels={}",
        dims.m,
        dims.k,
        dims.n,
        self.params.edge,
        self.params.kernels
      );
    }

    let mut stats = RunStats {
      tiles: dims.tiles(&self.params) as u64,
      ..RunStats::default()
    };
    while stats.cycles < max_cycles {
      let report = self.tick(mem);
      on_tick(&report)?;
      stats.observe(&report);
      if report.done {
        if self.log_enabled() {
          log::info!(
            "matmul done: {} cycles, {} tiles, {} C words",
            stats.cycles,
            stats.tiles,
            stats.c_words
          );
        }
        return Ok(stats);
      }
    }
    Err(SysError::Timeout { limit: max_cycles })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arch::tilemm::memory::{unpack_c, Matrix};

  fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
    let (m, k, n) = (a.len(), b.len(), b[0].len());
    (0..m)
      .map(|i| (0..n).map(|j| (0..k).map(|x| a[i][x] * b[x][j]).sum()).collect())
      .collect()
  }

  #[test]
  fn test_single_tile_product() {
    let params = CoreParams {
      kernels: 1,
      ..CoreParams::default()
    };
    let dims = Dims::new(4, 4, 4);
    let a: Matrix = (0..4).map(|r| (0..4).map(|c| (r * 4 + c) as i64 - 7).collect()).collect();
    let b: Matrix = (0..4).map(|r| (0..4).map(|c| (r + 2 * c) as i64 % 5).collect()).collect();
    let mut mem = MemorySet::load(&params, &dims, &a, &b).unwrap();

    let mut core = MatmulCore::new(params);
    let stats = core.run(dims, &mut mem, 100).unwrap();
    assert_eq!(stats.cycles, dims.expected_cycles(&params));
    assert_eq!(stats.start_groups, 1);
    assert_eq!(stats.fill_cycles, 4);
    assert_eq!(stats.flood_cycles, 7);
    assert_eq!(stats.flush_cycles, 4);
    assert_eq!(unpack_c(&mem.c, &params, &dims), matmul(&a, &b));
  }

  #[test]
  fn test_two_kernels_two_tiles() {
    let params = CoreParams {
      edge: 2,
      kernels: 2,
      ..CoreParams::default()
    };
    let dims = Dims::new(4, 3, 8);
    let a: Matrix = (0..4).map(|r| (0..3).map(|c| (r + c) as i64).collect()).collect();
    let b: Matrix = (0..3).map(|r| (0..8).map(|c| (c as i64) - (r as i64)).collect()).collect();
    let mut mem = MemorySet::load(&params, &dims, &a, &b).unwrap();

    let mut core = MatmulCore::new(params);
    let stats = core.run(dims, &mut mem, 1_000).unwrap();
    assert_eq!(stats.tiles, 4);
    assert_eq!(stats.start_groups, 4);
    assert_eq!(stats.c_words, 8);
    assert_eq!(unpack_c(&mem.c, &params, &dims), matmul(&a, &b));
  }

  #[test]
  fn test_timeout() {
    let params = CoreParams::default();
    let dims = Dims::new(4, 4, 16);
    let mut mem = MemorySet::for_run(&params, &dims);
    let mut core = MatmulCore::new(params);
    let err = core.run(dims, &mut mem, 10).unwrap_err();
    assert!(matches!(err, SysError::Timeout { limit: 10 }));
  }

  #[test]
  fn test_start_during_run_is_ignored() {
    let params = CoreParams {
      kernels: 1,
      ..CoreParams::default()
    };
    let dims = Dims::new(4, 4, 4);
    let a: Matrix = (0..4).map(|r| (0..4).map(|c| (r + c + 1) as i64).collect()).collect();
    let b: Matrix = (0..4).map(|r| (0..4).map(|c| (r * c + 1) as i64).collect()).collect();
    let mut mem = MemorySet::load(&params, &dims, &a, &b).unwrap();

    let mut core = MatmulCore::new(params);
    assert!(core.start(dims));
    let mut cycles = 0;
    for _ in 0..4 {
      core.tick(&mut mem);
      cycles += 1;
    }
    assert_eq!(core.phase(), Phase::Fill);
    assert!(!core.start(Dims::new(4, 8, 8)));

    loop {
      cycles += 1;
      if core.tick(&mut mem).done {
        break;
      }
      assert!(cycles < 100, "run never finished");
    }
    assert_eq!(cycles, dims.expected_cycles(&params));
    assert_eq!(unpack_c(&mem.c, &params, &dims), matmul(&a, &b));

    // back in Idle the next start is accepted again
    assert_eq!(core.phase(), Phase::Idle);
    assert!(core.start(dims));
  }

  #[test]
  fn test_run_with_sees_every_tick() {
    let params = CoreParams::default();
    let dims = Dims::new(4, 3, 16);
    let mut mem = MemorySet::for_run(&params, &dims);
    let mut core = MatmulCore::new(params);
    let mut phases = Vec::new();
    let stats = core
      .run_with(dims, &mut mem, 100, |report| {
        phases.push(report.phase);
        Ok(())
      })
      .unwrap();
    assert_eq!(phases.len() as u64, stats.cycles);
    assert_eq!(phases.first(), Some(&Phase::Idle));
    assert_eq!(phases.last(), Some(&Phase::Done));
  }

  #[test]
  fn test_start_pulse_is_one_cycle() {
    let params = CoreParams::default();
    let dims = Dims::new(4, 2, 16);
    let mut mem = MemorySet::for_run(&params, &dims);
    let mut core = MatmulCore::new(params);
    core.start(dims);
    assert_eq!(core.tick(&mut mem).phase, Phase::Idle);
    assert_eq!(core.tick(&mut mem).phase, Phase::StartKernels);
    assert_eq!(core.tick(&mut mem).phase, Phase::Fill);
  }
}
