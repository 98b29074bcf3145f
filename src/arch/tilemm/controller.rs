// Tile controller: sequences StartKernels/Fill/Flood/Flush per tile and
// generates every memory address from its loop counters.

use serde::{Deserialize, Serialize};

use super::addr::AddressMap;
use super::counter::{Ceiling, CounterInput, TickCounter};
use super::params::{CoreParams, Dims};
use super::pe::{AccMode, Control};
use crate::builtin::{Module, Reg};

/// Pipeline phase of the tile controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
  Idle,
  StartKernels,
  Fill,
  Flood,
  FloodLast,
  Flush,
  FlushLast,
  Done,
}

impl Phase {
  pub fn is_flood(self) -> bool {
    matches!(self, Phase::Flood | Phase::FloodLast)
  }

  pub fn is_flush(self) -> bool {
    matches!(self, Phase::Flush | Phase::FlushLast)
  }

  /// Array mode driven in this phase.
  pub fn mode(self) -> AccMode {
    match self {
      Phase::StartKernels => AccMode::Clear,
      Phase::Flush | Phase::FlushLast => AccMode::FlushB,
      _ => AccMode::Accumulate,
    }
  }

  pub fn operand_valid(self) -> bool {
    matches!(self, Phase::Fill | Phase::Flood | Phase::FloodLast)
  }
}

/// Combinational outputs of the controller for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSignals {
  pub phase: Phase,
  pub ctrl: Control,
  /// Memory words enter the skew lines only while filling
  pub feed: bool,
  pub a_addr: u64,
  pub b_addr: u64,
  pub c_addr: u64,
  pub c_write: bool,
  pub done: bool,
}

/// Per-cycle inputs of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerInput {
  pub start: bool,
  pub dims: Dims,
}

/// Tile controller state machine
#[derive(Debug, Clone)]
pub struct TileController {
  name: String,
  params: CoreParams,
  phase: Reg<Phase>,

  // Loop counters
  k: TickCounter,
  m: TickCounter,
  n: TickCounter,
  flood: TickCounter,
  flush: TickCounter,

  // Tile coordinates latched when the K loop completes, for the C path
  captured_m: Reg<u64>,
  captured_n: Reg<u64>,
}

impl TileController {
  pub fn new(params: &CoreParams) -> Self {
    let width = params.addr_width;
    Self {
      name: "tile_controller".to_string(),
      params: *params,
      phase: Reg::new(Phase::Idle),
      k: TickCounter::new("k_tile", width),
      m: TickCounter::new("m_tile", width),
      n: TickCounter::new("n_tile", width),
      flood: TickCounter::new("flood_wait", width),
      flush: TickCounter::new("flush_offset", width),
      captured_m: Reg::new(0),
      captured_n: Reg::new(0),
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase.value()
  }

  /// Live (m_tile, n_tile, k) loop coordinates.
  pub fn coords(&self) -> (u64, u64, u64) {
    (self.m.value(), self.n.value(), self.k.value())
  }

  /// Coordinates used by the destination path.
  pub fn captured(&self) -> (u64, u64) {
    (self.captured_m.value(), self.captured_n.value())
  }

  pub fn flush_offset(&self) -> u64 {
    self.flush.value()
  }

  fn ceilings(&self, dims: &Dims) -> (Ceiling, Ceiling, Ceiling) {
    (
      Ceiling::Bounded(dims.k as u64),
      Ceiling::Bounded(dims.m_tiles(&self.params) as u64),
      Ceiling::Bounded(dims.n_tiles(&self.params) as u64),
    )
  }

  fn flood_ceiling(&self) -> Ceiling {
    Ceiling::Bounded(self.params.flood_cycles())
  }

  fn flush_ceiling(&self) -> Ceiling {
    Ceiling::Bounded(self.params.edge as u64)
  }

  pub fn signals(&self, dims: &Dims) -> ControlSignals {
    let phase = self.phase();
    let map = AddressMap::new(&self.params, dims);
    let (m, n, k) = self.coords();
    let (cap_m, cap_n) = self.captured();
    ControlSignals {
      phase,
      ctrl: Control::new(phase.mode(), phase.operand_valid()),
      feed: phase == Phase::Fill,
      a_addr: map.a_source(m, k),
      b_addr: map.b_source(n, k),
      c_addr: map.c_dest(cap_n, cap_m, self.flush.value()),
      c_write: phase.is_flush(),
      done: phase == Phase::Done,
    }
  }

  fn next_phase(&self, start: bool, k_done: bool, last_tile: bool, flood_done: bool, flush_done: bool) -> Phase {
    match self.phase() {
      Phase::Idle if start => Phase::StartKernels,
      Phase::Idle => Phase::Idle,
      Phase::StartKernels => Phase::Fill,
      Phase::Fill if k_done && last_tile => Phase::FloodLast,
      Phase::Fill if k_done => Phase::Flood,
      Phase::Fill => Phase::Fill,
      Phase::Flood if flood_done => Phase::Flush,
      Phase::FloodLast if flood_done => Phase::FlushLast,
      Phase::Flush if flush_done => Phase::StartKernels,
      Phase::FlushLast if flush_done => Phase::Done,
      Phase::Done => Phase::Idle,
      other => other,
    }
  }
}

impl Module for TileController {
  type Input = ControllerInput;

  fn run(&mut self, input: &ControllerInput) {
    let phase = self.phase();
    let (k_ceiling, m_ceiling, n_ceiling) = self.ceilings(&input.dims);
    let flood_ceiling = self.flood_ceiling();
    let flush_ceiling = self.flush_ceiling();

    // counter chain: K inside M inside N
    let k_enable = phase == Phase::Fill;
    let k_done = self.k.at_ceiling(k_enable, k_ceiling);
    let m_done = self.m.at_ceiling(k_done, m_ceiling);
    let n_enable = k_done && m_done;
    let n_done = self.n.at_ceiling(n_enable, n_ceiling);

    let flood_enable = phase.is_flood();
    let flood_done = self.flood.at_ceiling(flood_enable, flood_ceiling);
    let flush_enable = phase.is_flush();
    let flush_done = self.flush.at_ceiling(flush_enable, flush_ceiling);

    let start = phase == Phase::Idle && input.start;
    let tile_reset = phase == Phase::StartKernels;

    self.k.run(&CounterInput {
      enable: k_enable,
      clear: tile_reset,
      ceiling: k_ceiling,
    });
    self.m.run(&CounterInput {
      enable: k_done,
      clear: start,
      ceiling: m_ceiling,
    });
    self.n.run(&CounterInput {
      enable: n_enable,
      clear: start,
      ceiling: n_ceiling,
    });
    self.flood.run(&CounterInput {
      enable: flood_enable,
      clear: tile_reset,
      ceiling: flood_ceiling,
    });
    self.flush.run(&CounterInput {
      enable: flush_enable,
      clear: tile_reset,
      ceiling: flush_ceiling,
    });

    // the destination path sees this tile's coordinates from the next cycle on,
    // while the live counters already point at the next tile
    if k_done {
      self.captured_m.set(self.m.value());
      self.captured_n.set(self.n.value());
    }

    let next = self.next_phase(input.start, k_done, n_done, flood_done, flush_done);
    if next != phase {
      log::debug!(
        "{}: {:?} -> {:?} (m={}, n={}, k={})",
        self.name,
        phase,
        next,
        self.m.value(),
        self.n.value(),
        self.k.value()
      );
    }
    self.phase.set(next);
  }

  fn commit(&mut self) {
    self.phase.commit();
    self.k.commit();
    self.m.commit();
    self.n.commit();
    self.flood.commit();
    self.flush.commit();
    self.captured_m.commit();
    self.captured_n.commit();
  }

  fn reset(&mut self) {
    self.phase.reset();
    self.k.reset();
    self.m.reset();
    self.n.reset();
    self.flood.reset();
    self.flush.reset();
    self.captured_m.reset();
    self.captured_n.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}
