// Compute cell: output-stationary multiply-accumulate unit

use serde::{Deserialize, Serialize};

use super::params::sign_wrap;
use crate::builtin::{Module, Reg};

/// Array-wide accumulation mode, a 2-bit signal shared by every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccMode {
  /// acc <- acc + product
  Accumulate = 0,
  /// acc <- west neighbour's acc (drain toward the last column)
  FlushA = 1,
  /// acc <- north neighbour's acc (drain toward the last row)
  FlushB = 2,
  /// acc <- 0
  Clear = 3,
}

impl AccMode {
  pub fn bits(self) -> u8 {
    self as u8
  }

  pub fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0 => AccMode::Accumulate,
      1 => AccMode::FlushA,
      2 => AccMode::FlushB,
      _ => AccMode::Clear,
    }
  }
}

/// Control broadcast to a whole array for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
  pub mode: AccMode,
  pub valid: bool,
}

impl Control {
  pub fn new(mode: AccMode, valid: bool) -> Self {
    Self { mode, valid }
  }

  /// No operands, accumulators held.
  pub fn hold() -> Self {
    Self::new(AccMode::Accumulate, false)
  }
}

/// Everything a cell samples in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct CellInput {
  pub ctrl: Control,
  /// Operand A from the west
  pub a: i64,
  /// Operand B from the north
  pub b: i64,
  /// Upstream accumulator along axis A
  pub acc_west: i64,
  /// Upstream accumulator along axis B
  pub acc_north: i64,
}

/// Processing element of the systolic grid
#[derive(Debug, Clone)]
pub struct ComputeCell {
  a: Reg<i64>,
  b: Reg<i64>,
  acc: Reg<i64>,
  in_width: u32,
  out_width: u32,
}

impl ComputeCell {
  pub fn new(in_width: u32, out_width: u32) -> Self {
    Self {
      a: Reg::new(0),
      b: Reg::new(0),
      acc: Reg::new(0),
      in_width,
      out_width,
    }
  }

  /// Operand A relayed east
  pub fn a_out(&self) -> i64 {
    self.a.value()
  }

  /// Operand B relayed south
  pub fn b_out(&self) -> i64 {
    self.b.value()
  }

  /// Accumulator, exposed to both downstream neighbours
  pub fn acc(&self) -> i64 {
    self.acc.value()
  }

  /// Product of the operands loaded on the previous cycle.
  pub fn product(&self) -> i64 {
    self.a.value().wrapping_mul(self.b.value())
  }
}

impl Module for ComputeCell {
  type Input = CellInput;

  fn run(&mut self, input: &CellInput) {
    if input.ctrl.valid {
      self.a.set(sign_wrap(input.a, self.in_width));
      self.b.set(sign_wrap(input.b, self.in_width));
    } else {
      self.a.set(0);
      self.b.set(0);
    }

    let next = match input.ctrl.mode {
      AccMode::Accumulate => self.acc().wrapping_add(self.product()),
      AccMode::FlushA => input.acc_west,
      AccMode::FlushB => input.acc_north,
      AccMode::Clear => 0,
    };
    self.acc.set(sign_wrap(next, self.out_width));
  }

  fn commit(&mut self) {
    self.a.commit();
    self.b.commit();
    self.acc.commit();
  }

  fn reset(&mut self) {
    self.a.reset();
    self.b.reset();
    self.acc.reset();
  }

  fn name(&self) -> &str {
    "cell"
  }
}
