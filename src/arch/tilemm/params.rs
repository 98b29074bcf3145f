use serde::{Deserialize, Serialize};

use crate::error::{Result, SysError};

/// Instantiate-time parameters of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreParams {
  /// Operand width in bits (InDataWidth)
  pub in_width: u32,
  /// Accumulator width in bits (OutDataWidth)
  pub out_width: u32,
  /// Compute array edge length L, which is also the lane count per edge and
  /// the element count of an A word
  pub edge: usize,
  /// Number of replicated kernels along N
  pub kernels: usize,
  /// Address bus width in bits
  pub addr_width: u32,
  /// Wire the row-0/column-0 accumulator inputs to zero instead of the
  /// array's own last row/column
  pub zero_boundary: bool,
}

impl Default for CoreParams {
  fn default() -> Self {
    Self {
      in_width: 8,
      out_width: 32,
      edge: 4,
      kernels: 4,
      addr_width: 32,
      zero_boundary: false,
    }
  }
}

impl CoreParams {
  /// Output columns covered by one tile across all kernels. A B or C memory
  /// word carries exactly one tile row, so this is also its element count.
  pub fn tile_cols(&self) -> usize {
    self.edge * self.kernels
  }

  pub fn addr_mask(&self) -> u64 {
    bit_mask(self.addr_width)
  }

  /// Flood phase length: the wait reaches 2L-2 after entry.
  pub fn flood_cycles(&self) -> u64 {
    2 * self.edge as u64 - 1
  }

  pub fn validate(&self) -> Result<()> {
    if !(1..=32).contains(&self.in_width) {
      return Err(SysError::invalid_config(format!(
        "in_width must be in 1..=32, got {}",
        self.in_width
      )));
    }
    if !(1..=64).contains(&self.out_width) {
      return Err(SysError::invalid_config(format!(
        "out_width must be in 1..=64, got {}",
        self.out_width
      )));
    }
    if self.edge == 0 {
      return Err(SysError::invalid_config("edge must be at least 1"));
    }
    if self.kernels == 0 {
      return Err(SysError::invalid_config("kernels must be at least 1"));
    }
    if !(1..=64).contains(&self.addr_width) {
      return Err(SysError::invalid_config(format!(
        "addr_width must be in 1..=64, got {}",
        self.addr_width
      )));
    }
    Ok(())
  }
}

/// Logical matrix dimensions of one run: A is M×K, B is K×N, C is M×N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dims {
  pub m: usize,
  pub k: usize,
  pub n: usize,
}

impl Dims {
  pub fn new(m: usize, k: usize, n: usize) -> Self {
    Self { m, k, n }
  }

  /// Ceiling of the M tile loop.
  pub fn m_tiles(&self, params: &CoreParams) -> usize {
    self.m / params.edge
  }

  /// Ceiling of the N tile loop.
  pub fn n_tiles(&self, params: &CoreParams) -> usize {
    self.n / params.tile_cols()
  }

  pub fn tiles(&self, params: &CoreParams) -> usize {
    self.m_tiles(params) * self.n_tiles(params)
  }

  /// Cycles from the start cycle through the done pulse, inclusive.
  ///
  /// Per tile: one StartKernels cycle, K fill cycles, 2L-1 flood cycles and
  /// L flush cycles. Plus the Idle cycle that samples start and the Done cycle.
  pub fn expected_cycles(&self, params: &CoreParams) -> u64 {
    let edge = params.edge as u64;
    let per_tile = 1 + self.k as u64 + (2 * edge - 1) + edge;
    2 + self.tiles(params) as u64 * per_tile
  }

  /// Configuration-time precondition check; the core never checks.
  pub fn validate(&self, params: &CoreParams) -> Result<()> {
    let fail = |reason: String| SysError::InvalidDims {
      m: self.m,
      k: self.k,
      n: self.n,
      reason,
    };
    if self.m == 0 || self.k == 0 || self.n == 0 {
      return Err(fail("all dimensions must be positive".to_string()));
    }
    if self.m % params.edge != 0 {
      return Err(fail(format!("M must be a multiple of {}", params.edge)));
    }
    if self.n % params.tile_cols() != 0 {
      return Err(fail(format!(
        "N must be a multiple of {} (edge x kernels)",
        params.tile_cols()
      )));
    }
    Ok(())
  }
}

pub fn bit_mask(bits: u32) -> u64 {
  if bits >= 64 {
    u64::MAX
  } else {
    (1u64 << bits) - 1
  }
}

/// Truncate to `bits` and sign-extend back (two's-complement wraparound).
pub fn sign_wrap(value: i64, bits: u32) -> i64 {
  if bits >= 64 {
    value
  } else {
    let shift = 64 - bits;
    (value << shift) >> shift
  }
}
