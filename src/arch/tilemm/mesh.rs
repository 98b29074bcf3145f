// Systolic grid of compute cells.
// A flows east along rows, B flows south along columns, accumulators drain
// toward the last row (flush-B) or the last column (flush-A).

use super::pe::{AccMode, CellInput, ComputeCell, Control};
use super::params::CoreParams;
use crate::builtin::Module;

/// Per-cycle inputs of the array: one operand per row lane and per column lane,
/// already skewed.
#[derive(Debug, Clone)]
pub struct ArrayInput {
  pub ctrl: Control,
  /// A lanes, entering column 0 of each row
  pub a: Vec<i64>,
  /// B lanes, entering row 0 of each column
  pub b: Vec<i64>,
}

/// L×L systolic compute array
#[derive(Debug, Clone)]
pub struct ComputeArray {
  name: String,
  edge: usize,
  zero_boundary: bool,
  /// Row-major cell arena, index `row * edge + col`
  cells: Vec<ComputeCell>,
}

impl ComputeArray {
  pub fn new(name: impl Into<String>, params: &CoreParams) -> Self {
    let edge = params.edge;
    let cells = (0..edge * edge)
      .map(|_| ComputeCell::new(params.in_width, params.out_width))
      .collect();
    Self {
      name: name.into(),
      edge,
      zero_boundary: params.zero_boundary,
      cells,
    }
  }

  pub fn edge(&self) -> usize {
    self.edge
  }

  pub fn cell(&self, row: usize, col: usize) -> &ComputeCell {
    &self.cells[row * self.edge + col]
  }

  /// Accumulators of the last row, one per column.
  pub fn last_row(&self) -> Vec<i64> {
    (0..self.edge).map(|col| self.cell(self.edge - 1, col).acc()).collect()
  }

  /// Accumulators of the last column, one per row.
  pub fn last_col(&self) -> Vec<i64> {
    (0..self.edge).map(|row| self.cell(row, self.edge - 1).acc()).collect()
  }

  /// Externally visible result vector for `mode`.
  pub fn result(&self, mode: AccMode) -> Vec<i64> {
    match mode {
      AccMode::FlushA => self.last_col(),
      _ => self.last_row(),
    }
  }

  /// Snapshot of every accumulator, row-major.
  pub fn accumulators(&self) -> Vec<Vec<i64>> {
    (0..self.edge)
      .map(|row| (0..self.edge).map(|col| self.cell(row, col).acc()).collect())
      .collect()
  }

  // Upstream accumulator seen by column 0 along axis A. Aliases the array's
  // own last column unless a zero boundary is configured.
  fn west_boundary(&self, row: usize) -> i64 {
    if self.zero_boundary {
      0
    } else {
      self.cell(row, self.edge - 1).acc()
    }
  }

  fn north_boundary(&self, col: usize) -> i64 {
    if self.zero_boundary {
      0
    } else {
      self.cell(self.edge - 1, col).acc()
    }
  }

  fn cell_input(&self, input: &ArrayInput, row: usize, col: usize) -> CellInput {
    let (a, acc_west) = if col == 0 {
      (input.a[row], self.west_boundary(row))
    } else {
      let west = self.cell(row, col - 1);
      (west.a_out(), west.acc())
    };
    let (b, acc_north) = if row == 0 {
      (input.b[col], self.north_boundary(col))
    } else {
      let north = self.cell(row - 1, col);
      (north.b_out(), north.acc())
    };
    CellInput {
      ctrl: input.ctrl,
      a,
      b,
      acc_west,
      acc_north,
    }
  }
}

impl Module for ComputeArray {
  type Input = ArrayInput;

  fn run(&mut self, input: &ArrayInput) {
    // resolve every cell's inputs from the committed grid before touching any cell
    let inputs: Vec<CellInput> = (0..self.edge * self.edge)
      .map(|idx| self.cell_input(input, idx / self.edge, idx % self.edge))
      .collect();
    for (cell, cell_input) in self.cells.iter_mut().zip(inputs.iter()) {
      cell.run(cell_input);
    }
  }

  fn commit(&mut self) {
    self.cells.iter_mut().for_each(ComputeCell::commit);
  }

  fn reset(&mut self) {
    self.cells.iter_mut().for_each(ComputeCell::reset);
  }

  fn name(&self) -> &str {
    &self.name
  }
}
