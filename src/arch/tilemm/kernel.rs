use std::ops::Range;

use super::mesh::{ArrayInput, ComputeArray};
use super::params::CoreParams;
use super::pe::Control;
use super::skew::SkewBank;
use crate::builtin::Module;

/// Per-cycle inputs of one kernel.
#[derive(Debug, Clone)]
pub struct KernelInput {
  pub ctrl: Control,
  /// Shared A lanes, already skewed
  pub a: Vec<i64>,
  /// This kernel's slice of the B word, not yet skewed
  pub b: Vec<i64>,
}

/// One compute array plus its private B skew lines.
///
/// Kernel `index` owns lanes `index*L..(index+1)*L` of every B and C word,
/// which is a disjoint slice of the N dimension.
#[derive(Debug, Clone)]
pub struct Kernel {
  name: String,
  index: usize,
  edge: usize,
  kernels: usize,
  b_skew: SkewBank,
  array: ComputeArray,
}

impl Kernel {
  pub fn new(index: usize, params: &CoreParams) -> Self {
    let name = format!("kernel{}", index);
    Self {
      b_skew: SkewBank::new(format!("{}.b_skew", name), params.edge),
      array: ComputeArray::new(format!("{}.array", name), params),
      name,
      index,
      edge: params.edge,
      kernels: params.kernels,
    }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn array(&self) -> &ComputeArray {
    &self.array
  }

  /// Lanes of a B/C word that belong to this kernel.
  pub fn word_lanes(&self) -> Range<usize> {
    self.index * self.edge..(self.index + 1) * self.edge
  }

  /// Global N columns this kernel computes while the N loop sits at `n_tile`.
  pub fn columns(&self, n_tile: usize) -> Range<usize> {
    let base = (n_tile * self.kernels + self.index) * self.edge;
    base..base + self.edge
  }

  /// Drained result vector for this cycle.
  pub fn result(&self, ctrl: &Control) -> Vec<i64> {
    self.array.result(ctrl.mode)
  }
}

impl Module for Kernel {
  type Input = KernelInput;

  fn run(&mut self, input: &KernelInput) {
    let b = self.b_skew.output(&input.b);
    self.b_skew.run(&input.b);
    self.array.run(&ArrayInput {
      ctrl: input.ctrl,
      a: input.a.clone(),
      b,
    });
  }

  fn commit(&mut self) {
    self.b_skew.commit();
    self.array.commit();
  }

  fn reset(&mut self) {
    self.b_skew.reset();
    self.array.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}
