pub mod port;

pub use port::{Reg, Wire};

/// A clocked hardware block.
///
/// A parent drives one cycle in two phases: `run` on every block, reading only
/// committed register values and the block's input, then `commit` on every
/// block. `run` stages next state and must never be observable before `commit`.
pub trait Module {
  type Input;

  fn run(&mut self, input: &Self::Input);

  fn commit(&mut self);

  fn reset(&mut self);

  fn name(&self) -> &str;
}
