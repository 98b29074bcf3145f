use serde::{Deserialize, Serialize};

use super::params::bit_mask;
use crate::builtin::{Module, Reg};

/// Wrap point of a tick counter, sampled every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ceiling {
  /// Wraps to 0 after `ceiling - 1`. Zero is not a valid ceiling.
  Bounded(u64),
  /// No wrap point; at-ceiling fires when every bit of the counter is set.
  Unbounded,
}

/// Per-cycle inputs of a tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterInput {
  pub enable: bool,
  pub clear: bool,
  pub ceiling: Ceiling,
}

impl CounterInput {
  pub fn tick(ceiling: Ceiling) -> Self {
    Self {
      enable: true,
      clear: false,
      ceiling,
    }
  }

  pub fn idle(ceiling: Ceiling) -> Self {
    Self {
      enable: false,
      clear: false,
      ceiling,
    }
  }
}

/// Bounded cycle counter with an at-ceiling pulse.
#[derive(Debug, Clone)]
pub struct TickCounter {
  name: String,
  width: u32,
  value: Reg<u64>,
}

impl TickCounter {
  /// Create a counter `width` bits wide.
  pub fn new(name: impl Into<String>, width: u32) -> Self {
    Self {
      name: name.into(),
      width,
      value: Reg::new(0),
    }
  }

  pub fn value(&self) -> u64 {
    self.value.value()
  }

  /// One-cycle pulse: the next enabled increment wraps.
  pub fn at_ceiling(&self, enable: bool, ceiling: Ceiling) -> bool {
    if !enable {
      return false;
    }
    match ceiling {
      Ceiling::Bounded(limit) => self.value() == limit.wrapping_sub(1),
      Ceiling::Unbounded => self.value() == bit_mask(self.width),
    }
  }
}

impl Module for TickCounter {
  type Input = CounterInput;

  fn run(&mut self, input: &CounterInput) {
    if input.clear {
      self.value.set(0);
    } else if input.enable {
      let next = if self.at_ceiling(true, input.ceiling) {
        0
      } else {
        self.value().wrapping_add(1) & bit_mask(self.width)
      };
      self.value.set(next);
    }
  }

  fn commit(&mut self) {
    self.value.commit();
  }

  fn reset(&mut self) {
    self.value.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn step(counter: &mut TickCounter, input: CounterInput) -> bool {
    let pulse = counter.at_ceiling(input.enable, input.ceiling);
    counter.run(&input);
    counter.commit();
    pulse
  }

  #[test]
  fn test_wraps_on_ceiling() {
    let mut counter = TickCounter::new("k", 32);
    let ceiling = Ceiling::Bounded(3);
    let mut pulses = Vec::new();
    let mut values = Vec::new();
    for _ in 0..7 {
      values.push(counter.value());
      pulses.push(step(&mut counter, CounterInput::tick(ceiling)));
    }
    assert_eq!(values, vec![0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(pulses, vec![false, false, true, false, false, true, false]);
  }

  #[test]
  fn test_pulse_requires_enable() {
    let mut counter = TickCounter::new("m", 32);
    let ceiling = Ceiling::Bounded(1);
    assert!(!counter.at_ceiling(false, ceiling));
    assert!(counter.at_ceiling(true, ceiling));

    // holding without enable keeps the value
    step(&mut counter, CounterInput::idle(ceiling));
    assert_eq!(counter.value(), 0);
  }

  #[test]
  fn test_clear_wins_over_enable() {
    let mut counter = TickCounter::new("flush", 32);
    let ceiling = Ceiling::Bounded(8);
    for _ in 0..5 {
      step(&mut counter, CounterInput::tick(ceiling));
    }
    assert_eq!(counter.value(), 5);
    step(
      &mut counter,
      CounterInput {
        enable: true,
        clear: true,
        ceiling,
      },
    );
    assert_eq!(counter.value(), 0);

    counter.run(&CounterInput::tick(ceiling));
    counter.reset();
    counter.commit();
    assert_eq!(counter.value(), 0);
  }

  #[test]
  fn test_ceiling_sampled_every_cycle() {
    let mut counter = TickCounter::new("k", 32);
    step(&mut counter, CounterInput::tick(Ceiling::Bounded(8)));
    step(&mut counter, CounterInput::tick(Ceiling::Bounded(8)));
    assert_eq!(counter.value(), 2);
    // lowering the ceiling takes effect immediately
    assert!(step(&mut counter, CounterInput::tick(Ceiling::Bounded(3))));
    assert_eq!(counter.value(), 0);
  }

  #[test]
  fn test_unbounded_fires_when_all_bits_set() {
    let mut counter = TickCounter::new("cycles", 3);
    let mut pulses = Vec::new();
    for _ in 0..9 {
      pulses.push(step(&mut counter, CounterInput::tick(Ceiling::Unbounded)));
    }
    // 0..=7 then wraps to 0
    assert_eq!(pulses.iter().filter(|&&p| p).count(), 1);
    assert!(pulses[7]);
    assert_eq!(counter.value(), 1);
  }
}
