use crate::builtin::{Module, Reg};

/// Fixed-depth delay line. Emits the sample enqueued `depth` cycles earlier;
/// depth 0 passes the current input straight through.
#[derive(Debug, Clone)]
pub struct SkewLine {
  depth: usize,
  // stages[0] is the newest sample
  stages: Reg<Vec<i64>>,
}

impl SkewLine {
  pub fn new(depth: usize) -> Self {
    Self {
      depth,
      stages: Reg::new(vec![0; depth]),
    }
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Combinational output for this cycle's `input`.
  pub fn output(&self, input: i64) -> i64 {
    match self.stages.get().last() {
      Some(&oldest) => oldest,
      None => input,
    }
  }

  pub fn run(&mut self, input: i64) {
    if self.depth == 0 {
      return;
    }
    let cur = self.stages.get();
    let mut next = Vec::with_capacity(self.depth);
    next.push(input);
    next.extend_from_slice(&cur[..self.depth - 1]);
    self.stages.set(next);
  }

  pub fn commit(&mut self) {
    self.stages.commit();
  }

  pub fn reset(&mut self) {
    self.stages.reset();
  }
}

/// One skew line per lane, lane `i` delayed by `i` cycles, so a word entering
/// the bank leaves it as a diagonal wavefront.
#[derive(Debug, Clone)]
pub struct SkewBank {
  name: String,
  lines: Vec<SkewLine>,
}

impl SkewBank {
  pub fn new(name: impl Into<String>, lanes: usize) -> Self {
    Self {
      name: name.into(),
      lines: (0..lanes).map(SkewLine::new).collect(),
    }
  }

  pub fn lanes(&self) -> usize {
    self.lines.len()
  }

  /// Skewed lanes for this cycle's input word.
  pub fn output(&self, input: &[i64]) -> Vec<i64> {
    self
      .lines
      .iter()
      .zip(input.iter())
      .map(|(line, &sample)| line.output(sample))
      .collect()
  }
}

impl Module for SkewBank {
  type Input = Vec<i64>;

  fn run(&mut self, input: &Vec<i64>) {
    for (line, &sample) in self.lines.iter_mut().zip(input.iter()) {
      line.run(sample);
    }
  }

  fn commit(&mut self) {
    self.lines.iter_mut().for_each(SkewLine::commit);
  }

  fn reset(&mut self) {
    self.lines.iter_mut().for_each(SkewLine::reset);
  }

  fn name(&self) -> &str {
    &self.name
  }
}
