use serde::{Deserialize, Serialize};

use super::params::{CoreParams, Dims};
use crate::error::{Result, SysError};

/// Row-major integer matrix.
pub type Matrix = Vec<Vec<i64>>;

/// Word-addressable memory with one combinational read port and one write port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordMemory {
  word_len: usize,
  words: Vec<Vec<i64>>,
}

impl WordMemory {
  pub fn new(word_len: usize, depth: usize) -> Self {
    Self {
      word_len,
      words: vec![vec![0; word_len]; depth],
    }
  }

  pub fn word_len(&self) -> usize {
    self.word_len
  }

  pub fn depth(&self) -> usize {
    self.words.len()
  }

  /// Out-of-range reads return a zero word.
  pub fn read(&self, addr: u64) -> Vec<i64> {
    match self.words.get(addr as usize) {
      Some(word) => word.clone(),
      None => vec![0; self.word_len],
    }
  }

  /// Out-of-range writes are dropped.
  pub fn write(&mut self, addr: u64, word: &[i64]) {
    if let Some(slot) = self.words.get_mut(addr as usize) {
      slot.clear();
      slot.extend_from_slice(word);
      slot.resize(self.word_len, 0);
    }
  }

  pub fn words(&self) -> &[Vec<i64>] {
    &self.words
  }
}

/// The three memories the core talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySet {
  /// L operands per word
  pub a: WordMemory,
  /// L*kernels operands per word
  pub b: WordMemory,
  /// L*kernels accumulators per word
  pub c: WordMemory,
}

impl MemorySet {
  /// Memories sized exactly for one run of `dims`.
  pub fn for_run(params: &CoreParams, dims: &Dims) -> Self {
    let wide = params.tile_cols();
    Self {
      a: WordMemory::new(params.edge, dims.m_tiles(params) * dims.k),
      b: WordMemory::new(wide, dims.n_tiles(params) * dims.k),
      c: WordMemory::new(wide, dims.m * dims.n / wide),
    }
  }

  /// Pack `a` and `b` into freshly sized memories.
  pub fn load(params: &CoreParams, dims: &Dims, a: &Matrix, b: &Matrix) -> Result<Self> {
    check_shape("A", a, dims.m, dims.k)?;
    check_shape("B", b, dims.k, dims.n)?;
    let mut mem = Self::for_run(params, dims);
    pack_a(&mut mem.a, params, dims, a);
    pack_b(&mut mem.b, params, dims, b);
    Ok(mem)
  }
}

fn check_shape(label: &str, matrix: &Matrix, rows: usize, cols: usize) -> Result<()> {
  if matrix.len() != rows || matrix.iter().any(|row| row.len() != cols) {
    return Err(SysError::shape_mismatch(format!(
      "{} must be {}x{}, got {} rows",
      label,
      rows,
      cols,
      matrix.len()
    )));
  }
  Ok(())
}

/// A word `m_tile + k*(M/L)`, lane r = `A[m_tile*L + r][k]`.
pub fn pack_a(mem: &mut WordMemory, params: &CoreParams, dims: &Dims, a: &Matrix) {
  let edge = params.edge;
  let m_tiles = dims.m_tiles(params);
  for k in 0..dims.k {
    for m_tile in 0..m_tiles {
      let word: Vec<i64> = (0..edge).map(|r| a[m_tile * edge + r][k]).collect();
      mem.write((m_tile + k * m_tiles) as u64, &word);
    }
  }
}

/// B word `n_tile + k*(N/(L*kernels))`, lane `j*L + c` = `B[k][(n_tile*kernels + j)*L + c]`.
pub fn pack_b(mem: &mut WordMemory, params: &CoreParams, dims: &Dims, b: &Matrix) {
  let tile_cols = params.tile_cols();
  let n_tiles = dims.n_tiles(params);
  for k in 0..dims.k {
    for n_tile in 0..n_tiles {
      let base = n_tile * tile_cols;
      mem.write((n_tile + k * n_tiles) as u64, &b[k][base..base + tile_cols]);
    }
  }
}

/// Inverse of the C layout: word `n_tile + row*(N/(L*kernels))`.
pub fn unpack_c(mem: &WordMemory, params: &CoreParams, dims: &Dims) -> Matrix {
  let n_tiles = dims.n_tiles(params);
  (0..dims.m)
    .map(|row| {
      (0..n_tiles)
        .flat_map(|n_tile| mem.read((n_tile + row * n_tiles) as u64))
        .collect()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_word_memory_bounds() {
    let mut mem = WordMemory::new(4, 2);
    mem.write(1, &[1, 2, 3, 4]);
    assert_eq!(mem.read(1), vec![1, 2, 3, 4]);
    assert_eq!(mem.read(7), vec![0; 4]); // Out of bounds
    mem.write(9, &[5, 5, 5, 5]);
    assert_eq!(mem.words().len(), 2);
  }

  #[test]
  fn test_layouts() {
    let params = CoreParams {
      edge: 2,
      kernels: 2,
      ..CoreParams::default()
    };
    let dims = Dims::new(4, 2, 8);
    let a: Matrix = (0..4).map(|r| (0..2).map(|k| (r * 10 + k) as i64).collect()).collect();
    let b: Matrix = (0..2).map(|k| (0..8).map(|c| (k * 100 + c) as i64).collect()).collect();
    let mem = MemorySet::load(&params, &dims, &a, &b).unwrap();

    // M/L = 2 words per k
    assert_eq!(mem.a.read(0), vec![0, 10]);
    assert_eq!(mem.a.read(1), vec![20, 30]);
    assert_eq!(mem.a.read(3), vec![21, 31]);
    // N/(L*kernels) = 2 words per k
    assert_eq!(mem.b.read(1), vec![4, 5, 6, 7]);
    assert_eq!(mem.b.read(2), vec![100, 101, 102, 103]);
    assert_eq!(mem.c.depth(), 8);
  }

  #[test]
  fn test_word_widths_follow_tile_shape() {
    let params = CoreParams {
      edge: 3,
      kernels: 2,
      ..CoreParams::default()
    };
    let mem = MemorySet::for_run(&params, &Dims::new(6, 4, 12));
    assert_eq!(mem.a.word_len(), params.edge);
    assert_eq!(mem.b.word_len(), params.tile_cols());
    assert_eq!(mem.c.word_len(), 6);
    // 6 rows, 12 / 6 words per row
    assert_eq!(mem.c.depth(), 12);
  }

  #[test]
  fn test_unpack_c() {
    let params = CoreParams {
      edge: 2,
      kernels: 1,
      ..CoreParams::default()
    };
    let dims = Dims::new(2, 1, 4);
    let mut c = WordMemory::new(2, 4);
    // word n_tile + row * 2
    c.write(0, &[1, 2]);
    c.write(1, &[3, 4]);
    c.write(2, &[5, 6]);
    c.write(3, &[7, 8]);
    assert_eq!(unpack_c(&c, &params, &dims), vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
  }

  #[test]
  fn test_shape_mismatch() {
    let params = CoreParams::default();
    let dims = Dims::new(4, 2, 16);
    let a: Matrix = vec![vec![0; 2]; 3];
    let b: Matrix = vec![vec![0; 16]; 2];
    assert!(MemorySet::load(&params, &dims, &a, &b).is_err());
  }
}
