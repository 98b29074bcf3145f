#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysmm::arch::tilemm::params::sign_wrap;
use sysmm::Matrix;

pub const SEED: u64 = 0x5eed_caf3;

/// Seeded matrix with entries representable in `bits` signed bits.
pub fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize, bits: u32) -> Matrix {
  let max = (1i64 << (bits - 1)) - 1;
  let min = -(1i64 << (bits - 1));
  (0..rows)
    .map(|_| (0..cols).map(|_| rng.gen_range(min..=max)).collect())
    .collect()
}

pub fn rng() -> StdRng {
  StdRng::seed_from_u64(SEED)
}

/// Triple-loop reference with the same operand and accumulator wraparound
/// as the hardware.
pub fn golden_matmul(a: &Matrix, b: &Matrix, in_width: u32, out_width: u32) -> Matrix {
  let (m, k, n) = (a.len(), b.len(), b[0].len());
  let mut c = vec![vec![0i64; n]; m];
  for i in 0..m {
    for j in 0..n {
      let mut acc = 0i64;
      for x in 0..k {
        let product = sign_wrap(a[i][x], in_width).wrapping_mul(sign_wrap(b[x][j], in_width));
        acc = sign_wrap(acc.wrapping_add(product), out_width);
      }
      c[i][j] = acc;
    }
  }
  c
}
