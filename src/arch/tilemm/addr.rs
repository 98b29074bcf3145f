use super::params::{CoreParams, Dims};

/// Combinational address generation for the three memory streams.
///
/// A word `m_tile + k*(M/L)` carries column k of the A tile, B word
/// `n_tile + k*(N/(L*kernels))` carries row k of the B tile for every kernel,
/// and C word `n_tile + row*(N/(L*kernels))` carries one output row across
/// every kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMap {
  edge: u64,
  m_tiles: u64,
  n_tiles: u64,
  mask: u64,
}

impl AddressMap {
  pub fn new(params: &CoreParams, dims: &Dims) -> Self {
    Self {
      edge: params.edge as u64,
      m_tiles: dims.m_tiles(params) as u64,
      n_tiles: dims.n_tiles(params) as u64,
      mask: params.addr_mask(),
    }
  }

  /// Shared A stream, broadcast to every kernel.
  pub fn a_source(&self, m_tile: u64, k: u64) -> u64 {
    m_tile.wrapping_add(k.wrapping_mul(self.m_tiles)) & self.mask
  }

  /// B stream; each kernel reads its own lanes of this word.
  pub fn b_source(&self, n_tile: u64, k: u64) -> u64 {
    n_tile.wrapping_add(k.wrapping_mul(self.n_tiles)) & self.mask
  }

  /// Tile row drained on flush cycle `flush_offset`. The last row reaches the
  /// drain boundary first. Offsets past the flush window clamp to row 0.
  pub fn drain_row(&self, flush_offset: u64) -> u64 {
    (self.edge - 1).saturating_sub(flush_offset)
  }

  /// C destination from the captured tile coordinates.
  pub fn c_dest(&self, captured_n: u64, captured_m: u64, flush_offset: u64) -> u64 {
    let row = captured_m.wrapping_mul(self.edge).wrapping_add(self.drain_row(flush_offset));
    captured_n.wrapping_add(row.wrapping_mul(self.n_tiles)) & self.mask
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_source_addresses_walk_k() {
    let params = CoreParams::default();
    let map = AddressMap::new(&params, &Dims::new(8, 16, 64));
    // M/L = 2, N/(L*kernels) = 4
    assert_eq!(map.a_source(0, 0), 0);
    assert_eq!(map.a_source(1, 0), 1);
    assert_eq!(map.a_source(1, 3), 7);
    assert_eq!(map.b_source(3, 0), 3);
    assert_eq!(map.b_source(2, 5), 22);
  }

  #[test]
  fn test_destinations_cover_c_once() {
    let params = CoreParams::default();
    let dims = Dims::new(8, 4, 32);
    let map = AddressMap::new(&params, &dims);
    let mut seen = HashSet::new();
    for n in 0..dims.n_tiles(&params) as u64 {
      for m in 0..dims.m_tiles(&params) as u64 {
        for offset in 0..params.edge as u64 {
          assert!(seen.insert(map.c_dest(n, m, offset)));
        }
      }
    }
    let words = dims.m * dims.n / params.tile_cols();
    assert_eq!(seen, (0..words as u64).collect::<HashSet<_>>());
  }

  #[test]
  fn test_flush_offset_maps_rows_bottom_up() {
    let params = CoreParams::default();
    let map = AddressMap::new(&params, &Dims::new(4, 4, 16));
    let rows: Vec<u64> = (0..4).map(|offset| map.c_dest(0, 0, offset)).collect();
    assert_eq!(rows, vec![3, 2, 1, 0]);
  }

  #[test]
  fn test_drain_row_clamps_past_flush_window() {
    let params = CoreParams::default();
    let map = AddressMap::new(&params, &Dims::new(4, 4, 16));
    assert_eq!(map.drain_row(3), 0);
    assert_eq!(map.drain_row(4), 0);
    assert_eq!(map.drain_row(u64::MAX), 0);
    assert_eq!(map.c_dest(0, 0, 9), map.c_dest(0, 0, 3));
  }

  #[test]
  fn test_addresses_masked_to_bus_width() {
    let params = CoreParams {
      addr_width: 4,
      ..CoreParams::default()
    };
    let map = AddressMap::new(&params, &Dims::new(32, 4, 16));
    // 1 + 2 * 8 = 17 wraps to 1 on a 4-bit bus
    assert_eq!(map.a_source(1, 2), 1);
  }
}
