//! Tiled multi-kernel systolic matmul core.
//!
//! Blocks are built bottom-up: tick counters and skew lines, the compute
//! cell and array, a kernel (array plus B skew lines), the tile controller
//! with its address generation, and finally [`MatmulCore`] which wires them
//! to the A/B/C memories.

pub mod addr;
pub mod controller;
pub mod counter;
pub mod engine;
pub mod kernel;
pub mod memory;
pub mod mesh;
pub mod params;
pub mod pe;
pub mod skew;
pub mod top;

pub use controller::{ControlSignals, Phase, TileController};
pub use engine::{DoneReport, MatmulEngine};
pub use memory::{pack_a, pack_b, unpack_c, Matrix, MemorySet, WordMemory};
pub use params::{CoreParams, Dims};
pub use pe::{AccMode, Control};
pub use top::{MatmulCore, RunStats, TickReport};
