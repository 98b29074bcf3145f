pub mod arch;
pub mod builtin;
pub mod error;
pub mod simulator;

pub use arch::tilemm::{CoreParams, Dims, MatmulCore, Matrix, MemorySet, RunStats};
pub use error::{Result, SysError};
pub use simulator::{RunOutcome, Simulator};
