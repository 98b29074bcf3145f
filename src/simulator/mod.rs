pub mod config;
pub mod sim;
pub mod simulator;
pub mod trace;
pub mod utils;

pub use self::simulator::{RunOutcome, Simulator};
pub use utils::log;
