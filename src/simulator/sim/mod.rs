pub mod mode;
pub mod records;

pub use mode::RunMode;
