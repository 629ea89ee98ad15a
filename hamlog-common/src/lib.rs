pub mod datetime;
pub mod types;

pub use types::*;
