pub mod errors;
pub mod telemetry;

pub use errors::*;
