pub mod arch;
pub mod error;
pub mod evaluation;

pub use error::{MlErr, Result};
