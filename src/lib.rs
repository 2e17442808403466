pub mod config;
pub mod error;
pub mod inference;
pub mod loader;

pub use config::InferenceConfig;
pub use error::{LoadErr, Result};
pub use inference::{Report, run};
