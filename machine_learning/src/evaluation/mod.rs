mod evaluator;
mod scoring;

pub use evaluator::{BatchPlan, Evaluator, TailPolicy};
pub use scoring::{argmax, correct_count, error_rate};
