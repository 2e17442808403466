//! Tensor primitives of the forward pass.
//!
//! Every function here borrows its inputs and allocates a fresh output, so they can be called
//! from several threads over the same model at once.

mod activation;
mod conv;
mod dense;
mod output;
mod padding;
mod pool;

pub use activation::relu;
pub use conv::{ConvStrategy, Strides, UNIT_STRIDES, conv2d, conv2d_direct};
pub use dense::dense;
pub use output::OutputFn;
pub use padding::{Padding, pad};
pub use pool::{POOL_2X2, Window, max_pool, max_pool_2x2};
