mod conv;
mod dense;

pub use conv::ConvLayer;
pub use dense::DenseLayer;
