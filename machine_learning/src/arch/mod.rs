mod convnet;
pub mod layers;
pub mod ops;
mod params;

pub use convnet::ConvNet;
pub use params::{ConvNetParams, NetShape};
