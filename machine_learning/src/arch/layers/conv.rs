use ndarray::{Array1, Array4, ArrayView4};

use crate::{
    MlErr, Result,
    arch::ops::{ConvStrategy, Padding, UNIT_STRIDES},
};

/// A convolution layer: a `(k_height, k_width, in_channels, out_channels)` kernel and one bias
/// per output channel.
#[derive(Debug, Clone)]
pub struct ConvLayer {
    weights: Array4<f32>,
    biases: Array1<f32>,
}

impl ConvLayer {
    /// Creates a new `ConvLayer`.
    ///
    /// # Arguments
    /// * `weights` - The kernel.
    /// * `biases` - The biases, as many as output channels.
    ///
    /// # Returns
    /// The layer or an error if the biases don't match the kernel.
    pub fn new(weights: Array4<f32>, biases: Array1<f32>) -> Result<Self> {
        let out_channels = weights.dim().3;
        if biases.len() != out_channels {
            return Err(MlErr::ShapeMismatch {
                what: "convolution biases",
                got: biases.len(),
                expected: out_channels,
            });
        }

        Ok(Self { weights, biases })
    }

    pub fn weights(&self) -> &Array4<f32> {
        &self.weights
    }

    pub fn biases(&self) -> &Array1<f32> {
        &self.biases
    }

    /// Convolves `x` with unit strides and `Same` padding.
    pub fn forward(&self, x: ArrayView4<f32>, strategy: ConvStrategy) -> Result<Array4<f32>> {
        strategy.apply(
            self.weights.view(),
            self.biases.view(),
            x,
            Padding::Same,
            UNIT_STRIDES,
        )
    }
}
