use ndarray::{Array1, Array2, ArrayView, Dimension};

use crate::{MlErr, Result, arch::ops};

/// A fully connected layer: an `(in_features, out_features)` matrix and one bias per output.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Array2<f32>,
    biases: Array1<f32>,
}

impl DenseLayer {
    /// Creates a new `DenseLayer`.
    ///
    /// # Arguments
    /// * `weights` - The weight matrix.
    /// * `biases` - The biases, as many as output features.
    ///
    /// # Returns
    /// The layer or an error if the biases don't match the weights.
    pub fn new(weights: Array2<f32>, biases: Array1<f32>) -> Result<Self> {
        if biases.len() != weights.ncols() {
            return Err(MlErr::ShapeMismatch {
                what: "dense biases",
                got: biases.len(),
                expected: weights.ncols(),
            });
        }

        Ok(Self { weights, biases })
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    pub fn biases(&self) -> &Array1<f32> {
        &self.biases
    }

    pub fn forward<D: Dimension>(&self, x: ArrayView<f32, D>) -> Result<Array2<f32>> {
        ops::dense(self.weights.view(), self.biases.view(), x)
    }
}
