use serde::{Deserialize, Serialize};

use super::layers::{ConvLayer, DenseLayer};
use crate::{MlErr, Result};

/// Sizes of the fixed two-convolution, two-dense classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetShape {
    /// Height and width of the square input images, must be divisible by 4.
    pub image_size: usize,
    pub num_channels: usize,
    pub num_labels: usize,
    /// Height and width of both convolution kernels.
    pub kernel_size: usize,
    pub conv1_filters: usize,
    pub conv2_filters: usize,
    pub fc1_units: usize,
}

impl NetShape {
    /// The MNIST classifier: 28x28 grayscale images and 10 labels.
    pub fn mnist() -> Self {
        Self {
            image_size: 28,
            num_channels: 1,
            num_labels: 10,
            kernel_size: 5,
            conv1_filters: 32,
            conv2_filters: 64,
            fc1_units: 512,
        }
    }

    pub fn conv1_weights(&self) -> (usize, usize, usize, usize) {
        let k = self.kernel_size;
        (k, k, self.num_channels, self.conv1_filters)
    }

    pub fn conv2_weights(&self) -> (usize, usize, usize, usize) {
        let k = self.kernel_size;
        (k, k, self.conv1_filters, self.conv2_filters)
    }

    /// Number of features left after both pooling steps.
    pub fn fc1_in_features(&self) -> usize {
        let side = self.image_size / 4;
        side * side * self.conv2_filters
    }

    pub fn fc1_weights(&self) -> (usize, usize) {
        (self.fc1_in_features(), self.fc1_units)
    }

    pub fn fc2_weights(&self) -> (usize, usize) {
        (self.fc1_units, self.num_labels)
    }
}

impl Default for NetShape {
    fn default() -> Self {
        Self::mnist()
    }
}

/// The parameters of the classifier, in layer order: conv1, conv2, fc1, fc2.
///
/// Built once through [`ConvNetParams::new`], which checks every tensor against a [`NetShape`],
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ConvNetParams {
    shape: NetShape,
    conv1: ConvLayer,
    conv2: ConvLayer,
    fc1: DenseLayer,
    fc2: DenseLayer,
}

impl ConvNetParams {
    /// Creates a new `ConvNetParams`.
    ///
    /// # Arguments
    /// * `shape` - The sizes every layer must agree with.
    /// * `conv1`, `conv2` - The convolution layers.
    /// * `fc1`, `fc2` - The fully connected layers.
    ///
    /// # Returns
    /// The parameters or a `ShapeMismatch` naming the first offending tensor.
    pub fn new(
        shape: NetShape,
        conv1: ConvLayer,
        conv2: ConvLayer,
        fc1: DenseLayer,
        fc2: DenseLayer,
    ) -> Result<Self> {
        if shape.image_size % 4 != 0 {
            return Err(MlErr::InvalidArgument(format!(
                "image size {} is not divisible by 4",
                shape.image_size
            )));
        }

        check_dims("conv1 weights", conv1.weights().shape(), &tuple4(shape.conv1_weights()))?;
        check_dims("conv2 weights", conv2.weights().shape(), &tuple4(shape.conv2_weights()))?;
        check_dims("fc1 weights", fc1.weights().shape(), &tuple2(shape.fc1_weights()))?;
        check_dims("fc2 weights", fc2.weights().shape(), &tuple2(shape.fc2_weights()))?;

        Ok(Self {
            shape,
            conv1,
            conv2,
            fc1,
            fc2,
        })
    }

    pub fn shape(&self) -> &NetShape {
        &self.shape
    }

    pub fn conv1(&self) -> &ConvLayer {
        &self.conv1
    }

    pub fn conv2(&self) -> &ConvLayer {
        &self.conv2
    }

    pub fn fc1(&self) -> &DenseLayer {
        &self.fc1
    }

    pub fn fc2(&self) -> &DenseLayer {
        &self.fc2
    }
}

fn tuple4(dim: (usize, usize, usize, usize)) -> [usize; 4] {
    [dim.0, dim.1, dim.2, dim.3]
}

fn tuple2(dim: (usize, usize)) -> [usize; 2] {
    [dim.0, dim.1]
}

/// Compares two shapes axis by axis, reporting the first axis that differs.
fn check_dims(what: &'static str, got: &[usize], expected: &[usize]) -> Result<()> {
    if got.len() != expected.len() {
        return Err(MlErr::ShapeMismatch {
            what,
            got: got.len(),
            expected: expected.len(),
        });
    }

    match got.iter().zip(expected).find(|(g, e)| g != e) {
        Some((&got, &expected)) => Err(MlErr::ShapeMismatch {
            what,
            got,
            expected,
        }),
        None => Ok(()),
    }
}
