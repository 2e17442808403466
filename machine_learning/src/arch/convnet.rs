use ndarray::{Array2, ArrayView4};

use super::{
    ConvNetParams, NetShape,
    ops::{ConvStrategy, OutputFn, max_pool_2x2, relu},
};
use crate::{MlErr, Result};

/// The classifier's forward pass:
///
/// ```text
/// conv1 -> relu -> maxpool 2x2 -> conv2 -> relu -> maxpool 2x2 -> fc1 -> relu -> fc2 -> output
/// ```
///
/// `forward` only borrows the parameters, so a single `ConvNet` can serve many threads.
#[derive(Debug, Clone)]
pub struct ConvNet {
    params: ConvNetParams,
    strategy: ConvStrategy,
    output: OutputFn,
}

impl ConvNet {
    /// Creates a new `ConvNet` using the correlation convolution and raw scores as output.
    pub fn new(params: ConvNetParams) -> Self {
        Self {
            params,
            strategy: ConvStrategy::default(),
            output: OutputFn::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ConvStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_output(mut self, output: OutputFn) -> Self {
        self.output = output;
        self
    }

    pub fn shape(&self) -> &NetShape {
        self.params.shape()
    }

    pub fn params(&self) -> &ConvNetParams {
        &self.params
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - A `(batch, image_size, image_size, num_channels)` batch, of any batch size.
    ///
    /// # Returns
    /// A `(batch, num_labels)` matrix of scores or an error if `x` doesn't fit the network.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array2<f32>> {
        self.check_input(&x)?;

        let p = &self.params;

        let out = p.conv1().forward(x, self.strategy)?;
        let out = relu(out.view());
        let out = max_pool_2x2(out.view())?;

        let out = p.conv2().forward(out.view(), self.strategy)?;
        let out = relu(out.view());
        let out = max_pool_2x2(out.view())?;

        let out = p.fc1().forward(out.view())?;
        let out = relu(out.view());

        let out = p.fc2().forward(out.view())?;
        Ok(self.output.apply(out))
    }

    fn check_input(&self, x: &ArrayView4<f32>) -> Result<()> {
        let shape = self.shape();
        let (_, height, width, channels) = x.dim();

        for (what, got, expected) in [
            ("input height", height, shape.image_size),
            ("input width", width, shape.image_size),
            ("input channels", channels, shape.num_channels),
        ] {
            if got != expected {
                return Err(MlErr::ShapeMismatch {
                    what,
                    got,
                    expected,
                });
            }
        }

        Ok(())
    }
}
