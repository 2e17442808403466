use ndarray::{Array2, ArrayView, ArrayView1, ArrayView2, Axis, Dimension, linalg};

use crate::{MlErr, Result};

/// Fully connected projection, `flatten(x) · weights + biases`.
///
/// # Arguments
/// * `weights` - Matrix of shape `(in_features, out_features)`.
/// * `biases` - One bias per output feature.
/// * `x` - A tensor whose first axis is the batch; the remaining axes are flattened in row
///   major order and must hold `in_features` values.
///
/// # Returns
/// A `(batch, out_features)` matrix or a shape mismatch error.
pub fn dense<D: Dimension>(
    weights: ArrayView2<f32>,
    biases: ArrayView1<f32>,
    x: ArrayView<f32, D>,
) -> Result<Array2<f32>> {
    if x.ndim() == 0 {
        return Err(MlErr::InvalidArgument(
            "dense input needs a batch axis".to_string(),
        ));
    }

    let batch = x.len_of(Axis(0));
    let features: usize = x.shape()[1..].iter().product();
    let (in_features, out_features) = weights.dim();

    if features != in_features {
        return Err(MlErr::ShapeMismatch {
            what: "dense input features",
            got: features,
            expected: in_features,
        });
    }

    if biases.len() != out_features {
        return Err(MlErr::ShapeMismatch {
            what: "dense biases",
            got: biases.len(),
            expected: out_features,
        });
    }

    let flat = x
        .to_shape((batch, features))
        .map_err(|_| MlErr::ShapeMismatch {
            what: "dense flattened input",
            got: x.len(),
            expected: batch * features,
        })?;

    let mut z = Array2::zeros((batch, out_features));
    linalg::general_mat_mul(1.0, &flat, &weights, 0.0, &mut z);
    z += &biases;

    Ok(z)
}
