use ndarray::{Array4, ArrayView4, s};

use crate::{MlErr, Result};

/// Window or stride along `(batch, height, width, channel)`.
pub type Window = [usize; 4];

/// 2x2 spatial window, also used as its stride.
pub const POOL_2X2: Window = [1, 2, 2, 1];

/// Max pooling over a `(batch, height, width, channel)` tensor.
///
/// Output axis `i` has `x.shape()[i] / strides[i]` elements; the window of an output coordinate
/// starts at `coordinate * strides` and is clipped at the end of the tensor.
///
/// # Arguments
/// * `x` - The tensor to pool.
/// * `window` - Window extent per axis.
/// * `strides` - Step between consecutive windows per axis.
///
/// # Returns
/// The pooled tensor, or an error if a window or stride is zero.
pub fn max_pool(x: ArrayView4<f32>, window: Window, strides: Window) -> Result<Array4<f32>> {
    if window.contains(&0) {
        return Err(MlErr::InvalidArgument(format!(
            "pooling window {window:?} is empty along some axis"
        )));
    }

    if strides.contains(&0) {
        return Err(MlErr::InvalidArgument(format!(
            "pooling strides {strides:?} contain a zero"
        )));
    }

    let shape = x.shape();
    let out_dim = (
        shape[0] / strides[0],
        shape[1] / strides[1],
        shape[2] / strides[2],
        shape[3] / strides[3],
    );
    let end = |axis: usize, start: usize| (start + window[axis]).min(shape[axis]);

    let out = Array4::from_shape_fn(out_dim, |(i0, i1, i2, i3)| {
        let (j0, j1, j2, j3) = (
            i0 * strides[0],
            i1 * strides[1],
            i2 * strides[2],
            i3 * strides[3],
        );

        x.slice(s![
            j0..end(0, j0),
            j1..end(1, j1),
            j2..end(2, j2),
            j3..end(3, j3)
        ])
        .fold(f32::NEG_INFINITY, |max, &v| max.max(v))
    });

    Ok(out)
}

/// Max pooling with a 2x2 window and stride 2 over the spatial axes.
pub fn max_pool_2x2(x: ArrayView4<f32>) -> Result<Array4<f32>> {
    max_pool(x, POOL_2X2, POOL_2X2)
}
