use ndarray::{Array, ArrayView, Dimension};

/// Rectified linear unit, `max(x, 0)` elementwise.
pub fn relu<D: Dimension>(x: ArrayView<f32, D>) -> Array<f32, D> {
    x.mapv(|v| v.max(0.0))
}
