use std::str::FromStr;

use ndarray::{Array4, ArrayView4, s};

use crate::{MlErr, Result};

/// Spatial padding applied before a convolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Padding {
    /// Zero-pads height and width by half the kernel on each side.
    #[default]
    Same,
    /// No padding at all.
    Valid,
}

impl Padding {
    /// Returns the amount of rows and columns added on each side for a kernel of shape
    /// `(k_height, k_width)`.
    pub fn amounts(self, kernel: (usize, usize)) -> (usize, usize) {
        match self {
            Padding::Same => (kernel.0 / 2, kernel.1 / 2),
            Padding::Valid => (0, 0),
        }
    }
}

impl FromStr for Padding {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SAME" => Ok(Padding::Same),
            "VALID" => Ok(Padding::Valid),
            other => Err(MlErr::InvalidArgument(format!(
                "unsupported padding mode {other:?}, expected \"SAME\" or \"VALID\""
            ))),
        }
    }
}

/// Pads every image of a `(batch, height, width, channel)` tensor with zeros.
///
/// # Arguments
/// * `x` - The batch to pad.
/// * `padding` - The padding mode, `Valid` returns a copy of `x`.
/// * `kernel` - The `(k_height, k_width)` of the kernel the padding is meant for.
///
/// # Returns
/// A new tensor with the original values at the interior offset, framed with zeros.
pub fn pad(x: ArrayView4<f32>, padding: Padding, kernel: (usize, usize)) -> Array4<f32> {
    let (p_h, p_w) = padding.amounts(kernel);
    if p_h == 0 && p_w == 0 {
        return x.to_owned();
    }

    let (batch, height, width, channels) = x.dim();
    let mut padded = Array4::zeros((batch, height + 2 * p_h, width + 2 * p_w, channels));
    padded
        .slice_mut(s![.., p_h..p_h + height, p_w..p_w + width, ..])
        .assign(&x);

    padded
}
