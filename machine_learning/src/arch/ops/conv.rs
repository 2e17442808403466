use std::ops::Range;

use ndarray::{Array4, ArrayView1, ArrayView4, Zip, linalg, s};
use serde::{Deserialize, Serialize};

use super::padding::{Padding, pad};
use crate::{MlErr, Result};

/// Strides along `(batch, height, width, channel)`.
pub type Strides = [usize; 4];

/// The only strides the convolutions support.
pub const UNIT_STRIDES: Strides = [1, 1, 1, 1];

/// How a convolution layer computes its output. Both strategies produce the same values up to
/// floating point rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvStrategy {
    /// Per kernel tap correlation of the unpadded input, see [`conv2d`].
    #[default]
    Correlate,
    /// Nested loop inner products over the padded input, see [`conv2d_direct`].
    Direct,
}

impl ConvStrategy {
    /// Runs the convolution with this strategy, arguments as in [`conv2d`].
    pub fn apply(
        self,
        weights: ArrayView4<f32>,
        biases: ArrayView1<f32>,
        x: ArrayView4<f32>,
        padding: Padding,
        strides: Strides,
    ) -> Result<Array4<f32>> {
        match self {
            ConvStrategy::Correlate => conv2d(weights, biases, x, padding, strides),
            ConvStrategy::Direct => conv2d_direct(weights, biases, x, padding, strides),
        }
    }
}

/// 2-D convolution of a batch of images. The kernel is not flipped (cross-correlation).
///
/// For each kernel tap `(dh, dw)` the region of the unpadded input that overlaps the output is
/// multiplied by the tap's `(in_channels, out_channels)` matrix and accumulated into the output;
/// positions falling outside the input count as zeros.
///
/// # Arguments
/// * `weights` - Kernel of shape `(k_height, k_width, in_channels, out_channels)`.
/// * `biases` - One bias per output channel.
/// * `x` - Input batch of shape `(batch, height, width, in_channels)`.
/// * `padding` - `Same` keeps the spatial size, `Valid` shrinks it by the kernel size minus one.
/// * `strides` - Must be [`UNIT_STRIDES`].
///
/// # Returns
/// A `(batch, out_height, out_width, out_channels)` tensor or an error if the arguments are
/// inconsistent.
pub fn conv2d(
    weights: ArrayView4<f32>,
    biases: ArrayView1<f32>,
    x: ArrayView4<f32>,
    padding: Padding,
    strides: Strides,
) -> Result<Array4<f32>> {
    check_args(&weights, &biases, &x, strides)?;
    let out_dim = output_dim(&weights, &x, padding)?;
    let (batch, out_h, out_w, _) = out_dim;
    let (_, in_h, in_w, _) = x.dim();
    let (k_h, k_w, _, _) = weights.dim();
    let (p_h, p_w) = padding.amounts((k_h, k_w));

    let mut out = Array4::zeros(out_dim);

    for dh in 0..k_h {
        let Some((rows_out, rows_in)) = overlap(out_h, in_h, dh, p_h) else {
            continue;
        };

        for dw in 0..k_w {
            let Some((cols_out, cols_in)) = overlap(out_w, in_w, dw, p_w) else {
                continue;
            };

            let tap = weights.slice(s![dh, dw, .., ..]);
            for i in 0..batch {
                for (oh, ih) in rows_out.clone().zip(rows_in.clone()) {
                    let src = x.slice(s![i, ih, cols_in.clone(), ..]);
                    let mut dst = out.slice_mut(s![i, oh, cols_out.clone(), ..]);
                    linalg::general_mat_mul(1.0, &src, &tap, 1.0, &mut dst);
                }
            }
        }
    }

    out += &biases;
    Ok(out)
}

/// Reference convolution: pads the input and computes every output element as the inner
/// product of its receptive field with the kernel, accumulated over the input channels.
///
/// Output `(h, w)` reads the padded window starting at `(h, w)`, so even kernels are centred on
/// tap `k / 2` and the trailing padded row and column are never a window origin.
///
/// Same arguments, output and errors as [`conv2d`], orders of magnitude slower.
pub fn conv2d_direct(
    weights: ArrayView4<f32>,
    biases: ArrayView1<f32>,
    x: ArrayView4<f32>,
    padding: Padding,
    strides: Strides,
) -> Result<Array4<f32>> {
    check_args(&weights, &biases, &x, strides)?;
    let out_dim = output_dim(&weights, &x, padding)?;
    let (k_h, k_w, in_c, _) = weights.dim();
    let padded = pad(x, padding, (k_h, k_w));

    let mut out = Array4::zeros(out_dim);
    for ((i, h, w, c), o) in out.indexed_iter_mut() {
        let mut conv = 0.0;
        for ic in 0..in_c {
            let field = padded.slice(s![i, h..h + k_h, w..w + k_w, ic]);
            let kernel = weights.slice(s![.., .., ic, c]);
            conv += Zip::from(&field)
                .and(&kernel)
                .fold(0.0, |acc, &a, &b| acc + a * b);
        }
        *o = conv + biases[c];
    }

    Ok(out)
}

fn check_args(
    weights: &ArrayView4<f32>,
    biases: &ArrayView1<f32>,
    x: &ArrayView4<f32>,
    strides: Strides,
) -> Result<()> {
    if strides != UNIT_STRIDES {
        return Err(MlErr::NotImplemented(format!(
            "convolution with strides {strides:?}, only {UNIT_STRIDES:?} is supported"
        )));
    }

    let (_, _, in_c, out_c) = weights.dim();
    let (_, _, _, x_c) = x.dim();
    if x_c != in_c {
        return Err(MlErr::ShapeMismatch {
            what: "convolution input channels",
            got: x_c,
            expected: in_c,
        });
    }

    if biases.len() != out_c {
        return Err(MlErr::ShapeMismatch {
            what: "convolution biases",
            got: biases.len(),
            expected: out_c,
        });
    }

    Ok(())
}

fn output_dim(
    weights: &ArrayView4<f32>,
    x: &ArrayView4<f32>,
    padding: Padding,
) -> Result<(usize, usize, usize, usize)> {
    let (batch, in_h, in_w, _) = x.dim();
    let (k_h, k_w, _, out_c) = weights.dim();

    if k_h == 0 || k_w == 0 {
        return Err(MlErr::InvalidArgument(format!(
            "empty convolution kernel {k_h}x{k_w}"
        )));
    }

    if padding == Padding::Same {
        return Ok((batch, in_h, in_w, out_c));
    }

    if in_h < k_h {
        return Err(MlErr::ShapeMismatch {
            what: "input height",
            got: in_h,
            expected: k_h,
        });
    }

    if in_w < k_w {
        return Err(MlErr::ShapeMismatch {
            what: "input width",
            got: in_w,
            expected: k_w,
        });
    }

    Ok((batch, in_h - k_h + 1, in_w - k_w + 1, out_c))
}

/// Output and input ranges along one spatial axis touched by kernel offset `tap`, given that
/// output `o` reads input `o + tap - pad`.
fn overlap(
    out_len: usize,
    in_len: usize,
    tap: usize,
    pad: usize,
) -> Option<(Range<usize>, Range<usize>)> {
    let start = pad.saturating_sub(tap);
    let end = (in_len + pad).saturating_sub(tap).min(out_len);

    (start < end).then(|| (start..end, start + tap - pad..end + tap - pad))
}
