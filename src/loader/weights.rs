use std::{fs, path::Path};

use log::{debug, info};
use machine_learning::arch::{
    ConvNetParams, NetShape,
    layers::{ConvLayer, DenseLayer},
};
use ndarray::{Array, Dimension, IntoDimension};

use crate::error::{LoadErr, Result};

pub const CONV1_WEIGHTS: &str = "0_conv1_weights";
pub const CONV1_BIASES: &str = "1_conv1_biases";
pub const CONV2_WEIGHTS: &str = "2_conv2_weights";
pub const CONV2_BIASES: &str = "3_conv2_biases";
pub const FC1_WEIGHTS: &str = "4_fc1_weights";
pub const FC1_BIASES: &str = "5_fc1_biases";
pub const FC2_WEIGHTS: &str = "6_fc2_weights";
pub const FC2_BIASES: &str = "7_fc2_biases";

/// Reads the eight parameter files of a model directory.
///
/// # Arguments
/// * `dir` - The directory holding the files.
/// * `shape` - The sizes every tensor is reshaped to.
///
/// # Returns
/// The checked parameters, or the first file that is missing or malformed.
pub fn load_model<P: AsRef<Path>>(dir: P, shape: NetShape) -> Result<ConvNetParams> {
    let dir = dir.as_ref();
    info!("loading model from {}", dir.display());

    let conv1 = ConvLayer::new(
        read_tensor(dir, CONV1_WEIGHTS, shape.conv1_weights())?,
        read_tensor(dir, CONV1_BIASES, shape.conv1_filters)?,
    )?;
    let conv2 = ConvLayer::new(
        read_tensor(dir, CONV2_WEIGHTS, shape.conv2_weights())?,
        read_tensor(dir, CONV2_BIASES, shape.conv2_filters)?,
    )?;
    let fc1 = DenseLayer::new(
        read_tensor(dir, FC1_WEIGHTS, shape.fc1_weights())?,
        read_tensor(dir, FC1_BIASES, shape.fc1_units)?,
    )?;
    let fc2 = DenseLayer::new(
        read_tensor(dir, FC2_WEIGHTS, shape.fc2_weights())?,
        read_tensor(dir, FC2_BIASES, shape.num_labels)?,
    )?;

    Ok(ConvNetParams::new(shape, conv1, conv2, fc1, fc2)?)
}

/// Reads a whitespace separated text file of floats into a row major tensor.
pub fn read_tensor<Sh>(dir: &Path, file: &str, shape: Sh) -> Result<Array<f32, Sh::Dim>>
where
    Sh: IntoDimension,
{
    let dim = shape.into_dimension();
    let content = fs::read_to_string(dir.join(file))?;
    let values = parse_values(file, &content)?;

    if values.len() != dim.size() {
        return Err(LoadErr::ValueCount {
            file: file.to_string(),
            got: values.len(),
            expected: dim.size(),
        });
    }

    debug!(file = file, values = values.len(); "read parameter file");
    Ok(Array::from_shape_vec(dim, values)?)
}

fn parse_values(file: &str, content: &str) -> Result<Vec<f32>> {
    content
        .split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            token.parse().map_err(|_| LoadErr::Parse {
                file: file.to_string(),
                index,
                token: token.to_string(),
            })
        })
        .collect()
}
