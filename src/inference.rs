use log::info;
use machine_learning::{
    arch::ConvNet,
    evaluation::{Evaluator, error_rate},
};
use ndarray::Array2;

use crate::{
    config::InferenceConfig,
    error::Result,
    loader::{load_model, read_images, read_labels},
};

/// The outcome of a test run.
#[derive(Debug, Clone)]
pub struct Report {
    /// One row of scores per test image.
    pub predictions: Array2<f32>,
    /// Percentage of misclassified images.
    pub error_rate: f32,
}

/// Loads the dataset and the model `config` points to, classifies every image and scores the
/// predictions against the labels.
///
/// Every file is read before the first forward pass, so a malformed input never yields a partial
/// result.
pub fn run(config: &InferenceConfig) -> Result<Report> {
    config.validate()?;

    let images = read_images(
        config.images_path(),
        config.num_images,
        &config.dataset_shape(),
    )?;
    let labels = read_labels(config.labels_path(), config.num_images)?;
    let params = load_model(&config.model_dir, config.net)?;

    let net = ConvNet::new(params)
        .with_strategy(config.conv)
        .with_output(config.output);
    let evaluator = Evaluator::new(config.eval_batch_size)
        .tail(config.tail)
        .parallel(config.parallel);

    let predictions = evaluator.evaluate(&net, images.view())?;
    let error_rate = error_rate(predictions.view(), labels.view())?;
    info!(images = config.num_images, error_rate = error_rate; "evaluation finished");

    Ok(Report {
        predictions,
        error_rate,
    })
}
