use std::{num::NonZeroUsize, ops::Range};

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView4, Axis, s};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result, arch::ConvNet};

/// What to do with the last `n % batch_size` images of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// Forward the last full window `[n - batch_size, n)` and keep only the rows that weren't
    /// computed yet, so every forward pass sees exactly `batch_size` images.
    #[default]
    LastFullWindow,
    /// Forward the undersized remainder as is.
    Ragged,
}

/// A single forward pass of the evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// The images fed to the network.
    pub window: Range<usize>,
    /// The prediction rows this pass fills, always inside `window`.
    pub rows: Range<usize>,
}

impl BatchPlan {
    /// Position of the first kept row inside the window's output.
    fn offset(&self) -> usize {
        self.rows.start - self.window.start
    }
}

/// Runs a [`ConvNet`] over a dataset in fixed size batches and assembles the predictions.
#[derive(Debug, Clone)]
pub struct Evaluator {
    batch_size: NonZeroUsize,
    tail: TailPolicy,
    parallel: bool,
}

impl Evaluator {
    /// Returns a new sequential `Evaluator` using [`TailPolicy::LastFullWindow`].
    ///
    /// # Arguments
    /// * `batch_size` - The amount of images per forward pass.
    pub fn new(batch_size: NonZeroUsize) -> Self {
        Self {
            batch_size,
            tail: TailPolicy::default(),
            parallel: false,
        }
    }

    pub fn tail(mut self, tail: TailPolicy) -> Self {
        self.tail = tail;
        self
    }

    /// Whether batches are forwarded on the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Splits `n` images into forward passes.
    ///
    /// Windows advance by the batch size without overlapping, except for the tail under
    /// [`TailPolicy::LastFullWindow`]. The `rows` of the returned plans cover `0..n` exactly
    /// once, in order.
    ///
    /// # Returns
    /// The plan or an `InvalidArgument` error if `n` is zero or smaller than the batch size.
    pub fn plan(&self, n: usize) -> Result<Vec<BatchPlan>> {
        let batch_size = self.batch_size();

        if n == 0 {
            return Err(MlErr::InvalidArgument(
                "cannot evaluate an empty dataset".to_string(),
            ));
        }

        if batch_size > n {
            return Err(MlErr::InvalidArgument(format!(
                "batch size larger than dataset: {batch_size} > {n}"
            )));
        }

        let plan = (0..n)
            .step_by(batch_size)
            .map(|begin| {
                let end = begin + batch_size;
                let rows = begin..end.min(n);

                let window = if end <= n {
                    rows.clone()
                } else {
                    match self.tail {
                        TailPolicy::LastFullWindow => n - batch_size..n,
                        TailPolicy::Ragged => rows.clone(),
                    }
                };

                BatchPlan { window, rows }
            })
            .collect();

        Ok(plan)
    }

    /// Computes the predictions of `net` for every image.
    ///
    /// # Arguments
    /// * `net` - The network.
    /// * `images` - A `(n, height, width, channels)` dataset.
    ///
    /// # Returns
    /// A `(n, num_labels)` prediction matrix, or the first error raised by any batch.
    pub fn evaluate(&self, net: &ConvNet, images: ArrayView4<f32>) -> Result<Array2<f32>> {
        let n = images.len_of(Axis(0));
        let plan = self.plan(n)?;

        info!(
            "evaluating {n} images in {} batches of {}",
            plan.len(),
            self.batch_size()
        );

        let forward = |batch: &BatchPlan| -> Result<Array2<f32>> {
            if batch.window != batch.rows {
                warn!(
                    "recomputing window {:?} to fill rows {:?}",
                    batch.window, batch.rows
                );
            }

            debug!(start = batch.window.start, end = batch.window.end; "forwarding batch");

            let scores = net.forward(images.slice(s![batch.window.clone(), .., .., ..]))?;
            let offset = batch.offset();
            Ok(scores
                .slice(s![offset..offset + batch.rows.len(), ..])
                .to_owned())
        };

        let outputs: Vec<Array2<f32>> = if self.parallel {
            plan.par_iter().map(forward).collect::<Result<_>>()?
        } else {
            plan.iter().map(forward).collect::<Result<_>>()?
        };

        let mut predictions = Array2::zeros((n, net.shape().num_labels));
        for (batch, scores) in plan.iter().zip(outputs) {
            predictions
                .slice_mut(s![batch.rows.clone(), ..])
                .assign(&scores);
        }

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(batch_size: usize) -> Evaluator {
        Evaluator::new(NonZeroUsize::new(batch_size).unwrap())
    }

    fn covered(plan: &[BatchPlan]) -> Vec<usize> {
        plan.iter().flat_map(|b| b.rows.clone()).collect()
    }

    #[test]
    fn divisible_plan_uses_disjoint_windows() {
        let plan = evaluator(4).plan(12).unwrap();

        assert_eq!(plan.len(), 3);
        for (i, batch) in plan.iter().enumerate() {
            assert_eq!(batch.window, 4 * i..4 * (i + 1));
            assert_eq!(batch.rows, batch.window);
        }
    }

    #[test]
    fn tail_reuses_last_full_window() {
        let plan = evaluator(64).plan(70).unwrap();

        assert_eq!(
            plan,
            vec![
                BatchPlan {
                    window: 0..64,
                    rows: 0..64,
                },
                BatchPlan {
                    window: 6..70,
                    rows: 64..70,
                },
            ]
        );
        assert_eq!(plan[1].offset(), 58);
        assert_eq!(covered(&plan), (0..70).collect::<Vec<_>>());
    }

    #[test]
    fn ragged_tail_is_undersized() {
        let plan = evaluator(64).tail(TailPolicy::Ragged).plan(70).unwrap();

        assert_eq!(plan[1].window, 64..70);
        assert_eq!(plan[1].rows, 64..70);
        assert_eq!(covered(&plan), (0..70).collect::<Vec<_>>());
    }

    #[test]
    fn every_index_covered_once() {
        for n in 1..40 {
            for b in 1..=n {
                for tail in [TailPolicy::LastFullWindow, TailPolicy::Ragged] {
                    let plan = evaluator(b).tail(tail).plan(n).unwrap();
                    assert_eq!(covered(&plan), (0..n).collect::<Vec<_>>());
                    for batch in &plan {
                        assert!(batch.window.start <= batch.rows.start);
                        assert!(batch.rows.end <= batch.window.end);
                        if tail == TailPolicy::LastFullWindow {
                            assert_eq!(batch.window.len(), b);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_batch_larger_than_dataset() {
        let res = evaluator(64).plan(63);
        assert_eq!(
            res,
            Err(MlErr::InvalidArgument(
                "batch size larger than dataset: 64 > 63".to_string()
            ))
        );
    }

    #[test]
    fn rejects_empty_dataset() {
        assert!(matches!(
            evaluator(1).plan(0),
            Err(MlErr::InvalidArgument(_))
        ));
    }
}
