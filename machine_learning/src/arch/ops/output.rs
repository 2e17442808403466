use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Transformation applied to the scores of the last layer.
///
/// Predictions only depend on the arg-max of each row, so both variants classify identically;
/// `Softmax` additionally turns every row into a probability distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFn {
    /// Raw scores are returned as they are.
    #[default]
    Identity,
    /// Row-wise softmax, shifted by the row maximum for stability.
    Softmax,
}

impl OutputFn {
    pub fn apply(self, scores: Array2<f32>) -> Array2<f32> {
        match self {
            OutputFn::Identity => scores,
            OutputFn::Softmax => softmax(scores),
        }
    }
}

fn softmax(mut scores: Array2<f32>) -> Array2<f32> {
    for mut row in scores.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }

    scores
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::evaluation::argmax;

    #[test]
    fn identity_passes_scores_through() {
        let scores = array![[1.0, -2.0, 3.0], [0.0, 0.0, 0.0]];
        assert_eq!(OutputFn::Identity.apply(scores.clone()), scores);
    }

    #[test]
    fn softmax_rows_sum_to_one_and_keep_ranking() {
        let scores = array![[1.0, -2.0, 3.0], [100.0, 99.0, -50.0], [0.0, 0.0, 0.0]];
        let probs = OutputFn::Softmax.apply(scores.clone());

        for (row, p) in scores.rows().into_iter().zip(probs.rows()) {
            assert!((p.sum() - 1.0).abs() < 1e-5);
            assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
            assert_eq!(argmax(row), argmax(p));
        }
    }

    #[test]
    fn deserializes_from_snake_case() {
        let f: OutputFn = serde_json::from_str("\"softmax\"").unwrap();
        assert_eq!(f, OutputFn::Softmax);
    }
}
