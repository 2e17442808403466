use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Index of the first maximum of `row`, 0 for an empty row.
///
/// NaN ranks above every number, so the first NaN wins and a corrupted row never scores by
/// accident on one of its finite entries.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut max = f32::NEG_INFINITY;

    for (i, &v) in row.indexed_iter() {
        if v.is_nan() {
            return i;
        }

        if v > max {
            best = i;
            max = v;
        }
    }

    best
}

/// Counts the rows of `predictions` whose arg-max equals the label.
///
/// # Returns
/// The amount of correct predictions, or a `ShapeMismatch` if there isn't one label per row.
pub fn correct_count(predictions: ArrayView2<f32>, labels: ArrayView1<i64>) -> Result<usize> {
    if predictions.nrows() != labels.len() {
        return Err(MlErr::ShapeMismatch {
            what: "labels",
            got: labels.len(),
            expected: predictions.nrows(),
        });
    }

    let correct = predictions
        .axis_iter(Axis(0))
        .zip(labels)
        .filter(|(row, label)| argmax(row.view()) as i64 == **label)
        .count();

    Ok(correct)
}

/// Percentage of misclassified rows, `100 * (1 - correct / n)`.
///
/// # Arguments
/// * `predictions` - A `(n, num_labels)` matrix of scores.
/// * `labels` - The `n` expected class indices.
///
/// # Returns
/// The error rate in `[0, 100]`, or an error if there are no rows or the lengths differ.
pub fn error_rate(predictions: ArrayView2<f32>, labels: ArrayView1<i64>) -> Result<f32> {
    let correct = correct_count(predictions, labels)?;
    let n = predictions.nrows();
    if n == 0 {
        return Err(MlErr::InvalidArgument(
            "cannot score an empty set of predictions".to_string(),
        ));
    }

    Ok(100.0 - 100.0 * correct as f32 / n as f32)
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, array};

    use super::*;

    fn one_hot(classes: &[usize], num_labels: usize) -> Array2<f32> {
        let mut m = Array2::zeros((classes.len(), num_labels));
        for (i, &c) in classes.iter().enumerate() {
            m[[i, c]] = 1.0;
        }
        m
    }

    #[test]
    fn argmax_takes_first_maximum() {
        assert_eq!(argmax(array![0.1, 0.7, 0.7, -1.0].view()), 1);
        assert_eq!(argmax(array![-3.0, -2.0].view()), 1);
        assert_eq!(argmax(Array1::<f32>::zeros(0).view()), 0);
        assert_eq!(argmax(array![f32::NEG_INFINITY, f32::NEG_INFINITY].view()), 0);
    }

    #[test]
    fn argmax_picks_first_nan() {
        assert_eq!(argmax(array![0.9, f32::NAN, 5.0, f32::NAN].view()), 1);
        assert_eq!(argmax(array![f32::NAN, 1.0].view()), 0);
    }

    #[test]
    fn nan_row_is_not_scored_as_correct() {
        let preds = array![[f32::NAN, 0.0, 3.0], [0.0, 1.0, 0.0]];
        let labels = array![2i64, 1];

        assert_eq!(correct_count(preds.view(), labels.view()).unwrap(), 1);
    }

    #[test]
    fn all_correct_is_zero_and_none_correct_is_hundred() {
        let preds = one_hot(&[0, 3, 2, 1], 4);

        let labels = array![0i64, 3, 2, 1];
        assert_eq!(error_rate(preds.view(), labels.view()).unwrap(), 0.0);

        let labels = array![1i64, 0, 3, 2];
        assert_eq!(error_rate(preds.view(), labels.view()).unwrap(), 100.0);
    }

    #[test]
    fn monotonic_in_mismatches() {
        let preds = one_hot(&[0, 1, 2, 0, 1, 2, 0, 1], 3);
        let mut labels: Array1<i64> = array![0, 1, 2, 0, 1, 2, 0, 1];
        let mut last = error_rate(preds.view(), labels.view()).unwrap();

        for i in 0..labels.len() {
            labels[i] = (labels[i] + 1) % 3;
            let rate = error_rate(preds.view(), labels.view()).unwrap();
            assert!(rate > last);
            last = rate;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn quarter_wrong() {
        let preds = one_hot(&[0, 1, 2, 3], 4);
        let labels = array![0i64, 1, 2, 0];

        assert_eq!(correct_count(preds.view(), labels.view()).unwrap(), 3);
        assert_eq!(error_rate(preds.view(), labels.view()).unwrap(), 25.0);
    }

    #[test]
    fn rejects_length_mismatch() {
        let preds = one_hot(&[0, 1], 2);
        let labels = array![0i64, 1, 1];

        assert_eq!(
            error_rate(preds.view(), labels.view()),
            Err(MlErr::ShapeMismatch {
                what: "labels",
                got: 3,
                expected: 2,
            })
        );
    }

    #[test]
    fn rejects_empty_predictions() {
        let preds = Array2::<f32>::zeros((0, 10));
        let labels = Array1::<i64>::zeros(0);

        assert!(matches!(
            error_rate(preds.view(), labels.view()),
            Err(MlErr::InvalidArgument(_))
        ));
    }
}
