//! Accuracy helpers shared by the training loop and the evaluation routine.

/// Fraction of correct predictions, `correct / total`.
///
/// Returns `None` for an empty set; callers decide whether that is an error.
pub fn accuracy(correct: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(correct as f64 / total as f64)
    }
}

/// Count positions where the prediction equals the label
pub fn count_correct(predictions: &[usize], labels: &[usize]) -> usize {
    predictions
        .iter()
        .zip(labels)
        .filter(|(pred, label)| pred == label)
        .count()
}

/// Index of the largest score in each row of a row-major `[rows, cols]` matrix
pub fn argmax_rows(scores: &[f32], cols: usize) -> Vec<usize> {
    if cols == 0 {
        return Vec::new();
    }

    scores
        .chunks(cols)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
                    if v > best {
                        (idx, v)
                    } else {
                        (best_idx, best)
                    }
                })
                .0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_is_correct_over_total() {
        assert_eq!(accuracy(3, 4), Some(0.75));
        assert_eq!(accuracy(0, 5), Some(0.0));
        assert_eq!(accuracy(5, 5), Some(1.0));
        assert_eq!(accuracy(0, 0), None);
    }

    #[test]
    fn test_accuracy_stays_in_unit_interval() {
        for total in 1..20 {
            for correct in 0..=total {
                let acc = accuracy(correct, total).unwrap();
                assert!((0.0..=1.0).contains(&acc));
            }
        }
    }

    #[test]
    fn test_count_correct() {
        assert_eq!(count_correct(&[0, 1, 2, 1], &[0, 1, 1, 1]), 3);
        assert_eq!(count_correct(&[], &[]), 0);
    }

    #[test]
    fn test_argmax_rows() {
        let scores = [0.1, 0.9, 0.0, 2.0, -1.0, 1.5];
        assert_eq!(argmax_rows(&scores, 3), vec![1, 0]);
        assert!(argmax_rows(&scores, 0).is_empty());
    }
}
