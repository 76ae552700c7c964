//! 2-D projection of embedding vectors
//!
//! The snapshot renderer only needs a map from `embedding_dim` to the plane.
//! `PcaProjector` builds the sample covariance as a `nalgebra::DMatrix` and
//! keeps the two eigenvectors of `SymmetricEigen` with the largest
//! eigenvalues.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Maps high-dimensional embeddings onto the plane
pub trait EmbeddingProjector {
    /// Project every row; output has one point per input row, in order
    ///
    /// Rows that cannot be placed (non-finite values) come back as NaN points.
    fn project(&self, embeddings: &[Vec<f32>]) -> Vec<[f64; 2]>;
}

/// Principal component analysis onto the first two components
#[derive(Debug, Clone, Default)]
pub struct PcaProjector;

impl PcaProjector {
    pub fn new() -> Self {
        Self
    }

    /// The `count` leading eigenvectors of a covariance matrix, as columns
    ///
    /// Components without variance are zero columns. Each column's largest
    /// entry is made positive so consecutive snapshots do not mirror.
    fn leading_components(covariance: DMatrix<f64>, count: usize) -> DMatrix<f64> {
        let dim = covariance.nrows();
        let eigen = SymmetricEigen::new(covariance);

        let mut pairs: Vec<(usize, f64)> = eigen.eigenvalues.iter().copied().enumerate().collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let mut basis = DMatrix::zeros(dim, count);
        for (rank, (idx, value)) in pairs.into_iter().take(count).enumerate() {
            if value <= 1e-12 {
                continue;
            }
            let mut v: DVector<f64> = eigen.eigenvectors.column(idx).into_owned();
            let pivot = v
                .iter()
                .copied()
                .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
            if pivot < 0.0 {
                v.neg_mut();
            }
            basis.set_column(rank, &v);
        }
        basis
    }
}

impl EmbeddingProjector for PcaProjector {
    fn project(&self, embeddings: &[Vec<f32>]) -> Vec<[f64; 2]> {
        let n = embeddings.len();
        if n == 0 {
            return Vec::new();
        }
        let dim = embeddings[0].len();

        let finite: Vec<usize> = (0..n)
            .filter(|&r| {
                embeddings[r].len() == dim && embeddings[r].iter().all(|x| x.is_finite())
            })
            .collect();
        let mut points = vec![[f64::NAN, f64::NAN]; n];
        if finite.is_empty() || dim == 0 {
            return points;
        }

        let data = DMatrix::from_fn(finite.len(), dim, |r, c| embeddings[finite[r]][c] as f64);
        let mean = data.row_mean();
        let centred = DMatrix::from_fn(finite.len(), dim, |r, c| data[(r, c)] - mean[c]);

        let denom = (finite.len().max(2) - 1) as f64;
        let covariance = centred.transpose() * &centred / denom;
        if !covariance.iter().all(|c| c.is_finite()) {
            return points;
        }

        let basis = Self::leading_components(covariance, 2);
        let projected = &centred * &basis;

        for (r, &row) in finite.iter().enumerate() {
            points[row] = [projected[(r, 0)], projected[(r, 1)]];
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(PcaProjector::default().project(&[]).is_empty());
    }

    #[test]
    fn test_points_on_a_line_collapse_to_one_axis() {
        let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32, 2.0 * i as f32, 0.0]).collect();
        let points = PcaProjector::default().project(&rows);

        assert_eq!(points.len(), 10);
        for p in &points {
            assert!(p[1].abs() < 1e-6, "second axis should be empty, got {}", p[1]);
        }
        // Spacing along the line is sqrt(1 + 4)
        let step = points[1][0] - points[0][0];
        assert!((step.abs() - 5f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_first_axis_has_the_largest_spread() {
        let rows: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![(i as f32) * 3.0, ((i % 2) as f32) * 0.5])
            .collect();
        let points = PcaProjector::default().project(&rows);

        let spread = |axis: usize| points.iter().map(|p| p[axis] * p[axis]).sum::<f64>();
        assert!(spread(0) > spread(1));
    }

    #[test]
    fn test_projection_is_centred() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 1.0], vec![2.0, 3.0], vec![6.0, 7.0]];
        let points = PcaProjector::default().project(&rows);
        let sum_x: f64 = points.iter().map(|p| p[0]).sum();
        let sum_y: f64 = points.iter().map(|p| p[1]).sum();
        assert!(sum_x.abs() < 1e-9);
        assert!(sum_y.abs() < 1e-9);
    }

    #[test]
    fn test_constant_rows_project_to_origin() {
        let rows = vec![vec![0.5f32; 4]; 3];
        let points = PcaProjector::default().project(&rows);
        assert!(points.iter().all(|p| p[0] == 0.0 && p[1] == 0.0));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let rows: Vec<Vec<f32>> = (0..8)
            .map(|i| vec![(i * 7 % 5) as f32, (i * 3 % 4) as f32, i as f32])
            .collect();
        let projector = PcaProjector::default();
        assert_eq!(projector.project(&rows), projector.project(&rows));
    }

    #[test]
    fn test_non_finite_rows_are_left_out() {
        let rows = vec![
            vec![0.0, 0.0],
            vec![f32::NAN, 1.0],
            vec![2.0, 2.0],
            vec![4.0, f32::INFINITY],
            vec![4.0, 4.0],
        ];
        let points = PcaProjector::default().project(&rows);

        assert_eq!(points.len(), 5);
        assert!(points[1][0].is_nan() && points[3][0].is_nan());
        for i in [0, 2, 4] {
            assert!(points[i][0].is_finite() && points[i][1].is_finite());
        }
        // Remaining rows still lie on one line through their mean
        assert!((points[2][0]).abs() < 1e-9);
        assert!((points[4][0] - 8f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_all_rows_non_finite() {
        let rows = vec![vec![f32::NAN; 3]; 2];
        let points = PcaProjector::default().project(&rows);
        assert!(points.iter().all(|p| p[0].is_nan() && p[1].is_nan()));
    }
}
