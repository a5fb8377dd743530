//! Classifier abstraction over a fixed feature space.

/// Input in a classifier's native feature space.
#[derive(Debug, Clone, PartialEq)]
pub enum Features {
    /// Dense vector, one value per feature.
    Dense(Vec<f64>),
    /// Sparse vector as `(index, value)` pairs over `dim` features.
    /// Indices are unique and ascending.
    Sparse { dim: usize, entries: Vec<(usize, f64)> },
}

impl Features {
    /// Dimensionality of the feature space.
    pub fn dim(&self) -> usize {
        match self {
            Self::Dense(v) => v.len(),
            Self::Sparse { dim, .. } => *dim,
        }
    }

    /// Number of stored (non-implicit) values.
    pub fn nnz(&self) -> usize {
        match self {
            Self::Dense(v) => v.len(),
            Self::Sparse { entries, .. } => entries.len(),
        }
    }

    pub fn to_dense(&self) -> Vec<f64> {
        match self {
            Self::Dense(v) => v.clone(),
            Self::Sparse { dim, entries } => {
                let mut out = vec![0.0f64; *dim];
                for &(i, v) in entries {
                    out[i] = v;
                }
                out
            }
        }
    }

    /// Dot product with a dense weight row of the same dimensionality.
    pub fn dot(&self, weights: &[f64]) -> f64 {
        match self {
            Self::Dense(v) => v.iter().zip(weights).map(|(&x, &w)| x * w).sum(),
            Self::Sparse { entries, .. } => entries
                .iter()
                .filter_map(|&(i, x)| weights.get(i).map(|&w| x * w))
                .sum(),
        }
    }
}

/// A pre-trained classifier.
///
/// Implementations are immutable after load and shared across concurrent
/// requests, so they must be `Send + Sync`. Anything that needs exclusive
/// access internally guards itself.
pub trait Classifier: Send + Sync {
    /// Known class labels, in the order scores are reported.
    fn classes(&self) -> &[String];

    /// Expected input dimensionality, if the artifact declares one.
    fn n_features(&self) -> Option<usize>;

    /// Single best label for `features`.
    fn predict(&self, features: &Features) -> anyhow::Result<String>;

    /// One probability per entry of [`classes`](Self::classes).
    fn predict_proba(&self, features: &Features) -> anyhow::Result<Vec<f64>>;

    /// Short name of the artifact format, for logs and status output.
    fn kind(&self) -> &'static str;
}

/// Fail with a shape error unless `features` has `expected` dimensions.
pub fn ensure_dim(expected: usize, features: &Features) -> anyhow::Result<()> {
    anyhow::ensure!(
        features.dim() == expected,
        "feature shape mismatch: classifier expects {expected} features, got {}",
        features.dim()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_to_dense() {
        let f = Features::Sparse {
            dim: 4,
            entries: vec![(1, 0.5), (3, 2.0)],
        };
        assert_eq!(f.dim(), 4);
        assert_eq!(f.nnz(), 2);
        assert_eq!(f.to_dense(), vec![0.0, 0.5, 0.0, 2.0]);
    }

    #[test]
    fn dot_dense_and_sparse_agree() {
        let weights = [1.0, -2.0, 0.5, 4.0];
        let dense = Features::Dense(vec![0.0, 0.5, 0.0, 2.0]);
        let sparse = Features::Sparse {
            dim: 4,
            entries: vec![(1, 0.5), (3, 2.0)],
        };
        assert!((dense.dot(&weights) - 7.0).abs() < 1e-9);
        assert!((sparse.dot(&weights) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn ensure_dim_reports_mismatch() {
        let err = ensure_dim(3, &Features::Dense(vec![1.0])).unwrap_err();
        assert!(err.to_string().contains("expects 3 features, got 1"));
        assert!(ensure_dim(1, &Features::Dense(vec![1.0])).is_ok());
    }
}
