//! Numeric feature matrix paired with binary labels.

use crate::error::BenchError;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Feature matrix `x` (rows are samples) with 0/1 labels `y`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<u8>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn new(
        x: Array2<f64>,
        y: Array1<u8>,
        feature_names: Vec<String>,
    ) -> Result<Self, BenchError> {
        if x.nrows() != y.len() {
            return Err(BenchError::invalid_input(format!(
                "feature matrix has {} rows but label vector has {}",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != feature_names.len() {
            return Err(BenchError::invalid_input(format!(
                "feature matrix has {} columns but {} names were given",
                x.ncols(),
                feature_names.len()
            )));
        }
        if let Some(bad) = y.iter().find(|&&label| label > 1) {
            return Err(BenchError::invalid_input(format!(
                "labels must be 0 or 1, found {bad}"
            )));
        }
        Ok(Self {
            x,
            y,
            feature_names,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Number of samples per class as `[negatives, positives]`.
    pub fn class_counts(&self) -> [usize; 2] {
        class_counts(self.y.view())
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// Count `[zeros, ones]` in a label vector.
pub fn class_counts(y: ndarray::ArrayView1<'_, u8>) -> [usize; 2] {
    let positives = y.iter().filter(|&&label| label == 1).count();
    [y.len() - positives, positives]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn test_new_checks_shapes() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(Dataset::new(x.clone(), array![0, 1, 1], names(2)).is_err());
        assert!(Dataset::new(x.clone(), array![0, 1], names(3)).is_err());
        assert!(Dataset::new(x.clone(), array![0, 2], names(2)).is_err());
        assert!(Dataset::new(x, array![0, 1], names(2)).is_ok());
    }

    #[test]
    fn test_class_counts_and_select() {
        let ds = Dataset::new(
            array![[1.0], [2.0], [3.0], [4.0]],
            array![0, 1, 0, 0],
            names(1),
        )
        .unwrap();
        assert_eq!(ds.class_counts(), [3, 1]);

        let picked = ds.select(&[3, 1]);
        assert_eq!(picked.x, array![[4.0], [2.0]]);
        assert_eq!(picked.y, array![0, 1]);
    }
}
