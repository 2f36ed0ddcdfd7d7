//! Column-wise z-score standardization.

use crate::data::dataset::Dataset;
use crate::error::BenchError;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column mean and sample standard deviation (`n - 1` denominator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standardizer {
    pub means: Array1<f64>,
    pub stds: Array1<f64>,
}

impl Standardizer {
    pub fn fit(x: &Array2<f64>) -> Result<Self, BenchError> {
        if x.nrows() < 2 {
            return Err(BenchError::transform(format!(
                "standardization needs at least 2 rows, got {}",
                x.nrows()
            )));
        }
        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| BenchError::transform("cannot standardize an empty matrix"))?;
        let stds = x.std_axis(Axis(0), 1.0);
        Ok(Self { means, stds })
    }

    /// `(v - mean) / std`. A zero-variance column yields NaN.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.stds
    }
}

/// Standardize every feature column of `dataset` using its own statistics.
pub fn normalize(dataset: &Dataset) -> Result<Dataset, BenchError> {
    let scaler = Standardizer::fit(&dataset.x)?;
    for (name, std) in dataset.feature_names.iter().zip(scaler.stds.iter()) {
        if *std == 0.0 {
            tracing::warn!(feature = %name, "Zero-variance column; standardized values are NaN");
        }
    }
    Ok(Dataset {
        x: scaler.transform(&dataset.x),
        y: dataset.y.clone(),
        feature_names: dataset.feature_names.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_columns_have_zero_mean_unit_std() {
        let ds = Dataset::new(
            array![[1.0, 10.0], [2.0, 20.0], [3.0, 35.0], [4.0, 15.0]],
            array![0, 1, 0, 1],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let out = normalize(&ds).unwrap();
        for col in out.x.columns() {
            let mean = col.mean().unwrap();
            let std = col.std(1.0);
            assert!(mean.abs() < 1e-12);
            assert!((std - 1.0).abs() < 1e-12);
        }
        assert_eq!(out.y, ds.y);
    }

    #[test]
    fn test_sample_std_denominator() {
        let scaler = Standardizer::fit(&array![[1.0], [3.0]]).unwrap();
        assert_eq!(scaler.means[0], 2.0);
        assert!((scaler.stds[0] - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_column_is_nan() {
        let ds = Dataset::new(
            array![[5.0, 1.0], [5.0, 2.0]],
            array![0, 1],
            vec!["flat".into(), "b".into()],
        )
        .unwrap();
        let out = normalize(&ds).unwrap();
        assert!(out.x.column(0).iter().all(|v| v.is_nan()));
        assert!(out.x.column(1).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_single_row_rejected() {
        assert!(Standardizer::fit(&array![[1.0, 2.0]]).is_err());
    }
}
