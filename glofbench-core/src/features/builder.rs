//! Feature construction: column selection, interaction terms, log1p, labels.

use crate::data::dataset::Dataset;
use crate::data::source::RecordTable;
use crate::error::BenchError;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

pub const AREA: &str = "Lake_Area_km2";
pub const ELEVATION: &str = "Mean_Elevation_m";
pub const SLOPE: &str = "Mean_Slope_deg";
pub const FLOOD_OCCURRENCE: &str = "Flood_Occurrence";
pub const AREA_ELEVATION: &str = "Area_Elevation_Interaction";
pub const AREA_SLOPE: &str = "Area_Slope_Interaction";

/// Raw feature columns taken from the record table, in matrix order.
pub const RAW_FEATURES: [&str; 3] = [AREA, ELEVATION, SLOPE];

/// A feature engineering step applied to a [`Dataset`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureStep {
    /// Append `left * right` as a new column.
    Interaction {
        left: String,
        right: String,
        output: String,
    },
    /// Replace a column with `ln(1 + v)`.
    Log1p { column: String },
}

/// Ordered feature steps plus the labelling rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeaturePlan {
    pub steps: Vec<FeatureStep>,
    /// `Flood_Occurrence` strictly above this is labelled 1.
    pub threshold: f64,
}

impl Default for FeaturePlan {
    fn default() -> Self {
        Self::with_threshold(0.05)
    }
}

impl FeaturePlan {
    /// The GLOF plan: two area interactions on raw values, then log1p on area and elevation.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            steps: vec![
                FeatureStep::Interaction {
                    left: AREA.into(),
                    right: ELEVATION.into(),
                    output: AREA_ELEVATION.into(),
                },
                FeatureStep::Interaction {
                    left: AREA.into(),
                    right: SLOPE.into(),
                    output: AREA_SLOPE.into(),
                },
                FeatureStep::Log1p {
                    column: AREA.into(),
                },
                FeatureStep::Log1p {
                    column: ELEVATION.into(),
                },
            ],
            threshold,
        }
    }

    /// Build `(X, y)` from a record table.
    ///
    /// Rows missing any raw feature or the target are dropped first.
    pub fn build(&self, table: &RecordTable) -> Result<Dataset, BenchError> {
        let mut required: Vec<&str> = RAW_FEATURES.to_vec();
        required.push(FLOOD_OCCURRENCE);
        let table = table.drop_incomplete(&required)?;
        if table.row_count() == 0 {
            return Err(BenchError::dataset(
                "no complete rows left after dropping missing values",
            ));
        }

        let columns = RAW_FEATURES
            .iter()
            .map(|name| complete_column(&table, name))
            .collect::<Result<Vec<_>, _>>()?;
        let n_rows = table.row_count();
        let x = Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r]);

        let target = complete_column(&table, FLOOD_OCCURRENCE)?;
        let y = label(&target, self.threshold);

        let names = RAW_FEATURES.iter().map(|s| s.to_string()).collect();
        let mut dataset = Dataset::new(x, y, names)?;
        for step in &self.steps {
            dataset = apply_step(dataset, step)?;
        }

        let [negatives, positives] = dataset.class_counts();
        tracing::info!(
            rows = dataset.n_samples(),
            features = dataset.n_features(),
            negatives,
            positives,
            "Built feature matrix"
        );
        Ok(dataset)
    }
}

/// Label `1` where `value > threshold`, else `0`.
pub fn label(target: &[f64], threshold: f64) -> Array1<u8> {
    target.iter().map(|&v| u8::from(v > threshold)).collect()
}

/// `ln(1 + v)`, refusing inputs outside its domain instead of producing NaN.
///
/// `row` counts rows left after incomplete ones were dropped.
pub fn log1p_checked(value: f64, column: &str, row: usize) -> Result<f64, BenchError> {
    if !value.is_finite() || value <= -1.0 {
        return Err(BenchError::transform(format!(
            "log1p undefined for {column} = {value} (complete row {})",
            row + 1
        )));
    }
    Ok(value.ln_1p())
}

fn complete_column(table: &RecordTable, name: &str) -> Result<Vec<f64>, BenchError> {
    table
        .numeric_column(name)?
        .into_iter()
        .map(|v| v.ok_or_else(|| BenchError::dataset(format!("unexpected missing value in {name}"))))
        .collect()
}

fn column_position(dataset: &Dataset, name: &str) -> Result<usize, BenchError> {
    dataset
        .feature_names
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| BenchError::transform(format!("feature '{name}' not present")))
}

fn apply_step(dataset: Dataset, step: &FeatureStep) -> Result<Dataset, BenchError> {
    match step {
        FeatureStep::Interaction {
            left,
            right,
            output,
        } => {
            let l = column_position(&dataset, left)?;
            let r = column_position(&dataset, right)?;
            let product = &dataset.x.column(l) * &dataset.x.column(r);

            let mut x = dataset.x.clone();
            x.push_column(product.view())
                .map_err(|e| BenchError::transform(e.to_string()))?;
            let mut names = dataset.feature_names.clone();
            names.push(output.clone());
            Dataset::new(x, dataset.y, names)
        }
        FeatureStep::Log1p { column } => {
            let idx = column_position(&dataset, column)?;
            let mut x = dataset.x.clone();
            for (row, cell) in x.index_axis_mut(Axis(1), idx).iter_mut().enumerate() {
                *cell = log1p_checked(*cell, column, row)?;
            }
            Ok(Dataset { x, ..dataset })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::parse_delimited;

    fn table(body: &str) -> RecordTable {
        let csv = format!("{AREA},{ELEVATION},{SLOPE},{FLOOD_OCCURRENCE}\n{body}");
        parse_delimited(&csv, ',').unwrap()
    }

    #[test]
    fn test_five_columns_in_order() {
        let ds = FeaturePlan::default()
            .build(&table("0.5,5000,10,0.1\n1.0,4000,20,0.0\n"))
            .unwrap();
        assert_eq!(ds.n_features(), 5);
        assert_eq!(
            ds.feature_names,
            vec![AREA, ELEVATION, SLOPE, AREA_ELEVATION, AREA_SLOPE]
        );
    }

    #[test]
    fn test_interactions_use_raw_values() {
        let ds = FeaturePlan::default()
            .build(&table("0.5,5000,10,0.1\n"))
            .unwrap();
        let row = ds.x.row(0);
        assert!((row[0] - 0.5f64.ln_1p()).abs() < 1e-12);
        assert!((row[1] - 5000f64.ln_1p()).abs() < 1e-12);
        assert_eq!(row[2], 10.0);
        assert_eq!(row[3], 2500.0);
        assert_eq!(row[4], 5.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let ds = FeaturePlan::default()
            .build(&table("0.5,5000,10,0.05\n0.5,5000,10,0.0500001\n0.5,5000,10,0\n"))
            .unwrap();
        assert_eq!(ds.y.to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let ds = FeaturePlan::default()
            .build(&table("0.5,,10,0.1\n0.2,4500,8,0.2\n0.3,4600,9,\n"))
            .unwrap();
        assert_eq!(ds.n_samples(), 1);
    }

    #[test]
    fn test_log1p_domain_error() {
        let err = FeaturePlan::default()
            .build(&table("-1.0,5000,10,0.1\n"))
            .unwrap_err();
        assert!(matches!(err, BenchError::Transform(_)));
    }

    #[test]
    fn test_log1p_error_counts_complete_rows() {
        let err = FeaturePlan::default()
            .build(&table("0.5,,10,0.1\n0.2,4500,8,0.2\n-2.0,4600,9,0.3\n"))
            .unwrap_err();
        assert!(err.to_string().contains("complete row 2"), "{err}");
    }

    #[test]
    fn test_missing_column() {
        let t = parse_delimited("Lake_Area_km2,Flood_Occurrence\n1,0\n", ',').unwrap();
        assert!(matches!(
            FeaturePlan::default().build(&t),
            Err(BenchError::Dataset(_))
        ));
    }

    #[test]
    fn test_all_rows_incomplete() {
        let err = FeaturePlan::default()
            .build(&table("0.5,,10,0.1\n"))
            .unwrap_err();
        assert!(err.to_string().contains("no complete rows"));
    }

    #[test]
    fn test_custom_threshold() {
        let ds = FeaturePlan::with_threshold(0.5)
            .build(&table("0.5,5000,10,0.4\n0.5,5000,10,0.6\n"))
            .unwrap();
        assert_eq!(ds.y.to_vec(), vec![0, 1]);
    }
}
