//! Synthetic glacial-lake records for demos and end-to-end runs.

use crate::data::source::RecordTable;
use crate::error::BenchError;
use crate::features::builder::{AREA, ELEVATION, FLOOD_OCCURRENCE, SLOPE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::Path;

/// Parameters for generating a synthetic dataset.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub rows: usize,
    /// Share of rows whose `Flood_Occurrence` exceeds the 0.05 threshold.
    pub positive_fraction: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            rows: 200,
            positive_fraction: 0.1,
            seed: 42,
        }
    }
}

/// Generate a record table shaped like the Sikkim lake export.
///
/// Positive lakes are larger, sit lower and have steeper surrounding slopes,
/// so the classes are separable but overlapping.
pub fn generate(spec: &SyntheticSpec) -> Result<RecordTable, BenchError> {
    if !(0.0..=1.0).contains(&spec.positive_fraction) {
        return Err(BenchError::invalid_input(format!(
            "positive_fraction must lie in [0, 1], got {}",
            spec.positive_fraction
        )));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let positives = (spec.rows as f64 * spec.positive_fraction).round() as usize;
    let mut labels: Vec<bool> = (0..spec.rows).map(|i| i < positives).collect();
    labels.shuffle(&mut rng);

    let rows = labels
        .into_iter()
        .map(|high_risk| {
            let (area, elevation, slope, flood) = if high_risk {
                (
                    rng.gen_range(0.20..1.60),
                    rng.gen_range(4300.0..5300.0),
                    rng.gen_range(18.0..35.0),
                    rng.gen_range(0.06..0.60),
                )
            } else {
                (
                    rng.gen_range(0.01..0.70),
                    rng.gen_range(4700.0..5900.0),
                    rng.gen_range(4.0..24.0),
                    rng.gen_range(0.0..0.05),
                )
            };
            vec![
                format!("{area:.4}"),
                format!("{elevation:.1}"),
                format!("{slope:.2}"),
                format!("{flood:.4}"),
            ]
        })
        .collect();

    Ok(RecordTable::new(
        vec![
            AREA.to_string(),
            ELEVATION.to_string(),
            SLOPE.to_string(),
            FLOOD_OCCURRENCE.to_string(),
        ],
        rows,
    ))
}

/// Render a record table as comma-separated text.
pub fn to_csv(table: &RecordTable) -> String {
    let mut out = table.columns.join(",");
    out.push('\n');
    for row in &table.rows {
        let _ = writeln!(out, "{}", row.join(","));
    }
    out
}

/// Generate and write a synthetic dataset to `path`.
pub fn write_csv(spec: &SyntheticSpec, path: &Path) -> Result<RecordTable, BenchError> {
    let table = generate(spec)?;
    std::fs::write(path, to_csv(&table))?;
    tracing::info!(path = %path.display(), rows = table.row_count(), "Wrote synthetic dataset");
    Ok(table)
}
