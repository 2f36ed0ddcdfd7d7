//! End-to-end run: load, build features, balance, normalize, split, evaluate, report.

use crate::config::BenchConfig;
use crate::data::{CsvSource, DataSource};
use crate::error::BenchError;
use crate::eval::{ClassifierOutcome, Evaluator};
use crate::features::FeaturePlan;
use crate::preprocess::{Smote, StratifiedSplit, normalize};
use crate::report::{ResultTable, write_table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Row and class counts observed at each stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSummary {
    pub source: String,
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    /// `[negatives, positives]` before oversampling.
    pub class_counts_before: [usize; 2],
    pub class_counts_after: [usize; 2],
    pub train_size: usize,
    pub test_size: usize,
    pub output_path: PathBuf,
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {}", self.source)?;
        writeln!(
            f,
            "Rows: {} loaded, {} dropped as incomplete",
            self.rows_loaded, self.rows_dropped
        )?;
        writeln!(
            f,
            "Classes (low/high risk): {}/{} before balancing, {}/{} after",
            self.class_counts_before[0],
            self.class_counts_before[1],
            self.class_counts_after[0],
            self.class_counts_after[1]
        )?;
        writeln!(f, "Split: {} train, {} test", self.train_size, self.test_size)?;
        write!(
            f,
            "Finished: {}",
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: ResultTable,
    pub outcomes: Vec<ClassifierOutcome>,
    pub summary: PipelineSummary,
}

/// Run the benchmark on the CSV named in `config`.
pub async fn run(config: &BenchConfig) -> Result<PipelineOutput, BenchError> {
    let source = CsvSource::new(&config.data.input_path, config.data.delimiter);
    run_with_source(config, &source).await
}

/// Run the benchmark on records from any [`DataSource`].
pub async fn run_with_source(
    config: &BenchConfig,
    source: &dyn DataSource,
) -> Result<PipelineOutput, BenchError> {
    config.validate()?;

    tracing::info!(source = %source.location(), "Loading dataset");
    let records = source.load().await?;

    let dataset = FeaturePlan::with_threshold(config.features.threshold).build(&records)?;
    let class_counts_before = dataset.class_counts();

    let balanced = Smote::new(config.balance.k_neighbors, config.balance.seed)
        .fit_resample(&dataset)?;
    let normalized = normalize(&balanced)?;
    let split = StratifiedSplit::new(config.split.test_size, config.split.seed).split(&normalized)?;

    let outcomes = Evaluator::from_config(&config.evaluation)
        .evaluate(&split)
        .await?;
    let table = ResultTable::from_outcomes(&outcomes);

    println!("{table}");
    let output_path = config.report.output_path.clone();
    write_table(&table, &output_path)?;
    println!("Results saved to {}.", output_path.display());

    let summary = PipelineSummary {
        source: source.location(),
        rows_loaded: records.row_count(),
        rows_dropped: records.row_count() - dataset.n_samples(),
        class_counts_before,
        class_counts_after: balanced.class_counts(),
        train_size: split.train.n_samples(),
        test_size: split.test.n_samples(),
        output_path,
        finished_at: Utc::now(),
    };
    Ok(PipelineOutput {
        table,
        outcomes,
        summary,
    })
}
