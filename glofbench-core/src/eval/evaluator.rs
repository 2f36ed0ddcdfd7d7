//! Fit every configured classifier on the training partition and score it on the test partition.

use super::metrics::ClassificationMetrics;
use super::registry::{ClassifierSpec, default_suite};
use crate::config::{EvalConfig, FailurePolicy};
use crate::error::BenchError;
use crate::preprocess::TrainTest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Result of one classifier run. Exactly one of `metrics` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierOutcome {
    pub name: String,
    pub metrics: Option<ClassificationMetrics>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ClassifierOutcome {
    pub fn is_success(&self) -> bool {
        self.metrics.is_some()
    }
}

/// Progress callback, called with a classifier's name as its fit starts.
///
/// In parallel mode it runs on the worker thread that performs the fit.
#[derive(Clone)]
pub struct Progress(Arc<dyn Fn(&str) + Send + Sync>);

impl Progress {
    pub fn new(report: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(report))
    }

    fn report(&self, name: &str) {
        (self.0)(name)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(|name| println!("Training and evaluating: {name}"))
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Progress(..)")
    }
}

/// Runs an ordered list of classifier configurations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    specs: Vec<ClassifierSpec>,
    policy: FailurePolicy,
    parallel: bool,
    progress: Progress,
}

impl Evaluator {
    pub fn new(specs: Vec<ClassifierSpec>, policy: FailurePolicy) -> Self {
        Self {
            specs,
            policy,
            parallel: false,
            progress: Progress::default(),
        }
    }

    /// The standard eleven-model suite with settings from `config`.
    pub fn from_config(config: &EvalConfig) -> Self {
        Self::new(default_suite(config.seed), config.failure_policy).with_parallel(config.parallel)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn specs(&self) -> &[ClassifierSpec] {
        &self.specs
    }

    /// One outcome per classifier, in configuration order.
    ///
    /// Under [`FailurePolicy::Abort`] the first failing classifier (in configuration order)
    /// ends the run with its error.
    pub async fn evaluate(&self, data: &TrainTest) -> Result<Vec<ClassifierOutcome>, BenchError> {
        tracing::info!(
            classifiers = self.specs.len(),
            train = data.train.n_samples(),
            test = data.test.n_samples(),
            parallel = self.parallel,
            "Evaluating classifiers"
        );
        let mut outcomes = Vec::with_capacity(self.specs.len());

        if self.parallel {
            let shared = Arc::new(data.clone());
            let handles: Vec<_> = self
                .specs
                .iter()
                .cloned()
                .map(|spec| {
                    let data = Arc::clone(&shared);
                    let progress = self.progress.clone();
                    tokio::task::spawn_blocking(move || {
                        progress.report(&spec.name);
                        let started = Instant::now();
                        let result = fit_and_score(&spec, &data);
                        (spec.name, result, started.elapsed())
                    })
                })
                .collect();
            for joined in futures::future::join_all(handles).await {
                let (name, result, elapsed) = joined.map_err(|e| {
                    BenchError::Evaluation(format!("classifier task panicked or was cancelled: {e}"))
                })?;
                outcomes.push(self.settle(name, result, elapsed)?);
            }
        } else {
            for spec in &self.specs {
                self.progress.report(&spec.name);
                let started = Instant::now();
                let result = fit_and_score(spec, data);
                outcomes.push(self.settle(spec.name.clone(), result, started.elapsed())?);
            }
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        tracing::info!(
            succeeded = outcomes.len() - failed,
            failed,
            "Evaluation finished"
        );
        Ok(outcomes)
    }

    fn settle(
        &self,
        name: String,
        result: Result<ClassificationMetrics, BenchError>,
        elapsed: std::time::Duration,
    ) -> Result<ClassifierOutcome, BenchError> {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(metrics) => {
                tracing::debug!(
                    classifier = %name,
                    confusion = ?metrics.confusion_matrix.as_rows(),
                    auc_roc = ?metrics.auc_roc,
                    elapsed_ms,
                    "Classifier scored"
                );
                Ok(ClassifierOutcome {
                    name,
                    metrics: Some(metrics),
                    error: None,
                    elapsed_ms,
                })
            }
            Err(e) => match self.policy {
                FailurePolicy::Abort => Err(BenchError::Evaluation(format!("{name}: {e}"))),
                FailurePolicy::Skip => {
                    tracing::error!(classifier = %name, error = %e, "Classifier failed, skipping");
                    Ok(ClassifierOutcome {
                        name,
                        metrics: None,
                        error: Some(e.to_string()),
                        elapsed_ms,
                    })
                }
            },
        }
    }
}

/// Fit `spec` on the training partition and score its test predictions.
pub fn fit_and_score(
    spec: &ClassifierSpec,
    data: &TrainTest,
) -> Result<ClassificationMetrics, BenchError> {
    let mut model = spec.kind.build();
    model.fit(data.train.x.view(), data.train.y.view())?;
    let predictions = model.predict(data.test.x.view())?;
    let scores = model.predict_proba(data.test.x.view())?;
    ClassificationMetrics::compute(
        data.test.y.view(),
        predictions.view(),
        Some(scores.view()),
    )
}
