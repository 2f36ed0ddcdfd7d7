//! Classifier suite, evaluation loop and metrics.

pub mod evaluator;
pub mod metrics;
pub mod registry;

pub use evaluator::{ClassifierOutcome, Evaluator, Progress, fit_and_score};
pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use registry::{ClassifierKind, ClassifierSpec, default_suite};
