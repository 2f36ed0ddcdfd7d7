//! The ordered comparison table and its terminal rendering.

use crate::eval::ClassifierOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column headers, in sheet order.
pub const HEADERS: [&str; 5] = ["Classifier", "Accuracy", "Precision", "Recall", "F1-Score"];

/// One row of the comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    pub classifier: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricRecord {
    /// Row for a classifier that failed to fit or predict; every metric is NaN.
    pub fn failed(classifier: &str, error: impl Into<String>) -> Self {
        Self {
            classifier: classifier.to_string(),
            accuracy: f64::NAN,
            precision: f64::NAN,
            recall: f64::NAN,
            f1_score: f64::NAN,
            error: Some(error.into()),
        }
    }

    pub fn from_outcome(outcome: &ClassifierOutcome) -> Self {
        match &outcome.metrics {
            Some(m) => Self {
                classifier: outcome.name.clone(),
                accuracy: m.accuracy,
                precision: m.precision,
                recall: m.recall,
                f1_score: m.f1_score,
                error: None,
            },
            None => Self::failed(
                &outcome.name,
                outcome.error.clone().unwrap_or_else(|| "unknown error".into()),
            ),
        }
    }

    pub fn values(&self) -> [f64; 4] {
        [self.accuracy, self.precision, self.recall, self.f1_score]
    }
}

// NaN never equals NaN, so failed rows compare by their NaN pattern.
impl PartialEq for MetricRecord {
    fn eq(&self, other: &Self) -> bool {
        self.classifier == other.classifier
            && self
                .values()
                .iter()
                .zip(other.values().iter())
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

/// Rows in configuration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultTable {
    records: Vec<MetricRecord>,
}

impl ResultTable {
    pub fn new(records: Vec<MetricRecord>) -> Self {
        Self { records }
    }

    pub fn from_outcomes(outcomes: &[ClassifierOutcome]) -> Self {
        Self::new(outcomes.iter().map(MetricRecord::from_outcome).collect())
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, classifier: &str) -> Option<&MetricRecord> {
        self.records.iter().find(|r| r.classifier == classifier)
    }
}

fn cell(v: f64) -> String {
    if v.is_nan() {
        "-".to_string()
    } else {
        format!("{v:.4}")
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .records
            .iter()
            .map(|r| r.classifier.len())
            .chain(std::iter::once(HEADERS[0].len()))
            .max()
            .unwrap_or(HEADERS[0].len());

        write!(f, "{:<name_width$}", HEADERS[0])?;
        for header in &HEADERS[1..] {
            write!(f, "  {header:>9}")?;
        }
        writeln!(f)?;
        for record in &self.records {
            write!(f, "{:<name_width$}", record.classifier)?;
            for v in record.values() {
                write!(f, "  {:>9}", cell(v))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Confusion matrices, ROC-AUC and failures, one line per classifier.
pub fn render_diagnostics(outcomes: &[ClassifierOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| match (&o.metrics, &o.error) {
            (Some(m), _) => {
                let cm = m.confusion_matrix;
                let auc = m.auc_roc.map_or_else(|| "n/a".to_string(), |a| format!("{a:.4}"));
                format!(
                    "{}: TN={} FP={} FN={} TP={} ROC-AUC={} ({} ms)",
                    o.name, cm.tn, cm.fp, cm.fn_, cm.tp, auc, o.elapsed_ms
                )
            }
            (None, error) => format!(
                "{}: failed: {}",
                o.name,
                error.as_deref().unwrap_or("unknown error")
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{ClassificationMetrics, ConfusionMatrix};
    use pretty_assertions::assert_eq;

    fn outcome(name: &str, ok: bool) -> ClassifierOutcome {
        ClassifierOutcome {
            name: name.to_string(),
            metrics: ok.then(|| ClassificationMetrics {
                accuracy: 0.9,
                precision: 0.8,
                recall: 1.0,
                f1_score: 0.888_888,
                confusion_matrix: ConfusionMatrix {
                    tn: 4,
                    fp: 1,
                    fn_: 0,
                    tp: 4,
                },
                auc_roc: Some(0.95),
            }),
            error: (!ok).then(|| "boom".to_string()),
            elapsed_ms: 3,
        }
    }

    #[test]
    fn test_from_outcomes_keeps_order_and_failures() {
        let table = ResultTable::from_outcomes(&[outcome("A", true), outcome("B", false)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].classifier, "A");
        let failed = table.get("B").unwrap();
        assert!(failed.accuracy.is_nan());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failed_rows_compare_equal() {
        assert_eq!(MetricRecord::failed("x", "a"), MetricRecord::failed("x", "b"));
    }

    #[test]
    fn test_display() {
        let table = ResultTable::from_outcomes(&[outcome("KNN", true), outcome("SVM", false)]);
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Classifier   Accuracy  Precision     Recall   F1-Score"
        );
        assert_eq!(
            lines[1],
            "KNN            0.9000     0.8000     1.0000     0.8889"
        );
        assert!(lines[2].starts_with("SVM"));
        assert!(lines[2].trim_end().ends_with('-'));
    }

    #[test]
    fn test_diagnostics() {
        let text = render_diagnostics(&[outcome("KNN", true), outcome("SVM", false)]);
        assert_eq!(
            text,
            "KNN: TN=4 FP=1 FN=0 TP=4 ROC-AUC=0.9500 (3 ms)\nSVM: failed: boom"
        );
    }
}
