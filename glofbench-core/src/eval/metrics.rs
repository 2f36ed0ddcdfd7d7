//! Binary classification metrics for the positive class.

use crate::error::BenchError;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Counts of a binary confusion matrix, positive class = 1.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(
        y_true: ArrayView1<'_, u8>,
        y_pred: ArrayView1<'_, u8>,
    ) -> Result<Self, BenchError> {
        if y_true.len() != y_pred.len() {
            return Err(BenchError::Evaluation(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t, p) {
                (0, 0) => cm.tn += 1,
                (0, _) => cm.fp += 1,
                (_, 0) => cm.fn_ += 1,
                _ => cm.tp += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// `[[tn, fp], [fn, tp]]`.
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }
}

/// Classification metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub auc_roc: Option<f64>,
}

impl ClassificationMetrics {
    /// Metrics from hard predictions, plus ROC-AUC when scores are given.
    ///
    /// Any ratio with a zero denominator is reported as 0.
    pub fn compute(
        y_true: ArrayView1<'_, u8>,
        y_pred: ArrayView1<'_, u8>,
        scores: Option<ArrayView1<'_, f64>>,
    ) -> Result<Self, BenchError> {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
        if cm.total() == 0 {
            return Err(BenchError::Evaluation("no test rows to score".into()));
        }
        let precision = ratio(cm.tp, cm.tp + cm.fp);
        let recall = ratio(cm.tp, cm.tp + cm.fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let auc_roc = match scores {
            Some(s) => roc_auc(y_true, s)?,
            None => None,
        };
        Ok(Self {
            accuracy: ratio(cm.tp + cm.tn, cm.total()),
            precision,
            recall,
            f1_score,
            confusion_matrix: cm,
            auc_roc,
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Area under the ROC curve by the rank-sum formula, ties sharing their mean rank.
///
/// `None` when `y_true` holds a single class.
pub fn roc_auc(
    y_true: ArrayView1<'_, u8>,
    scores: ArrayView1<'_, f64>,
) -> Result<Option<f64>, BenchError> {
    if y_true.len() != scores.len() {
        return Err(BenchError::Evaluation(format!(
            "{} true labels but {} scores",
            y_true.len(),
            scores.len()
        )));
    }
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; the tied block covers start+1 ..= end
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end]
            .iter()
            .filter(|&&i| y_true[i] == 1)
            .count();
        pos_rank_sum += mean_rank * positives as f64;
        start = end;
    }
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Ok(Some(u / (n_pos * n_neg) as f64))
}
