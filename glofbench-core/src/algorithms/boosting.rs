//! Second-order gradient boosting on log-loss with histogram split search.
//!
//! One implementation covers three families through [`BoostParams`]:
//! classic depth-limited boosting with count-based split scores, the
//! depth-limited regularised variant, and leaf-wise growth capped by a leaf
//! count. Trees are grown best-first; without a leaf cap that expands every
//! splittable node, which matches level-wise growth.

use super::binning::FeatureBins;
use super::{Classifier, check_fit_input, check_predict_input, not_fitted, prior_log_odds, sigmoid};
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

const NAME: &str = "GradientBoosting";

/// How a candidate split is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitScore {
    /// Squared residual sum over sample count (least-squares fit to the gradient).
    Count,
    /// Squared gradient sum over hessian sum plus `lambda`.
    Hessian,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: Option<usize>,
    pub max_leaves: Option<usize>,
    pub min_samples_leaf: usize,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    pub lambda: f64,
    /// `None` uses one bin per distinct value.
    pub max_bins: Option<usize>,
    pub split_score: SplitScore,
}

impl BoostParams {
    /// 100 stages, learning rate 0.1, depth 3.
    pub fn gradient_boosting() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(3),
            max_leaves: None,
            min_samples_leaf: 1,
            min_child_weight: 0.0,
            lambda: 0.0,
            max_bins: None,
            split_score: SplitScore::Count,
        }
    }

    /// 100 rounds, eta 0.3, depth 6, L2 1, min child weight 1, 256 bins.
    pub fn xgboost() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: Some(6),
            max_leaves: None,
            min_samples_leaf: 1,
            min_child_weight: 1.0,
            lambda: 1.0,
            max_bins: Some(256),
            split_score: SplitScore::Hessian,
        }
    }

    /// 100 rounds, learning rate 0.1, 31 leaves, 20 rows per leaf, 255 bins.
    pub fn lightgbm() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: None,
            max_leaves: Some(31),
            min_samples_leaf: 20,
            min_child_weight: 1e-3,
            lambda: 0.0,
            max_bins: Some(255),
            split_score: SplitScore::Hessian,
        }
    }

    fn validate(&self) -> Result<(), BenchError> {
        if self.n_estimators == 0 {
            return Err(BenchError::model("GradientBoosting: n_estimators must be > 0"));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(BenchError::model(
                "GradientBoosting: learning_rate must be positive",
            ));
        }
        if self.max_leaves.is_some_and(|l| l < 2) {
            return Err(BenchError::model("GradientBoosting: max_leaves must be >= 2"));
        }
        Ok(())
    }

    fn score(&self, g: f64, h: f64, n: usize) -> f64 {
        match self.split_score {
            SplitScore::Count => g * g / n as f64,
            SplitScore::Hessian => g * g / (h + self.lambda),
        }
    }

    /// Newton step `-G / (H + lambda)`, zero when the hessian vanishes.
    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.lambda;
        if denom.abs() < 1e-150 { 0.0 } else { -g / denom }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RegNode {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree over gradient statistics. `x[feature] <= threshold` goes left.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTree {
    nodes: Vec<RegNode>,
}

impl GradientTree {
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                RegNode::Leaf(value) => return *value,
                RegNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, RegNode::Leaf(_)))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitChoice {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct Open {
    slot: usize,
    rows: Vec<usize>,
    depth: usize,
    g: f64,
    h: f64,
    split: Option<SplitChoice>,
}

struct GrowContext<'a> {
    params: &'a BoostParams,
    bins: &'a FeatureBins,
    binned: &'a Array2<u32>,
    grad: &'a [f64],
    hess: &'a [f64],
}

impl GrowContext<'_> {
    fn open(&self, slot: usize, rows: Vec<usize>, depth: usize) -> Open {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let can_split = self.params.max_depth.is_none_or(|d| depth < d)
            && rows.len() >= 2 * self.params.min_samples_leaf.max(1);
        let split = if can_split {
            self.best_split(&rows, g, h)
        } else {
            None
        };
        Open {
            slot,
            rows,
            depth,
            g,
            h,
            split,
        }
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitChoice> {
        let p = self.params;
        let parent = p.score(g, h, rows.len());
        let mut best: Option<SplitChoice> = None;

        for feature in 0..self.bins.n_features() {
            let n_bins = self.bins.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut hist_g = vec![0.0; n_bins];
            let mut hist_h = vec![0.0; n_bins];
            let mut hist_n = vec![0usize; n_bins];
            for &i in rows {
                let b = self.binned[[i, feature]] as usize;
                hist_g[b] += self.grad[i];
                hist_h[b] += self.hess[i];
                hist_n[b] += 1;
            }

            let (mut gl, mut hl, mut nl) = (0.0, 0.0, 0usize);
            for bin in 0..n_bins - 1 {
                gl += hist_g[bin];
                hl += hist_h[bin];
                nl += hist_n[bin];
                if hist_n[bin] == 0 {
                    continue;
                }
                let nr = rows.len() - nl;
                if nl < p.min_samples_leaf || nr < p.min_samples_leaf || nr == 0 {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < p.min_child_weight || hr < p.min_child_weight {
                    continue;
                }
                let gain = p.score(gl, hl, nl) + p.score(gr, hr, nr) - parent;
                if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitChoice { feature, bin, gain });
                }
            }
        }
        best
    }

    fn grow(&self, rows: Vec<usize>) -> GradientTree {
        let mut nodes = vec![RegNode::Leaf(0.0)];
        let mut open = vec![self.open(0, rows, 0)];
        let mut leaves = 1;

        loop {
            if self.params.max_leaves.is_some_and(|cap| leaves >= cap) {
                break;
            }
            let pick = open
                .iter()
                .enumerate()
                .filter_map(|(k, o)| o.split.map(|s| (k, s.gain)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, _)| k);
            let Some(k) = pick else { break };
            let node = open.swap_remove(k);
            let Some(split) = node.split else { break };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = node
                .rows
                .iter()
                .partition(|&&i| self.binned[[i, split.feature]] as usize <= split.bin);
            let left = nodes.len();
            let right = left + 1;
            nodes.push(RegNode::Leaf(0.0));
            nodes.push(RegNode::Leaf(0.0));
            nodes[node.slot] = RegNode::Split {
                feature: split.feature,
                threshold: self.bins.threshold(split.feature, split.bin),
                left,
                right,
            };
            open.push(self.open(left, left_rows, node.depth + 1));
            open.push(self.open(right, right_rows, node.depth + 1));
            leaves += 1;
        }

        for o in open {
            nodes[o.slot] =
                RegNode::Leaf(self.params.learning_rate * self.params.leaf_weight(o.g, o.h));
        }
        GradientTree { nodes }
    }
}

/// Boosted trees on the logistic loss; the starting score is the prior log-odds.
#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    pub params: BoostParams,
    init: f64,
    trees: Vec<GradientTree>,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(params: BoostParams) -> Self {
        Self {
            params,
            init: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn trees(&self) -> &[GradientTree] {
        &self.trees
    }

    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.init + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect()
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        self.params.validate()?;
        let n = y.len();
        let bins = match self.params.max_bins {
            Some(max) => FeatureBins::with_max_bins(x, max),
            None => FeatureBins::exact(x),
        };
        let binned = bins.transform(x);

        self.init = prior_log_odds(y);
        let mut raw = vec![self.init; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        self.trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = p * (1.0 - p);
            }
            let ctx = GrowContext {
                params: &self.params,
                bins: &bins,
                binned: &binned,
                grad: &grad,
                hess: &hess,
            };
            let tree = ctx.grow((0..n).collect());
            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += tree.predict_row(row);
            }
            self.trees.push(tree);
        }
        self.n_features = x.ncols();
        tracing::debug!(
            rounds = self.trees.len(),
            leaves = self.trees.last().map_or(0, GradientTree::n_leaves),
            "Fitted gradient boosting"
        );
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        if self.trees.is_empty() {
            return Err(not_fitted(NAME));
        }
        check_predict_input(NAME, x, self.n_features)?;
        Ok(self.decision_function(x).mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::testing::{accuracy, blobs};
    use ndarray::array;

    #[test]
    fn test_presets_separate_blobs() {
        let (x, y) = blobs(40, 11);
        let (xt, yt) = blobs(20, 12);
        for params in [
            BoostParams::gradient_boosting(),
            BoostParams::xgboost(),
            BoostParams::lightgbm(),
        ] {
            let mut model = GradientBoostingClassifier::new(params);
            model.fit(x.view(), y.view()).unwrap();
            let pred = model.predict(xt.view()).unwrap();
            assert!(accuracy(&pred, &yt) > 0.9, "{params:?}");
        }
    }

    #[test]
    fn test_leaf_cap_respected() {
        let (x, y) = blobs(60, 4);
        let params = BoostParams {
            max_leaves: Some(4),
            min_samples_leaf: 1,
            n_estimators: 5,
            ..BoostParams::lightgbm()
        };
        let mut model = GradientBoostingClassifier::new(params);
        model.fit(x.view(), y.view()).unwrap();
        assert!(model.trees().iter().all(|t| t.n_leaves() <= 4));
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_data() {
        // 10 rows cannot be split into two leaves of 20
        let (x, y) = blobs(5, 3);
        let mut model = GradientBoostingClassifier::new(BoostParams::lightgbm());
        model.fit(x.view(), y.view()).unwrap();
        assert!(model.trees().iter().all(|t| t.n_leaves() == 1));
        // single-leaf trees move every row by the same amount
        let p = model.predict_proba(x.view()).unwrap();
        assert!(p.iter().all(|&v| (v - p[0]).abs() < 1e-12));
    }

    #[test]
    fn test_first_round_from_prior() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0, 0, 0, 1];
        let params = BoostParams {
            n_estimators: 1,
            ..BoostParams::gradient_boosting()
        };
        let mut model = GradientBoostingClassifier::new(params);
        model.fit(x.view(), y.view()).unwrap();
        let raw = model.decision_function(x.view());
        assert!(raw[3] > raw[0]);
        assert!((model.init - (1.0f64 / 3.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_rounds() {
        let (x, y) = blobs(5, 0);
        let params = BoostParams {
            n_estimators: 0,
            ..BoostParams::xgboost()
        };
        assert!(GradientBoostingClassifier::new(params).fit(x.view(), y.view()).is_err());
    }
}
