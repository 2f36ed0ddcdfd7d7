//! Boosting with oblivious (symmetric) trees.
//!
//! Every level of an oblivious tree uses one `(feature, threshold)` test for
//! all of its nodes, so a tree of depth `d` is `d` tests plus `2^d` leaf
//! values and a row's leaf index is the bit pattern of its test outcomes.

use super::binning::FeatureBins;
use super::{Classifier, check_fit_input, check_predict_input, not_fitted, sigmoid};
use crate::error::BenchError;
use ndarray::{Array1, ArrayView1, ArrayView2};

const NAME: &str = "ObliviousBoosting";

#[derive(Debug, Clone, PartialEq)]
pub struct ObliviousTree {
    /// Level `k` sends rows with `x[feature] > threshold` to leaves with bit `k` set.
    levels: Vec<(usize, f64)>,
    leaves: Vec<f64>,
}

impl ObliviousTree {
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn leaf_index(&self, row: ArrayView1<'_, f64>) -> usize {
        self.levels
            .iter()
            .enumerate()
            .fold(0, |idx, (k, &(feature, threshold))| {
                idx | (usize::from(row[feature] > threshold) << k)
            })
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.leaves[self.leaf_index(row)]
    }
}

#[derive(Debug, Clone)]
pub struct ObliviousBoostingClassifier {
    pub iterations: usize,
    pub learning_rate: f64,
    pub depth: usize,
    pub l2_leaf_reg: f64,
    pub border_count: usize,
    trees: Vec<ObliviousTree>,
    n_features: usize,
}

impl Default for ObliviousBoostingClassifier {
    fn default() -> Self {
        Self::new(1000, 0.03, 6)
    }
}

impl ObliviousBoostingClassifier {
    pub fn new(iterations: usize, learning_rate: f64, depth: usize) -> Self {
        Self {
            iterations,
            learning_rate,
            depth,
            l2_leaf_reg: 3.0,
            border_count: 254,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn trees(&self) -> &[ObliviousTree] {
        &self.trees
    }

    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect()
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.l2_leaf_reg)
    }

    fn grow(
        &self,
        bins: &FeatureBins,
        binned: &ndarray::Array2<u32>,
        grad: &[f64],
        hess: &[f64],
    ) -> ObliviousTree {
        let n = grad.len();
        let n_features = bins.n_features();
        let mut leaf_of = vec![0usize; n];
        let mut levels: Vec<(usize, f64)> = Vec::with_capacity(self.depth);
        let mut split_bins: Vec<usize> = Vec::with_capacity(self.depth);

        for level in 0..self.depth {
            let n_leaves = 1usize << level;
            let mut best: Option<(usize, usize, f64)> = None;

            for feature in 0..n_features {
                let n_bins = bins.n_bins(feature);
                if n_bins < 2 {
                    continue;
                }
                let mut hist_g = vec![0.0; n_leaves * n_bins];
                let mut hist_h = vec![0.0; n_leaves * n_bins];
                for i in 0..n {
                    let slot = leaf_of[i] * n_bins + binned[[i, feature]] as usize;
                    hist_g[slot] += grad[i];
                    hist_h[slot] += hess[i];
                }

                let mut totals = vec![0.0; n_bins - 1];
                for leaf in 0..n_leaves {
                    let row_g = &hist_g[leaf * n_bins..(leaf + 1) * n_bins];
                    let row_h = &hist_h[leaf * n_bins..(leaf + 1) * n_bins];
                    let g: f64 = row_g.iter().sum();
                    let h: f64 = row_h.iter().sum();
                    let (mut gl, mut hl) = (0.0, 0.0);
                    for (bin, total) in totals.iter_mut().enumerate() {
                        gl += row_g[bin];
                        hl += row_h[bin];
                        *total += self.score(gl, hl) + self.score(g - gl, h - hl);
                    }
                }
                for (bin, &total) in totals.iter().enumerate() {
                    if split_bins
                        .iter()
                        .zip(&levels)
                        .any(|(&b, &(f, _))| f == feature && b == bin)
                    {
                        continue;
                    }
                    if best.is_none_or(|(_, _, g)| total > g) {
                        best = Some((feature, bin, total));
                    }
                }
            }

            let Some((feature, bin, _)) = best else { break };
            for i in 0..n {
                if binned[[i, feature]] as usize > bin {
                    leaf_of[i] |= 1 << level;
                }
            }
            levels.push((feature, bins.threshold(feature, bin)));
            split_bins.push(bin);
        }

        let n_leaves = 1usize << levels.len();
        let mut g = vec![0.0; n_leaves];
        let mut h = vec![0.0; n_leaves];
        for i in 0..n {
            g[leaf_of[i]] += grad[i];
            h[leaf_of[i]] += hess[i];
        }
        let leaves = g
            .iter()
            .zip(&h)
            .map(|(&gs, &hs)| -self.learning_rate * gs / (hs + self.l2_leaf_reg))
            .collect();
        ObliviousTree { levels, leaves }
    }
}

impl Classifier for ObliviousBoostingClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        if self.iterations == 0 || self.depth == 0 {
            return Err(BenchError::model(
                "ObliviousBoosting: iterations and depth must be > 0",
            ));
        }
        let n = y.len();
        let bins = FeatureBins::with_max_bins(x, self.border_count + 1);
        let binned = bins.transform(x);

        let mut raw = vec![0.0; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        self.trees = Vec::with_capacity(self.iterations);
        for _ in 0..self.iterations {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = p * (1.0 - p);
            }
            let tree = self.grow(&bins, &binned, &grad, &hess);
            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += tree.predict_row(row);
            }
            self.trees.push(tree);
        }
        self.n_features = x.ncols();
        tracing::debug!(
            iterations = self.trees.len(),
            depth = self.trees.last().map_or(0, ObliviousTree::depth),
            "Fitted oblivious boosting"
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
