//! Discrete AdaBoost (SAMME) over weighted decision stumps.

use super::binning::FeatureBins;
use super::tree::{CartInputs, CartTree, TreeParams};
use super::{Classifier, check_fit_input, check_predict_input, not_fitted, sigmoid};
use crate::error::BenchError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;

const NAME: &str = "AdaBoost";

#[derive(Debug, Clone)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub seed: u64,
    stumps: Vec<(CartTree, f64)>,
    n_features: usize,
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            seed,
            stumps: Vec::new(),
            n_features: 0,
        }
    }

    /// Number of stumps kept after fitting; fewer than `n_estimators` when boosting stopped early.
    pub fn n_stumps(&self) -> usize {
        self.stumps.len()
    }

    /// `sum(alpha_m * s_m) / sum(alpha_m)` with `s_m = +1` for a positive vote, `-1` otherwise.
    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let norm: f64 = self.stumps.iter().map(|(_, alpha)| alpha).sum();
        x.rows()
            .into_iter()
            .map(|row| {
                let votes: f64 = self
                    .stumps
                    .iter()
                    .map(|(stump, alpha)| {
                        if stump.predict_row(row) > 0.5 {
                            *alpha
                        } else {
                            -alpha
                        }
                    })
                    .sum();
                votes / norm
            })
            .collect()
    }
}

impl Classifier for AdaBoostClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        if self.n_estimators == 0 {
            return Err(BenchError::model("AdaBoost: n_estimators must be > 0"));
        }
        let n = y.len();
        let bins = FeatureBins::exact(x);
        let binned = bins.transform(x);
        let params = TreeParams {
            max_depth: Some(1),
            ..TreeParams::default()
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut weights = vec![1.0 / n as f64; n];
        self.stumps.clear();

        for round in 0..self.n_estimators {
            let inputs = CartInputs {
                binned: &binned,
                bins: &bins,
                y: y.view(),
                weights: &weights,
            };
            let stump = CartTree::grow(&inputs, (0..n).collect(), &params, &mut rng);
            let miss: Vec<bool> = x
                .rows()
                .into_iter()
                .zip(y.iter())
                .map(|(row, &label)| u8::from(stump.predict_row(row) > 0.5) != label)
                .collect();
            let total: f64 = weights.iter().sum();
            let err: f64 = weights
                .iter()
                .zip(&miss)
                .filter(|(_, m)| **m)
                .map(|(w, _)| w)
                .sum::<f64>()
                / total;

            if err <= 0.0 {
                self.stumps.push((stump, 1.0));
                break;
            }
            if err >= 0.5 {
                if round == 0 {
                    return Err(BenchError::model(
                        "AdaBoost: first stump is no better than chance",
                    ));
                }
                tracing::debug!(round, err, "AdaBoost stopped: stump no better than chance");
                break;
            }

            let alpha = self.learning_rate * ((1.0 - err) / err).ln();
            for (w, &m) in weights.iter_mut().zip(&miss) {
                if m {
                    *w *= alpha.exp();
                }
            }
            let total: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= total);
            self.stumps.push((stump, alpha));
        }
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        if self.stumps.is_empty() {
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
    fn test_separates_blobs() {
        let (x, y) = blobs(40, 31);
        let (xt, yt) = blobs(20, 32);
        let mut model = AdaBoostClassifier::new(50, 1.0, 42);
        model.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(xt.view()).unwrap();
        assert!(accuracy(&pred, &yt) > 0.9);
    }

    #[test]
    fn test_perfect_stump_stops_early() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0, 0, 1, 1];
        let mut model = AdaBoostClassifier::new(100, 1.0, 0);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.n_stumps(), 1);
        let p = model.predict_proba(x.view()).unwrap();
        assert!((p[0] - sigmoid(-1.0)).abs() < 1e-12);
        assert!((p[3] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_interval_needs_several_stumps() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![0, 1, 1, 1, 1, 0];
        let mut model = AdaBoostClassifier::new(3, 1.0, 0);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.n_stumps(), 3);
        let pred = model.predict(x.view()).unwrap();
        assert_eq!(pred, y);
    }
}
