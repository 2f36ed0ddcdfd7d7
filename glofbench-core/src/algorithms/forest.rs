//! Bagged CART trees with per-node feature subsampling.

use super::binning::FeatureBins;
use super::tree::{CartInputs, CartTree, MaxFeatures, TreeParams};
use super::{
    Classifier, balanced_class_weights, check_fit_input, check_predict_input, not_fitted,
};
use crate::error::BenchError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NAME: &str = "RandomForest";

#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub max_features: MaxFeatures,
    pub balanced: bool,
    pub seed: u64,
    trees: Vec<CartTree>,
    n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, balanced: bool, seed: u64) -> Self {
        Self {
            n_estimators,
            max_features: MaxFeatures::Sqrt,
            balanced,
            seed,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        if self.n_estimators == 0 {
            return Err(BenchError::model("RandomForest: n_estimators must be > 0"));
        }
        let n = y.len();
        let bins = FeatureBins::exact(x);
        let binned = bins.transform(x);
        // class weights come from the full training labels, not each bootstrap
        let weights: Vec<f64> = if self.balanced {
            let cw = balanced_class_weights(y);
            y.iter().map(|&label| cw[usize::from(label)]).collect()
        } else {
            vec![1.0; n]
        };
        let inputs = CartInputs {
            binned: &binned,
            bins: &bins,
            y: y.view(),
            weights: &weights,
        };
        let params = TreeParams {
            max_features: self.max_features,
            ..TreeParams::default()
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        self.trees = (0..self.n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                CartTree::grow(&inputs, sample, &params, &mut rng)
            })
            .collect();
        self.n_features = x.ncols();
        tracing::debug!(trees = self.trees.len(), "Fitted random forest");
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        if self.trees.is_empty() {
            return Err(not_fitted(NAME));
        }
        check_predict_input(NAME, x, self.n_features)?;
        let mut total = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict_proba(x);
        }
        Ok(total / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::testing::{accuracy, blobs};

    #[test]
    fn test_forest_separates_blobs() {
        let (x, y) = blobs(40, 5);
        let mut model = RandomForestClassifier::new(25, true, 42);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.n_trees(), 25);
        let (xt, yt) = blobs(20, 6);
        let pred = model.predict(xt.view()).unwrap();
        assert!(accuracy(&pred, &yt) > 0.9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs(20, 2);
        let mut a = RandomForestClassifier::new(10, true, 7);
        let mut b = RandomForestClassifier::new(10, true, 7);
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(
            a.predict_proba(x.view()).unwrap(),
            b.predict_proba(x.view()).unwrap()
        );
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = blobs(15, 8);
        let mut model = RandomForestClassifier::new(5, false, 1);
        model.fit(x.view(), y.view()).unwrap();
        let p = model.predict_proba(x.view()).unwrap();
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
