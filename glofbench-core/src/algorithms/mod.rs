//! Binary classifiers implemented natively on `ndarray`.
//!
//! Every model implements [`Classifier`]: `fit` on a feature matrix with 0/1
//! labels, then `predict_proba` returns the positive-class score per row.

pub mod adaboost;
pub mod binning;
pub mod boosting;
pub mod forest;
pub mod knn;
pub mod linalg;
pub mod logistic;
pub mod naive_bayes;
pub mod oblivious;
pub mod svm;
pub mod tree;

pub use adaboost::AdaBoostClassifier;
pub use boosting::{BoostParams, GradientBoostingClassifier};
pub use forest::RandomForestClassifier;
pub use knn::KnnClassifier;
pub use logistic::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use oblivious::ObliviousBoostingClassifier;
pub use svm::SvmClassifier;
pub use tree::DecisionTreeClassifier;

use crate::error::BenchError;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// A binary classifier over `f64` features and `{0, 1}` labels.
pub trait Classifier: Send {
    /// Fit on `x` (rows are samples) and labels `y`.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError>;

    /// Probability (or calibrated score) of class 1 for every row of `x`.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError>;

    /// Hard labels. Defaults to `predict_proba > 0.5`.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, BenchError> {
        Ok(self.predict_proba(x)?.mapv(|p| u8::from(p > 0.5)))
    }
}

/// Reject empty, mismatched, non-finite or single-class training data.
pub(crate) fn check_fit_input(
    model: &str,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, u8>,
) -> Result<(), BenchError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(BenchError::model(format!("{model}: empty training matrix")));
    }
    if x.nrows() != y.len() {
        return Err(BenchError::model(format!(
            "{model}: {} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(BenchError::model(format!(
            "{model}: input contains NaN or infinity"
        )));
    }
    let positives = y.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == y.len() {
        return Err(BenchError::model(format!(
            "{model}: training labels contain a single class"
        )));
    }
    Ok(())
}

/// Reject prediction input whose width differs from the training data, or that is non-finite.
pub(crate) fn check_predict_input(
    model: &str,
    x: ArrayView2<'_, f64>,
    n_features: usize,
) -> Result<(), BenchError> {
    if x.ncols() != n_features {
        return Err(BenchError::model(format!(
            "{model}: fitted on {n_features} features, got {}",
            x.ncols()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(BenchError::model(format!(
            "{model}: input contains NaN or infinity"
        )));
    }
    Ok(())
}

pub(crate) fn not_fitted(model: &str) -> BenchError {
    BenchError::model(format!("{model}: predict called before fit"))
}

/// `n / (2 * count_c)` for each class, the "balanced" weighting.
pub(crate) fn balanced_class_weights(y: ArrayView1<'_, u8>) -> [f64; 2] {
    let n = y.len() as f64;
    let positives = y.iter().filter(|&&label| label == 1).count() as f64;
    let negatives = n - positives;
    [n / (2.0 * negatives), n / (2.0 * positives)]
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Log-odds of the positive-class prior.
pub(crate) fn prior_log_odds(y: ArrayView1<'_, u8>) -> f64 {
    let p = y.iter().filter(|&&label| label == 1).count() as f64 / y.len() as f64;
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small fixtures shared by the classifier tests.

    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two Gaussian-ish blobs centred at (-2, -2) and (2, 2).
    pub fn blobs(n_per_class: usize, seed: u64) -> (Array2<f64>, Array1<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = n_per_class * 2;
        let mut x = Array2::zeros((n, 2));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let label = u8::from(i >= n_per_class);
            let centre = if label == 1 { 2.0 } else { -2.0 };
            x[[i, 0]] = centre + rng.gen_range(-1.5..1.5);
            x[[i, 1]] = centre + rng.gen_range(-1.5..1.5);
            y[i] = label;
        }
        (x, y)
    }

    pub fn accuracy(pred: &Array1<u8>, y: &Array1<u8>) -> f64 {
        let hits = pred.iter().zip(y.iter()).filter(|(a, b)| a == b).count();
        hits as f64 / y.len() as f64
    }
}
