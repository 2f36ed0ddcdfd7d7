//! Gaussian naive Bayes.

use super::{Classifier, check_fit_input, check_predict_input, not_fitted};
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

const NAME: &str = "NaiveBayes";

#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    /// Added to every per-class variance, as a fraction of the largest feature variance.
    pub var_smoothing: f64,
    /// Row `c` holds the mean / variance of class `c`.
    means: Option<Array2<f64>>,
    vars: Array2<f64>,
    log_priors: [f64; 2],
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl GaussianNaiveBayes {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            means: None,
            vars: Array2::zeros((0, 0)),
            log_priors: [0.0; 2],
        }
    }

    fn joint_log_likelihood(&self, means: &Array2<f64>, row: ArrayView1<'_, f64>) -> [f64; 2] {
        let mut out = self.log_priors;
        for (class, jll) in out.iter_mut().enumerate() {
            for ((&v, &mu), &var) in row
                .iter()
                .zip(means.row(class).iter())
                .zip(self.vars.row(class).iter())
            {
                *jll -= 0.5 * (2.0 * std::f64::consts::PI * var).ln();
                *jll -= 0.5 * (v - mu) * (v - mu) / var;
            }
        }
        out
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        let d = x.ncols();
        let epsilon = self.var_smoothing
            * x.var_axis(Axis(0), 0.0)
                .iter()
                .copied()
                .fold(0.0, f64::max);

        let mut means = Array2::zeros((2, d));
        let mut vars = Array2::zeros((2, d));
        let n = y.len() as f64;
        for class in 0..2u8 {
            let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
            let subset = x.select(Axis(0), &rows);
            let c = usize::from(class);
            if let Some(mean) = subset.mean_axis(Axis(0)) {
                means.row_mut(c).assign(&mean);
            }
            vars.row_mut(c)
                .assign(&(subset.var_axis(Axis(0), 0.0) + epsilon));
            self.log_priors[c] = (rows.len() as f64 / n).ln();
        }
        if vars.iter().any(|&v| v <= 0.0) {
            return Err(BenchError::model(
                "NaiveBayes: zero variance with zero smoothing",
            ));
        }
        self.means = Some(means);
        self.vars = vars;
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        let means = self.means.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_predict_input(NAME, x, means.ncols())?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let [j0, j1] = self.joint_log_likelihood(means, row);
                // softmax over two classes
                1.0 / (1.0 + (j0 - j1).exp())
            })
            .collect())
    }
}
