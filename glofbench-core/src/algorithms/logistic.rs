//! L2-regularised logistic regression fitted by damped Newton iterations.

use super::linalg::solve;
use super::{
    Classifier, balanced_class_weights, check_fit_input, check_predict_input, not_fitted, sigmoid,
};
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

const NAME: &str = "LogisticRegression";

/// Logistic regression minimising `0.5 * |w|^2 + C * sum(s_i * logloss_i)`.
///
/// The intercept is not penalised. With `balanced` set, `s_i` is the
/// balanced class weight of row `i`; otherwise every `s_i` is 1.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub balanced: bool,
    coef: Option<Array1<f64>>,
    intercept: f64,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 100, false)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, balanced: bool) -> Self {
        Self {
            c,
            max_iter,
            tol: 1e-4,
            balanced,
            coef: None,
            intercept: 0.0,
            n_iter: 0,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Newton iterations used by the last fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn objective(
        &self,
        x: &Array2<f64>,
        y: ArrayView1<'_, u8>,
        s: &Array1<f64>,
        theta: &Array1<f64>,
    ) -> f64 {
        let d = x.ncols() - 1;
        let z = x.dot(theta);
        let loss: f64 = z
            .iter()
            .zip(y.iter())
            .zip(s.iter())
            .map(|((&zi, &yi), &si)| {
                // log(1 + e^z) - y z, computed without overflow
                let softplus = if zi > 0.0 {
                    zi + (-zi).exp().ln_1p()
                } else {
                    zi.exp().ln_1p()
                };
                si * (softplus - f64::from(yi) * zi)
            })
            .sum();
        let penalty: f64 = theta.iter().take(d).map(|w| w * w).sum::<f64>() * 0.5;
        penalty + self.c * loss
    }
}

/// `[x | 1]`, so the last coefficient is the intercept.
fn with_intercept(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let (n, d) = x.dim();
    Array2::from_shape_fn((n, d + 1), |(r, c)| if c < d { x[[r, c]] } else { 1.0 })
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        let xa = with_intercept(x);
        let (n, p) = xa.dim();
        let d = p - 1;

        let weights = if self.balanced {
            let cw = balanced_class_weights(y);
            y.mapv(|label| cw[usize::from(label)])
        } else {
            Array1::ones(n)
        };

        let mut theta = Array1::<f64>::zeros(p);
        let mut value = self.objective(&xa, y, &weights, &theta);
        let mut converged = false;
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            self.n_iter += 1;
            let prob = xa.dot(&theta).mapv(sigmoid);

            let mut grad = Array1::<f64>::zeros(p);
            let mut hess = Array2::<f64>::zeros((p, p));
            for i in 0..n {
                let row = xa.row(i);
                let resid = weights[i] * (prob[i] - f64::from(y[i]));
                let curv = weights[i] * prob[i] * (1.0 - prob[i]);
                grad.scaled_add(self.c * resid, &row);
                for a in 0..p {
                    for b in a..p {
                        hess[[a, b]] += self.c * curv * row[a] * row[b];
                    }
                }
            }
            for a in 0..p {
                for b in 0..a {
                    hess[[a, b]] = hess[[b, a]];
                }
            }
            for j in 0..d {
                grad[j] += theta[j];
                hess[[j, j]] += 1.0;
            }
            // keeps the intercept row invertible on separable data
            hess[[d, d]] += 1e-10;

            if grad.iter().all(|g| g.abs() < self.tol) {
                converged = true;
                break;
            }

            let step = solve(&hess, &grad)?;
            let mut t = 1.0;
            loop {
                let candidate = &theta - &(&step * t);
                let cand_value = self.objective(&xa, y, &weights, &candidate);
                if cand_value <= value || t < 1e-10 {
                    theta = candidate;
                    value = cand_value;
                    break;
                }
                t *= 0.5;
            }
        }

        if !converged {
            tracing::warn!(
                max_iter = self.max_iter,
                "LogisticRegression did not converge"
            );
        }
        self.intercept = theta[d];
        self.coef = Some(theta.slice(ndarray::s![..d]).to_owned());
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        let coef = self.coef.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_predict_input(NAME, x, coef.len())?;
        Ok((x.dot(coef) + self.intercept).mapv(sigmoid))
    }
}
