//! C-support vector classification with an RBF kernel.
//!
//! The dual is solved by SMO with second-order working-set selection.
//! Probabilities come from a sigmoid fitted to cross-validated decision
//! values (Platt scaling); hard predictions use the sign of the decision
//! function, so they can disagree with `predict_proba > 0.5` near the margin.

use super::{Classifier, check_fit_input, check_predict_input, not_fitted};
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const NAME: &str = "SVM";
const TAU: f64 = 1e-12;
const PLATT_FOLDS: usize = 5;

#[derive(Debug, Clone)]
struct SvmModel {
    support: Array2<f64>,
    /// `alpha_i * y_i` for each support vector.
    dual_coef: Vec<f64>,
    rho: f64,
    gamma: f64,
}

impl SvmModel {
    fn decision(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.support
            .rows()
            .into_iter()
            .zip(&self.dual_coef)
            .map(|(sv, &coef)| coef * rbf(sv, row, self.gamma))
            .sum::<f64>()
            - self.rho
    }
}

#[derive(Debug, Clone)]
pub struct SvmClassifier {
    pub c: f64,
    /// `None` means `1 / (n_features * var(X))`.
    pub gamma: Option<f64>,
    pub tol: f64,
    pub probability: bool,
    pub seed: u64,
    model: Option<SvmModel>,
    /// Platt sigmoid `(A, B)`: `P(y=1 | f) = 1 / (1 + exp(A f + B))`.
    platt: Option<(f64, f64)>,
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self::new(1.0, true, 42)
    }
}

impl SvmClassifier {
    pub fn new(c: f64, probability: bool, seed: u64) -> Self {
        Self {
            c,
            gamma: None,
            tol: 1e-3,
            probability,
            seed,
            model: None,
            platt: None,
        }
    }

    pub fn n_support(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.dual_coef.len())
    }

    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_predict_input(NAME, x, model.support.ncols())?;
        Ok(x.rows().into_iter().map(|row| model.decision(row)).collect())
    }
}

fn rbf(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>, gamma: f64) -> f64 {
    let d2: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum();
    (-gamma * d2).exp()
}

fn scale_gamma(x: ArrayView2<'_, f64>) -> f64 {
    let n = x.len() as f64;
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

/// Dual solution `(alpha, rho)` of C-SVC for labels in `{-1, +1}`.
fn solve_dual(kernel: &Array2<f64>, y: &[f64], c: f64, eps: f64) -> (Vec<f64>, f64) {
    let n = y.len();
    let mut alpha = vec![0.0; n];
    let mut grad = vec![-1.0; n];
    let max_iter = (100 * n).max(10_000_000);
    let q = |i: usize, j: usize| y[i] * y[j] * kernel[[i, j]];

    let mut iter = 0;
    while iter < max_iter {
        iter += 1;

        // i: maximal violator in I_up
        let mut g_max = f64::NEG_INFINITY;
        let mut i = usize::MAX;
        for t in 0..n {
            let up = if y[t] > 0.0 { alpha[t] < c } else { alpha[t] > 0.0 };
            if up && -y[t] * grad[t] >= g_max {
                g_max = -y[t] * grad[t];
                i = t;
            }
        }
        if i == usize::MAX {
            break;
        }

        // j: second-order choice in I_low
        let mut g_max2 = f64::NEG_INFINITY;
        let mut j = usize::MAX;
        let mut obj_min = f64::INFINITY;
        for t in 0..n {
            let low = if y[t] > 0.0 { alpha[t] > 0.0 } else { alpha[t] < c };
            if !low {
                continue;
            }
            let yg = y[t] * grad[t];
            g_max2 = g_max2.max(yg);
            let grad_diff = g_max + yg;
            if grad_diff > 0.0 {
                let mut quad = kernel[[i, i]] + kernel[[t, t]] - 2.0 * kernel[[i, t]];
                if quad <= 0.0 {
                    quad = TAU;
                }
                let obj = -(grad_diff * grad_diff) / quad;
                if obj <= obj_min {
                    obj_min = obj;
                    j = t;
                }
            }
        }
        if g_max + g_max2 < eps || j == usize::MAX {
            break;
        }

        let (old_i, old_j) = (alpha[i], alpha[j]);
        let mut quad = kernel[[i, i]] + kernel[[j, j]] - 2.0 * kernel[[i, j]];
        if quad <= 0.0 {
            quad = TAU;
        }
        if y[i] != y[j] {
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for k in 0..n {
            grad[k] += q(i, k) * d_i + q(j, k) * d_j;
        }
    }
    if iter >= max_iter {
        tracing::warn!(max_iter, "SVM solver reached the iteration limit");
    }

    let (mut ub, mut lb) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut n_free, mut sum_free) = (0usize, 0.0);
    for t in 0..n {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else {
            n_free += 1;
            sum_free += yg;
        }
    }
    let rho = if n_free > 0 {
        sum_free / n_free as f64
    } else {
        (ub + lb) / 2.0
    };
    (alpha, rho)
}

fn train(x: ArrayView2<'_, f64>, y: &[f64], c: f64, gamma: f64, eps: f64) -> SvmModel {
    let n = y.len();
    let kernel = Array2::from_shape_fn((n, n), |(i, j)| rbf(x.row(i), x.row(j), gamma));
    let (alpha, rho) = solve_dual(&kernel, y, c, eps);
    let support_idx: Vec<usize> = (0..n).filter(|&i| alpha[i] > 0.0).collect();
    SvmModel {
        support: x.select(Axis(0), &support_idx),
        dual_coef: support_idx.iter().map(|&i| alpha[i] * y[i]).collect(),
        rho,
        gamma,
    }
}

/// Fit `(A, B)` minimising the regularised log-loss of `1 / (1 + exp(A f + B))`.
fn sigmoid_train(dec: &[f64], y: &[f64]) -> (f64, f64) {
    let prior1 = y.iter().filter(|&&v| v > 0.0).count() as f64;
    let prior0 = y.len() as f64 - prior1;
    let hi = (prior1 + 1.0) / (prior1 + 2.0);
    let lo = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = y.iter().map(|&v| if v > 0.0 { hi } else { lo }).collect();

    let objective = |a: f64, b: f64| -> f64 {
        dec.iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let z = f * a + b;
                if z >= 0.0 {
                    t * z + (-z).exp().ln_1p()
                } else {
                    (t - 1.0) * z + z.exp().ln_1p()
                }
            })
            .sum()
    };

    let (mut a, mut b) = (0.0, ((prior0 + 1.0) / (prior1 + 1.0)).ln());
    let mut fval = objective(a, b);
    for _ in 0..100 {
        let (mut h11, mut h22, mut h21, mut g1, mut g2) = (TAU, TAU, 0.0, 0.0, 0.0);
        for (&f, &t) in dec.iter().zip(&targets) {
            let z = f * a + b;
            let (p, q) = if z >= 0.0 {
                let e = (-z).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = z.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }
        if g1.abs() < 1e-5 && g2.abs() < 1e-5 {
            break;
        }
        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= 1e-10 {
            let (na, nb) = (a + step * da, b + step * db);
            let nf = objective(na, nb);
            if nf < fval + 1e-4 * step * gd {
                a = na;
                b = nb;
                fval = nf;
                break;
            }
            step /= 2.0;
        }
        if step < 1e-10 {
            tracing::debug!("Platt scaling line search stalled");
            break;
        }
    }
    (a, b)
}

impl Classifier for SvmClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        if self.c <= 0.0 || self.c.is_nan() {
            return Err(BenchError::model("SVM: C must be positive"));
        }
        let gamma = self.gamma.unwrap_or_else(|| scale_gamma(x));
        let signs: Vec<f64> = y.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();
        let model = train(x, &signs, self.c, gamma, self.tol);
        tracing::debug!(support = model.dual_coef.len(), gamma, "Fitted SVM");

        self.platt = if self.probability {
            let n = signs.len();
            let mut perm: Vec<usize> = (0..n).collect();
            perm.shuffle(&mut StdRng::seed_from_u64(self.seed));
            let mut dec = vec![0.0; n];
            for fold in 0..PLATT_FOLDS {
                let (start, end) = (fold * n / PLATT_FOLDS, (fold + 1) * n / PLATT_FOLDS);
                let held = &perm[start..end];
                let rest: Vec<usize> = perm[..start].iter().chain(&perm[end..]).copied().collect();
                let rest_y: Vec<f64> = rest.iter().map(|&i| signs[i]).collect();
                let positives = rest_y.iter().filter(|&&v| v > 0.0).count();
                if positives == 0 || positives == rest_y.len() {
                    // one-class fold: every held-out row gets that class's sign
                    let fill = if positives > 0 { 1.0 } else if rest_y.is_empty() { 0.0 } else { -1.0 };
                    held.iter().for_each(|&i| dec[i] = fill);
                    continue;
                }
                let sub = train(x.select(Axis(0), &rest).view(), &rest_y, self.c, gamma, self.tol);
                for &i in held {
                    dec[i] = sub.decision(x.row(i));
                }
            }
            Some(sigmoid_train(&dec, &signs))
        } else {
            None
        };
        self.model = Some(model);
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        let dec = self.decision_function(x)?;
        Ok(match self.platt {
            Some((a, b)) => dec.mapv(|f| {
                let z = a * f + b;
                if z >= 0.0 {
                    (-z).exp() / (1.0 + (-z).exp())
                } else {
                    1.0 / (1.0 + z.exp())
                }
            }),
            None => dec.mapv(super::sigmoid),
        })
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<u8>, BenchError> {
        Ok(self.decision_function(x)?.mapv(|f| u8::from(f > 0.0)))
    }
}
