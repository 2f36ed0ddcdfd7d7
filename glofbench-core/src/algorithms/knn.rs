//! Brute-force k-nearest-neighbours with uniform votes.

use super::{Classifier, check_fit_input, check_predict_input, not_fitted};
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

const NAME: &str = "KNN";

#[derive(Debug, Clone)]
pub struct KnnClassifier {
    pub k: usize,
    train: Option<(Array2<f64>, Array1<u8>)>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self { k, train: None }
    }
}

impl Classifier for KnnClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        if self.k == 0 || self.k > x.nrows() {
            return Err(BenchError::model(format!(
                "KNN: k={} needs 1..={} training rows",
                self.k,
                x.nrows()
            )));
        }
        self.train = Some((x.to_owned(), y.to_owned()));
        Ok(())
    }

    /// Share of positive labels among the `k` nearest training rows (Euclidean,
    /// ties broken by training order).
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        let (train_x, train_y) = self.train.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_predict_input(NAME, x, train_x.ncols())?;

        let mut dist: Vec<(f64, usize)> = Vec::with_capacity(train_x.nrows());
        let proba = x
            .rows()
            .into_iter()
            .map(|query| {
                dist.clear();
                dist.extend(train_x.rows().into_iter().enumerate().map(|(i, row)| {
                    let d: f64 = row
                        .iter()
                        .zip(query.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    (d, i)
                }));
                dist.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                let positives = dist[..self.k]
                    .iter()
                    .filter(|(_, i)| train_y[*i] == 1)
                    .count();
                positives as f64 / self.k as f64
            })
            .collect();
        Ok(proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::testing::{accuracy, blobs};
    use ndarray::array;

    #[test]
    fn test_separates_blobs() {
        let (x, y) = blobs(30, 41);
        let (xt, yt) = blobs(15, 42);
        let mut model = KnnClassifier::default();
        model.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(xt.view()).unwrap();
        assert!(accuracy(&pred, &yt) > 0.9);
    }

    #[test]
    fn test_vote_share() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![0, 1, 1, 0, 0];
        let mut model = KnnClassifier::new(3);
        model.fit(x.view(), y.view()).unwrap();
        let p = model.predict_proba(array![[1.0]].view()).unwrap();
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0]];
        let y = array![0, 1];
        assert!(KnnClassifier::new(5).fit(x.view(), y.view()).is_err());
    }
}
