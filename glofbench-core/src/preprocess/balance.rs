//! SMOTE: synthetic minority oversampling.
//!
//! Each synthetic row is an interpolation `x + u * (neighbour - x)` between a
//! randomly chosen minority sample and one of its `k` nearest minority
//! neighbours, with `u ~ U[0, 1)`. Original rows keep their positions and the
//! synthetic rows are appended, so the output is `[original; synthetic]`.

use crate::data::dataset::Dataset;
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, Axis, concatenate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// SMOTE parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    /// Return a dataset whose two classes have equal counts.
    pub fn fit_resample(&self, dataset: &Dataset) -> Result<Dataset, BenchError> {
        let [negatives, positives] = dataset.class_counts();
        if negatives == 0 || positives == 0 {
            return Err(BenchError::balance(format!(
                "both classes must be present (negatives = {negatives}, positives = {positives})"
            )));
        }
        if negatives == positives {
            tracing::info!(per_class = negatives, "Classes already balanced");
            return Ok(dataset.clone());
        }

        let (minority_label, n_minority, n_majority) = if positives < negatives {
            (1u8, positives, negatives)
        } else {
            (0u8, negatives, positives)
        };
        if self.k_neighbors == 0 {
            return Err(BenchError::balance("k_neighbors must be at least 1"));
        }
        if n_minority < self.k_neighbors + 1 {
            return Err(BenchError::balance(format!(
                "minority class has {n_minority} samples; SMOTE with k_neighbors = {} needs at least {}",
                self.k_neighbors,
                self.k_neighbors + 1
            )));
        }

        let minority_idx: Vec<usize> = dataset
            .y
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == minority_label)
            .map(|(i, _)| i)
            .collect();
        let minority = dataset.x.select(Axis(0), &minority_idx);
        let neighbours = nearest_neighbours(&minority, self.k_neighbors);

        let n_synthetic = n_majority - n_minority;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic = Array2::<f64>::zeros((n_synthetic, dataset.n_features()));
        for mut out in synthetic.rows_mut() {
            let pick = rng.gen_range(0..n_minority * self.k_neighbors);
            let (row, slot) = (pick / self.k_neighbors, pick % self.k_neighbors);
            let step: f64 = rng.r#gen();
            let base = minority.row(row);
            let other = minority.row(neighbours[row][slot]);
            out.assign(&(&base + &((&other - &base) * step)));
        }

        let x = concatenate(Axis(0), &[dataset.x.view(), synthetic.view()])
            .map_err(|e| BenchError::balance(e.to_string()))?;
        let y = concatenate(
            Axis(0),
            &[
                dataset.y.view(),
                Array1::from_elem(n_synthetic, minority_label).view(),
            ],
        )
        .map_err(|e| BenchError::balance(e.to_string()))?;

        tracing::info!(
            minority_label,
            synthetic = n_synthetic,
            per_class = n_majority,
            "Oversampled minority class"
        );
        Dataset::new(x, y, dataset.feature_names.clone())
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum()
}

/// For every row, the indices of its `k` nearest other rows (ties broken by index).
fn nearest_neighbours(points: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = points.nrows();
    (0..n)
        .map(|i| {
            let mut others: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (squared_distance(points.row(i), points.row(j)), j))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            others.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn imbalanced() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.extend_from_slice(&[i as f64, (i * 2) as f64]);
            labels.push(0u8);
        }
        for i in 0..6 {
            rows.extend_from_slice(&[100.0 + i as f64, 50.0 - i as f64]);
            labels.push(1u8);
        }
        Dataset::new(
            Array2::from_shape_vec((26, 2), rows).unwrap(),
            Array1::from_vec(labels),
            vec!["a".into(), "b".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_classes_equalised() {
        let out = Smote::default().fit_resample(&imbalanced()).unwrap();
        assert_eq!(out.class_counts(), [20, 20]);
        assert_eq!(out.n_samples(), 40);
    }

    #[test]
    fn test_originals_preserved_and_synthetic_within_hull() {
        let input = imbalanced();
        let out = Smote::default().fit_resample(&input).unwrap();
        assert_eq!(out.x.slice(ndarray::s![..26, ..]), input.x);
        for row in out.x.slice(ndarray::s![26.., ..]).rows() {
            assert!((100.0..=105.0).contains(&row[0]));
            assert!((45.0..=50.0).contains(&row[1]));
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = Smote::new(5, 42).fit_resample(&imbalanced()).unwrap();
        let b = Smote::new(5, 42).fit_resample(&imbalanced()).unwrap();
        let c = Smote::new(5, 7).fit_resample(&imbalanced()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.x, c.x);
    }

    #[test]
    fn test_too_few_minority_samples() {
        let ds = Dataset::new(
            array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]],
            array![0, 0, 0, 0, 0, 1, 1, 1],
            vec!["a".into()],
        )
        .unwrap();
        let err = Smote::default().fit_resample(&ds).unwrap_err();
        assert!(matches!(err, BenchError::Balance(_)));
        assert!(Smote::new(2, 42).fit_resample(&ds).is_ok());
    }

    #[test]
    fn test_single_class_rejected() {
        let ds = Dataset::new(array![[0.0], [1.0]], array![1, 1], vec!["a".into()]).unwrap();
        assert!(Smote::default().fit_resample(&ds).is_err());
    }

    #[test]
    fn test_already_balanced_is_identity() {
        let ds = Dataset::new(array![[0.0], [1.0]], array![0, 1], vec!["a".into()]).unwrap();
        assert_eq!(Smote::default().fit_resample(&ds).unwrap(), ds);
    }

    #[test]
    fn test_majority_positive() {
        let ds = Dataset::new(
            array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0], [13.0], [14.0]],
            array![0, 0, 0, 1, 1, 1, 1, 1],
            vec!["a".into()],
        )
        .unwrap();
        let out = Smote::new(2, 1).fit_resample(&ds).unwrap();
        assert_eq!(out.class_counts(), [5, 5]);
        assert!(out.x.slice(ndarray::s![8.., 0]).iter().all(|v| *v <= 2.0));
    }

    #[test]
    fn test_nearest_neighbours_excludes_self() {
        let pts = array![[0.0], [1.0], [3.0], [10.0]];
        let nn = nearest_neighbours(&pts, 2);
        assert_eq!(nn[0], vec![1, 2]);
        assert_eq!(nn[3], vec![2, 1]);
    }
}
