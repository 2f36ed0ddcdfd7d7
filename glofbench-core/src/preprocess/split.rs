//! Stratified train/test partitioning.

use crate::data::dataset::Dataset;
use crate::error::BenchError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Stratified split parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StratifiedSplit {
    /// Fraction of rows held out, in `(0, 1)`.
    pub test_size: f64,
    pub seed: u64,
}

impl Default for StratifiedSplit {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Train and test partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTest {
    pub train: Dataset,
    pub test: Dataset,
}

impl StratifiedSplit {
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }

    pub fn split(&self, dataset: &Dataset) -> Result<TrainTest, BenchError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(BenchError::split(format!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            )));
        }
        let counts = dataset.class_counts();
        if let Some(label) = counts.iter().position(|&c| c < 2) {
            return Err(BenchError::split(format!(
                "class {label} has {} member(s); stratification needs at least 2",
                counts[label]
            )));
        }

        let n = dataset.n_samples();
        let n_test = (n as f64 * self.test_size).ceil() as usize;
        let per_class_test = allocate(&counts, n_test);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut train_idx = Vec::with_capacity(n - n_test);
        let mut test_idx = Vec::with_capacity(n_test);
        for (label, &take) in per_class_test.iter().enumerate() {
            let mut members: Vec<usize> = dataset
                .y
                .iter()
                .enumerate()
                .filter(|&(_, &y)| usize::from(y) == label)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);
            test_idx.extend_from_slice(&members[..take]);
            train_idx.extend_from_slice(&members[take..]);
        }
        train_idx.shuffle(&mut rng);
        test_idx.shuffle(&mut rng);

        tracing::info!(
            train = train_idx.len(),
            test = test_idx.len(),
            "Stratified train/test split"
        );
        Ok(TrainTest {
            train: dataset.select(&train_idx),
            test: dataset.select(&test_idx),
        })
    }
}

/// Share `n_test` across classes proportionally (largest remainder), keeping
/// at least one train and one test sample per class.
fn allocate(counts: &[usize; 2], n_test: usize) -> [usize; 2] {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n as f64)
        .collect();
    let mut alloc = [exact[0].floor() as usize, exact[1].floor() as usize];

    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(counts[b].cmp(&counts[a]))
    });
    let mut remaining = n_test.saturating_sub(alloc.iter().sum());
    for &class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        alloc[class] += 1;
        remaining -= 1;
    }

    for (take, &count) in alloc.iter_mut().zip(counts.iter()) {
        *take = (*take).clamp(1, count - 1);
    }
    alloc
}
