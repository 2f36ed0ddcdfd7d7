//! Per-feature split candidates.
//!
//! A feature's cut points are ascending thresholds; a value lands in bin `b`
//! when it is `<= cuts[b]` and greater than every earlier cut. Splitting
//! "after bin `b`" therefore means `value <= cuts[b]` goes left, which is how
//! fitted trees compare raw values at prediction time.

use ndarray::{Array2, ArrayView2};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBins {
    cuts: Vec<Vec<f64>>,
}

impl FeatureBins {
    /// One cut between every pair of adjacent distinct values.
    pub fn exact(x: ArrayView2<'_, f64>) -> Self {
        Self::with_max_bins(x, usize::MAX)
    }

    /// At most `max_bins` bins per feature, with cuts at value quantiles.
    pub fn with_max_bins(x: ArrayView2<'_, f64>, max_bins: usize) -> Self {
        let cuts = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut values: Vec<f64> = col.to_vec();
                values.sort_by(f64::total_cmp);
                feature_cuts(&values, max_bins.max(2))
            })
            .collect();
        Self { cuts }
    }

    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }

    /// Threshold separating bins `..=bin` from the rest.
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.cuts[feature][bin]
    }

    pub fn bin_of(&self, feature: usize, value: f64) -> usize {
        self.cuts[feature].partition_point(|&c| c < value)
    }

    /// Bin index of every cell of `x`.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<u32> {
        Array2::from_shape_fn(x.dim(), |(r, c)| self.bin_of(c, x[[r, c]]) as u32)
    }
}

fn feature_cuts(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut distinct = sorted.to_vec();
    distinct.dedup();
    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let n = sorted.len();
    let mut cuts: Vec<f64> = Vec::with_capacity(max_bins - 1);
    for k in 1..max_bins {
        let i = k * n / max_bins;
        if i == 0 || i >= n || sorted[i - 1] == sorted[i] {
            continue;
        }
        let cut = (sorted[i - 1] + sorted[i]) / 2.0;
        if cuts.last().is_none_or(|&last| cut > last) {
            cuts.push(cut);
        }
    }
    cuts
}
