//! CART classification trees (Gini impurity, weighted samples).

use super::binning::FeatureBins;
use super::{
    Classifier, balanced_class_weights, check_fit_input, check_predict_input, not_fitted,
};
use crate::error::BenchError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const NAME: &str = "DecisionTree";

/// How many features a node considers when searching for a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    /// `max(1, floor(sqrt(n_features)))`.
    Sqrt,
}

impl MaxFeatures {
    fn count(self, n_features: usize) -> usize {
        match self {
            Self::All => n_features,
            Self::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    /// Weighted share of class 1 among the training rows that reached this leaf.
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted CART tree. Rows with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq)]
pub struct CartTree {
    nodes: Vec<Node>,
}

/// Training inputs shared by every node of one tree build.
pub(crate) struct CartInputs<'a> {
    pub binned: &'a Array2<u32>,
    pub bins: &'a FeatureBins,
    pub y: ArrayView1<'a, u8>,
    /// Per-row weight; `indices` may repeat rows (bootstrap samples).
    pub weights: &'a [f64],
}

struct Candidate {
    feature: usize,
    bin: usize,
    score: f64,
}

impl CartTree {
    pub(crate) fn grow(
        inputs: &CartInputs<'_>,
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack = vec![(0usize, indices, 0usize)];

        while let Some((slot, idx, depth)) = stack.pop() {
            let (w0, w1) = class_weights_of(inputs, &idx);
            let value = if w0 + w1 > 0.0 { w1 / (w0 + w1) } else { 0.0 };

            let stop = w0 == 0.0
                || w1 == 0.0
                || idx.len() < params.min_samples_split
                || idx.len() < 2 * params.min_samples_leaf
                || params.max_depth.is_some_and(|d| depth >= d);
            let best = if stop {
                None
            } else {
                best_split(inputs, &idx, params, rng)
            };

            match best {
                None => nodes[slot] = Node::Leaf { value },
                Some(c) => {
                    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
                        .iter()
                        .partition(|&&i| inputs.binned[[i, c.feature]] as usize <= c.bin);
                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes[slot] = Node::Split {
                        feature: c.feature,
                        threshold: inputs.bins.threshold(c.feature, c.bin),
                        left,
                        right,
                    };
                    stack.push((right, right_idx, depth + 1));
                    stack.push((left, left_idx, depth + 1));
                }
            }
        }
        Self { nodes }
    }

    /// Positive-class share at the leaf `row` falls into.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

fn class_weights_of(inputs: &CartInputs<'_>, idx: &[usize]) -> (f64, f64) {
    idx.iter().fold((0.0, 0.0), |(w0, w1), &i| {
        if inputs.y[i] == 1 {
            (w0, w1 + inputs.weights[i])
        } else {
            (w0 + inputs.weights[i], w1)
        }
    })
}

/// `W * gini` for a node with class weights `w0`, `w1`.
fn weighted_gini(w0: f64, w1: f64) -> f64 {
    let w = w0 + w1;
    if w <= 0.0 {
        0.0
    } else {
        w - (w0 * w0 + w1 * w1) / w
    }
}

fn best_split(
    inputs: &CartInputs<'_>,
    idx: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<Candidate> {
    let n_features = inputs.bins.n_features();
    let mut order: Vec<usize> = (0..n_features).collect();
    order.shuffle(rng);
    let budget = params.max_features.count(n_features);

    let (total0, total1) = class_weights_of(inputs, idx);
    let parent = weighted_gini(total0, total1);
    let mut best: Option<Candidate> = None;
    let mut visited = 0;
    let mut sorted = idx.to_vec();

    for feature in order {
        if visited >= budget {
            break;
        }
        sorted.sort_by_key(|&i| inputs.binned[[i, feature]]);
        let first = inputs.binned[[sorted[0], feature]];
        let last = inputs.binned[[sorted[sorted.len() - 1], feature]];
        if first == last {
            continue;
        }
        visited += 1;

        let (mut l0, mut l1) = (0.0, 0.0);
        for k in 0..sorted.len() - 1 {
            let i = sorted[k];
            if inputs.y[i] == 1 {
                l1 += inputs.weights[i];
            } else {
                l0 += inputs.weights[i];
            }
            let here = inputs.binned[[i, feature]];
            if here == inputs.binned[[sorted[k + 1], feature]] {
                continue;
            }
            let n_left = k + 1;
            if n_left < params.min_samples_leaf || sorted.len() - n_left < params.min_samples_leaf
            {
                continue;
            }
            let score =
                parent - weighted_gini(l0, l1) - weighted_gini(total0 - l0, total1 - l1);
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(Candidate {
                    feature,
                    bin: here as usize,
                    score,
                });
            }
        }
    }
    best
}

/// Single CART tree classifier, optionally with balanced class weights.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    pub params: TreeParams,
    pub balanced: bool,
    pub seed: u64,
    tree: Option<CartTree>,
    n_features: usize,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams, balanced: bool, seed: u64) -> Self {
        Self {
            params,
            balanced,
            seed,
            tree: None,
            n_features: 0,
        }
    }

    pub fn tree(&self) -> Option<&CartTree> {
        self.tree.as_ref()
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, u8>) -> Result<(), BenchError> {
        check_fit_input(NAME, x, y)?;
        let bins = FeatureBins::exact(x);
        let binned = bins.transform(x);
        let weights: Vec<f64> = if self.balanced {
            let cw = balanced_class_weights(y);
            y.iter().map(|&label| cw[usize::from(label)]).collect()
        } else {
            vec![1.0; y.len()]
        };
        let inputs = CartInputs {
            binned: &binned,
            bins: &bins,
            y: y.view(),
            weights: &weights,
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree = CartTree::grow(&inputs, (0..y.len()).collect(), &self.params, &mut rng);
        tracing::debug!(
            nodes = tree.node_count(),
            depth = tree.depth(),
            "Fitted decision tree"
        );
        self.tree = Some(tree);
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, BenchError> {
        let tree = self.tree.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_predict_input(NAME, x, self.n_features)?;
        Ok(tree.predict_proba(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::testing::{accuracy, blobs};
    use ndarray::array;

    #[test]
    fn test_fully_grown_tree_fits_training_data() {
        let (x, y) = blobs(30, 3);
        let mut model = DecisionTreeClassifier::new(TreeParams::default(), true, 42);
        model.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(x.view()).unwrap();
        assert_eq!(accuracy(&pred, &y), 1.0);
    }

    #[test]
    fn test_single_split_threshold_is_midpoint() {
        let x = array![[1.0], [2.0], [5.0], [6.0]];
        let y = array![0, 0, 1, 1];
        let mut model = DecisionTreeClassifier::new(TreeParams::default(), false, 0);
        model.fit(x.view(), y.view()).unwrap();
        let tree = model.tree().unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(array![3.5].view()), 0.0);
        assert_eq!(tree.predict_row(array![3.6].view()), 1.0);
    }

    #[test]
    fn test_max_depth_respected() {
        let (x, y) = blobs(30, 9);
        let params = TreeParams {
            max_depth: Some(2),
            ..Default::default()
        };
        let mut model = DecisionTreeClassifier::new(params, false, 1);
        model.fit(x.view(), y.view()).unwrap();
        assert!(model.tree().unwrap().depth() <= 2);
    }

    #[test]
    fn test_leaf_values_are_weighted_shares() {
        // identical features: no split possible, one leaf with the weighted class share
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = array![0, 0, 0, 1];
        let mut plain = DecisionTreeClassifier::new(TreeParams::default(), false, 0);
        plain.fit(x.view(), y.view()).unwrap();
        assert_eq!(plain.predict_proba(x.view()).unwrap()[0], 0.25);

        let mut balanced = DecisionTreeClassifier::new(TreeParams::default(), true, 0);
        balanced.fit(x.view(), y.view()).unwrap();
        assert!((balanced.predict_proba(x.view()).unwrap()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let (x, y) = blobs(5, 0);
        let mut model = DecisionTreeClassifier::new(TreeParams::default(), false, 0);
        model.fit(x.view(), y.view()).unwrap();
        assert!(model.predict(array![[1.0, 2.0, 3.0]].view()).is_err());
    }
}
