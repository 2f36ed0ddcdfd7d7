//! The ordered classifier suite.

use crate::algorithms::tree::TreeParams;
use crate::algorithms::{
    AdaBoostClassifier, BoostParams, Classifier, DecisionTreeClassifier, GaussianNaiveBayes,
    GradientBoostingClassifier, KnnClassifier, LogisticRegression, ObliviousBoostingClassifier,
    RandomForestClassifier, SvmClassifier,
};
use serde::{Deserialize, Serialize};

/// Classifier families and their hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    LogisticRegression {
        c: f64,
        max_iter: usize,
        balanced: bool,
    },
    RandomForest {
        n_estimators: usize,
        balanced: bool,
        seed: u64,
    },
    /// Depth-wise, leaf-wise and regularised boosting all share one engine.
    Boosting(BoostParams),
    ObliviousBoosting {
        iterations: usize,
        learning_rate: f64,
        depth: usize,
        l2_leaf_reg: f64,
    },
    Knn {
        n_neighbors: usize,
    },
    Svm {
        c: f64,
        probability: bool,
        seed: u64,
    },
    NaiveBayes {
        var_smoothing: f64,
    },
    DecisionTree {
        max_depth: Option<usize>,
        balanced: bool,
        seed: u64,
    },
    AdaBoost {
        n_estimators: usize,
        learning_rate: f64,
        seed: u64,
    },
}

impl ClassifierKind {
    /// Fresh, unfitted model for this configuration.
    pub fn build(&self) -> Box<dyn Classifier> {
        match self {
            Self::LogisticRegression {
                c,
                max_iter,
                balanced,
            } => Box::new(LogisticRegression::new(*c, *max_iter, *balanced)),
            Self::RandomForest {
                n_estimators,
                balanced,
                seed,
            } => Box::new(RandomForestClassifier::new(*n_estimators, *balanced, *seed)),
            Self::Boosting(params) => Box::new(GradientBoostingClassifier::new(*params)),
            Self::ObliviousBoosting {
                iterations,
                learning_rate,
                depth,
                l2_leaf_reg,
            } => {
                let mut model = ObliviousBoostingClassifier::new(*iterations, *learning_rate, *depth);
                model.l2_leaf_reg = *l2_leaf_reg;
                Box::new(model)
            }
            Self::Knn { n_neighbors } => Box::new(KnnClassifier::new(*n_neighbors)),
            Self::Svm {
                c,
                probability,
                seed,
            } => Box::new(SvmClassifier::new(*c, *probability, *seed)),
            Self::NaiveBayes { var_smoothing } => Box::new(GaussianNaiveBayes::new(*var_smoothing)),
            Self::DecisionTree {
                max_depth,
                balanced,
                seed,
            } => {
                let params = TreeParams {
                    max_depth: *max_depth,
                    ..TreeParams::default()
                };
                Box::new(DecisionTreeClassifier::new(params, *balanced, *seed))
            }
            Self::AdaBoost {
                n_estimators,
                learning_rate,
                seed,
            } => Box::new(AdaBoostClassifier::new(*n_estimators, *learning_rate, *seed)),
        }
    }
}

/// A named classifier configuration; the name is the report's row label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierSpec {
    pub name: String,
    pub kind: ClassifierKind,
}

impl ClassifierSpec {
    pub fn new(name: &str, kind: ClassifierKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// The eleven benchmark configurations, in report order.
pub fn default_suite(seed: u64) -> Vec<ClassifierSpec> {
    vec![
        ClassifierSpec::new(
            "Logistic Regression",
            ClassifierKind::LogisticRegression {
                c: 1.0,
                max_iter: 1000,
                balanced: true,
            },
        ),
        ClassifierSpec::new(
            "Random Forest",
            ClassifierKind::RandomForest {
                n_estimators: 100,
                balanced: true,
                seed,
            },
        ),
        ClassifierSpec::new(
            "Gradient Boosting",
            ClassifierKind::Boosting(BoostParams::gradient_boosting()),
        ),
        ClassifierSpec::new("XGBoost", ClassifierKind::Boosting(BoostParams::xgboost())),
        ClassifierSpec::new("LightGBM", ClassifierKind::Boosting(BoostParams::lightgbm())),
        ClassifierSpec::new(
            "CatBoost",
            ClassifierKind::ObliviousBoosting {
                iterations: 1000,
                learning_rate: 0.03,
                depth: 6,
                l2_leaf_reg: 3.0,
            },
        ),
        ClassifierSpec::new("KNN", ClassifierKind::Knn { n_neighbors: 5 }),
        ClassifierSpec::new(
            "SVM",
            ClassifierKind::Svm {
                c: 1.0,
                probability: true,
                seed,
            },
        ),
        ClassifierSpec::new(
            "Naive Bayes",
            ClassifierKind::NaiveBayes {
                var_smoothing: 1e-9,
            },
        ),
        ClassifierSpec::new(
            "Decision Tree",
            ClassifierKind::DecisionTree {
                max_depth: None,
                balanced: true,
                seed,
            },
        ),
        ClassifierSpec::new(
            "AdaBoost",
            ClassifierKind::AdaBoost {
                n_estimators: 100,
                learning_rate: 1.0,
                seed,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_order() {
        let names: Vec<String> = default_suite(42).into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "Logistic Regression",
                "Random Forest",
                "Gradient Boosting",
                "XGBoost",
                "LightGBM",
                "CatBoost",
                "KNN",
                "SVM",
                "Naive Bayes",
                "Decision Tree",
                "AdaBoost",
            ]
        );
    }

    #[test]
    fn test_seed_propagates() {
        let suite = default_suite(7);
        assert!(suite.iter().any(|s| matches!(
            s.kind,
            ClassifierKind::RandomForest { seed: 7, .. }
        )));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_value(ClassifierKind::Knn { n_neighbors: 5 }).unwrap();
        assert_eq!(json, serde_json::json!({ "knn": { "n_neighbors": 5 } }));
    }
}
