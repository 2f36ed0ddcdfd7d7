//! Dataset preparation stages that run between feature building and evaluation.

pub mod balance;
pub mod normalize;
pub mod split;

pub use balance::Smote;
pub use normalize::{Standardizer, normalize};
pub use split::{StratifiedSplit, TrainTest};
