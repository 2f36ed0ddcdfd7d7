//! Feature engineering for the GLOF risk dataset.

pub mod builder;

pub use builder::{FeaturePlan, FeatureStep};
