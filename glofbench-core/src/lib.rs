//! # glofbench-core: GLOF risk classifier benchmark
//!
//! Loads a glacial-lake table, engineers flood-risk features, balances the
//! classes with SMOTE, standardizes, splits, and scores eleven binary
//! classifiers, writing the comparison to a spreadsheet.
//!
//! The stages are pure functions over immutable values:
//!
//! 1. [`data`]: delimited loading into a [`data::RecordTable`]
//! 2. [`features`]: interaction terms, log1p transforms and the risk label
//! 3. [`preprocess`]: SMOTE, z-score normalization, stratified split
//! 4. [`eval`]: the ordered classifier suite and its metrics
//! 5. [`report`]: the result table and its xlsx form
//!
//! [`pipeline::run`] composes them.

// Foundation
pub mod config;
pub mod error;

// Data preparation
pub mod data;
pub mod features;
pub mod preprocess;

// Models and evaluation
pub mod algorithms;
pub mod eval;

// Output
pub mod pipeline;
pub mod report;

// Re-exports
pub use config::{BenchConfig, FailurePolicy, load_config};
pub use error::BenchError;
pub use pipeline::{PipelineOutput, PipelineSummary, run};
