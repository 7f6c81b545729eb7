//! oneseq-fas — feature architecture similarity (FAS) scoring.
//!
//! A native replacement for the external greedy scoring package: orthologs
//! accepted by the sequence search are scored against the seed by comparing
//! their feature architectures in both directions.

pub mod linearize;
pub mod scorer;
pub mod weights;

pub use scorer::{DirectionReport, DomainRow, FasConfig, FasScorer, FasScores};
pub use weights::WeightMode;
