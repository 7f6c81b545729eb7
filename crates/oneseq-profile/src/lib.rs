//! oneseq-profile — phylogenetic profile outputs and run merging.

pub mod merge;
pub mod writers;

pub use merge::{merge_outputs, MergeReport};
pub use writers::{write_outputs, OrthologEntry, OutputPaths};
