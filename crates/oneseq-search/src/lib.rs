//! Profile-based ortholog search.
//!
//! Compiles a core ortholog group around a seed protein, searches target
//! proteomes with the group's sequence profile, confirms hits by reciprocity
//! against the reference taxon, and scores accepted orthologs by feature
//! architecture similarity.

pub mod backend;
pub mod core;
pub mod job;
pub mod pipeline;

pub use backend::{is_reciprocal, profile_hits, ProfileHit, TaxonData};
pub use core::{compile_core, load_seed, CoreGroup, CoreMember};
pub use job::{CoreOptions, SearchJob, SearchOptions};
pub use pipeline::{run_search, SearchProgress, SearchResult};
