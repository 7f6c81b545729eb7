//! oneseq-align — local alignment, k-mer candidate index, and sequence profiles.
//!
//! This crate is the search backend: a BLOSUM62 affine-gap Smith-Waterman
//! aligner with a k-mer prefilter stands in for an external BLAST
//! installation, and a position-specific scoring profile built from the core
//! ortholog group stands in for a profile HMM. Everything here is pure CPU
//! work; the search pipeline runs it under `spawn_blocking`.

pub mod blosum;
pub mod kmer;
pub mod pairwise;
pub mod profile;

pub use kmer::KmerIndex;
pub use pairwise::{align_local, normalized_score, self_score, Alignment, GapPenalties};
pub use profile::SequenceProfile;
