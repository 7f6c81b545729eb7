//! oneseq-common — Shared types, errors, and sequence I/O used across all oneseq crates.

pub mod error;
pub mod fasta;
pub mod seq;
pub mod taxon;

// Re-export commonly used types
pub use error::{OneSeqError, Result};
pub use fasta::FastaRecord;
pub use taxon::TaxonSpec;
