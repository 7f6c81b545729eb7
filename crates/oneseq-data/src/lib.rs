//! oneseq-data — the data root: layout, repositories, and validation.

pub mod error;
pub mod layout;
pub mod repository;
pub mod validate;

pub use error::{DataError, Result};
pub use layout::DataRoot;
pub use repository::{
    AnnotationRepository, CoreGroupRepository, GenomeRepository, IndexRepository,
};
pub use validate::{validate_data_root, CheckIssue, CheckReport, Severity, ValidateOptions};
