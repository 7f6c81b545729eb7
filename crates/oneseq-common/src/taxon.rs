//! Taxon naming.
//!
//! A registered taxon is identified by `CODE@NCBIID@VERSION`, e.g.
//! `HUMAN@9606@3`: a short uppercase mnemonic, the NCBI taxonomy id, and the
//! version of the installed proteome data. The spec string doubles as the
//! directory name under `genome_dir`, so parsing has to be strict.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OneSeqError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxonSpec {
    pub code: String,
    pub ncbi_id: u32,
    pub version: u32,
}

impl TaxonSpec {
    pub fn new(code: impl Into<String>, ncbi_id: u32, version: u32) -> crate::Result<Self> {
        let code = code.into();
        validate_code(&code).map_err(|reason| OneSeqError::InvalidTaxon {
            spec: format!("{code}@{ncbi_id}@{version}"),
            reason,
        })?;
        Ok(Self { code, ncbi_id, version })
    }

    /// The `ncbi<taxid>` form used in phyloprofile output.
    pub fn ncbi_label(&self) -> String {
        format!("ncbi{}", self.ncbi_id)
    }
}

fn validate_code(code: &str) -> std::result::Result<(), String> {
    if code.is_empty() {
        return Err("empty taxon code".to_string());
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("taxon code must be uppercase alphanumeric".to_string());
    }
    Ok(())
}

impl FromStr for TaxonSpec {
    type Err = OneSeqError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: &str| OneSeqError::InvalidTaxon {
            spec: s.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = s.split('@');
        let (code, id, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(i), Some(v), None) => (c, i, v),
            _ => return Err(invalid("expected CODE@NCBIID@VERSION")),
        };
        validate_code(code).map_err(|reason| OneSeqError::InvalidTaxon {
            spec: s.to_string(),
            reason,
        })?;
        let ncbi_id: u32 = id
            .parse()
            .map_err(|_| invalid("NCBI id is not a number"))?;
        let version: u32 = version
            .parse()
            .map_err(|_| invalid("version is not a number"))?;
        Ok(Self { code: code.to_string(), ncbi_id, version })
    }
}

impl fmt::Display for TaxonSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}@{}", self.code, self.ncbi_id, self.version)
    }
}

impl TryFrom<String> for TaxonSpec {
    type Error = OneSeqError;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TaxonSpec> for String {
    fn from(spec: TaxonSpec) -> String {
        spec.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip() {
        let spec: TaxonSpec = "HUMAN@9606@3".parse().unwrap();
        assert_eq!(spec.code, "HUMAN");
        assert_eq!(spec.ncbi_id, 9606);
        assert_eq!(spec.version, 3);
        assert_eq!(spec.to_string(), "HUMAN@9606@3");
    }

    #[test]
    fn test_ncbi_label() {
        let spec: TaxonSpec = "YEAST@4932@1".parse().unwrap();
        assert_eq!(spec.ncbi_label(), "ncbi4932");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "HUMAN",
            "HUMAN@9606",
            "HUMAN@9606@3@4",
            "human@9606@3",
            "HU MAN@9606@3",
            "HUMAN@x@3",
            "HUMAN@9606@x",
        ] {
            assert!(bad.parse::<TaxonSpec>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_serde_as_string() {
        let spec: TaxonSpec = "DROME@7227@2".parse().unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, "\"DROME@7227@2\"");
        let back: TaxonSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
