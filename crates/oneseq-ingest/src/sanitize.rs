//! Protein id sanitization.
//!
//! The extended-FASTA output uses `|` as a field separator, so ids coming in
//! from arbitrary proteome files must not contain it. Reserved characters
//! are replaced with `_`; collisions introduced by the replacement get a
//! numeric suffix.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use oneseq_common::fasta::FastaRecord;

fn reserved() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `|`, whitespace, and control characters.
    RE.get_or_init(|| Regex::new(r"[|\s\x00-\x1f\x7f]").unwrap())
}

pub fn sanitize_id(id: &str) -> String {
    reserved().replace_all(id, "_").into_owned()
}

/// Sanitizes every record id in place. Returns `original -> sanitized` pairs
/// for ids that changed (including collision suffixes).
pub fn sanitize_records(records: &mut [FastaRecord]) -> Vec<(String, String)> {
    let mut mapping = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();
    for rec in records.iter_mut() {
        let original = rec.id.clone();
        let mut sanitized = sanitize_id(&original);
        if taken.contains(&sanitized) {
            let mut n = 2;
            while taken.contains(&format!("{sanitized}_{n}")) {
                n += 1;
            }
            sanitized = format!("{sanitized}_{n}");
        }
        taken.insert(sanitized.clone());
        if sanitized != original {
            mapping.push((original, sanitized.clone()));
            rec.id = sanitized;
        }
    }
    mapping
}

/// Derives a taxon code from a file stem: uppercase alphanumerics only,
/// truncated to ten characters.
pub fn derive_code(stem: &str) -> Option<String> {
    let code: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(10)
        .collect();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}
