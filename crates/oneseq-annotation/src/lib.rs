//! oneseq-annotation — sequence feature detection and architecture storage.
//!
//! Replaces the external annotation toolchain: four built-in detectors
//! (low complexity, transmembrane helix, signal peptide, coiled coil)
//! produce the feature architectures the FAS scorer compares. Externally
//! produced annotations in the same JSON shape can be merged in; on a
//! feature-name collision the imported instances win.

pub mod detectors;
pub mod hydropathy;
pub mod model;

pub use model::{Architecture, Feature, TaxonAnnotation};

use std::collections::BTreeSet;

use tracing::debug;

use oneseq_common::fasta::FastaRecord;
use oneseq_common::taxon::TaxonSpec;

/// Runs every detector over one protein.
pub fn annotate_record(rec: &FastaRecord) -> Architecture {
    let mut features = Vec::new();
    features.extend(detectors::signal_peptide(&rec.seq));
    features.extend(detectors::transmembrane(&rec.seq));
    features.extend(detectors::coiled_coil(&rec.seq));
    features.extend(detectors::low_complexity(&rec.seq));
    features.sort_by(|a, b| a.start.cmp(&b.start).then(a.name.cmp(&b.name)));
    Architecture { protein_id: rec.id.clone(), length: rec.len(), features }
}

/// Annotates a whole proteome.
pub fn annotate_proteome(taxon: &TaxonSpec, records: &[FastaRecord]) -> TaxonAnnotation {
    let mut anno = TaxonAnnotation::new(taxon.clone());
    for rec in records {
        anno.insert(annotate_record(rec));
    }
    debug!(
        taxon = %taxon,
        proteins = anno.architectures.len(),
        feature_names = anno.feature_counts.len(),
        "annotated proteome"
    );
    anno
}

/// Merges `imported` into `base`, protein by protein. For each imported
/// architecture, features whose names also exist in the imported set are
/// replaced wholesale; feature names only the base knows are kept.
/// Imported proteins unknown to the base are added as-is.
pub fn merge_imported(base: &mut TaxonAnnotation, imported: TaxonAnnotation) {
    for (protein_id, imp_arch) in imported.architectures {
        match base.architectures.get_mut(&protein_id) {
            Some(arch) => {
                let imported_names: BTreeSet<&str> =
                    imp_arch.features.iter().map(|f| f.name.as_str()).collect();
                arch.features.retain(|f| !imported_names.contains(f.name.as_str()));
                arch.features.extend(imp_arch.features);
                arch.features
                    .sort_by(|a, b| a.start.cmp(&b.start).then(a.name.cmp(&b.name)));
                if imp_arch.length > 0 {
                    arch.length = imp_arch.length;
                }
            }
            None => {
                base.architectures.insert(protein_id, imp_arch);
            }
        }
    }
    base.rebuild_counts();
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Feature;
    use pretty_assertions::assert_eq;

    fn spec() -> TaxonSpec {
        "HUMAN@9606@3".parse().unwrap()
    }

    fn feature(name: &str, start: usize, end: usize) -> Feature {
        Feature { name: name.to_string(), start, end, score: 0.0 }
    }

    #[test]
    fn test_annotate_record_combines_detectors() {
        // Signal-like leader followed by a low-complexity run.
        let mut seq = b"MK".to_vec();
        seq.extend_from_slice(&[b'L'; 14]);
        seq.extend_from_slice(b"DERSTNQKHG");
        seq.extend_from_slice(&[b'A'; 30]);
        seq.extend_from_slice(b"KHGFDEWQRSTY");
        let arch = annotate_record(&FastaRecord::new("p1", seq));
        let names: BTreeSet<&str> =
            arch.features.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains("signalp_signal"), "features: {:?}", arch.features);
        assert!(names.contains("seg_low"));
    }

    #[test]
    fn test_merge_imported_wins_on_name_identity() {
        let mut base = TaxonAnnotation::new(spec());
        base.insert(Architecture {
            protein_id: "p1".into(),
            length: 100,
            features: vec![feature("seg_low", 10, 20), feature("tmhmm_helix", 40, 60)],
        });

        let mut imported = TaxonAnnotation::new(spec());
        imported.insert(Architecture {
            protein_id: "p1".into(),
            length: 100,
            features: vec![feature("seg_low", 15, 30), feature("pfam_kinase", 1, 90)],
        });

        merge_imported(&mut base, imported);
        let arch = &base.architectures["p1"];
        // seg_low replaced, tmhmm_helix kept, pfam_kinase added.
        assert_eq!(
            arch.features,
            vec![
                feature("pfam_kinase", 1, 90),
                feature("seg_low", 15, 30),
                feature("tmhmm_helix", 40, 60),
            ]
        );
        assert_eq!(base.feature_counts.get("seg_low"), Some(&1));
        assert_eq!(base.feature_counts.get("pfam_kinase"), Some(&1));
    }

    #[test]
    fn test_merge_adds_unknown_proteins() {
        let mut base = TaxonAnnotation::new(spec());
        let mut imported = TaxonAnnotation::new(spec());
        imported.insert(Architecture {
            protein_id: "p9".into(),
            length: 50,
            features: vec![feature("pfam_kinase", 1, 50)],
        });
        merge_imported(&mut base, imported);
        assert!(base.architectures.contains_key("p9"));
        assert_eq!(base.feature_counts.get("pfam_kinase"), Some(&1));
    }
}
