//! Shared testing utilities for the oneSeq workspace.
//!
//! Builds throwaway data roots with synthetic proteomes, search indexes,
//! annotations, and a small taxonomy, so integration tests can exercise the
//! pipeline without shipping reference data.

use anyhow::Result;
use tempfile::TempDir;

use oneseq_align::kmer::KmerIndex;
use oneseq_annotation::annotate_proteome;
use oneseq_common::fasta::FastaRecord;
use oneseq_common::taxon::TaxonSpec;
use oneseq_data::{AnnotationRepository, DataRoot, GenomeRepository, IndexRepository};

/// A protein record from string parts.
pub fn protein(id: &str, seq: &str) -> FastaRecord {
    FastaRecord::new(id, seq.as_bytes().to_vec())
}

/// Derives a homolog: every `period`-th residue is swapped for a
/// biochemically similar one, so alignments stay strong but not identical.
pub fn diverge(seq: &str, period: usize) -> String {
    assert!(period > 0);
    seq.bytes()
        .enumerate()
        .map(|(i, b)| {
            if (i + 1) % period == 0 {
                similar_residue(b) as char
            } else {
                b as char
            }
        })
        .collect()
}

fn similar_residue(b: u8) -> u8 {
    match b {
        b'L' => b'I',
        b'I' => b'V',
        b'V' => b'I',
        b'K' => b'R',
        b'R' => b'K',
        b'D' => b'E',
        b'E' => b'D',
        b'S' => b'T',
        b'T' => b'S',
        b'F' => b'Y',
        b'Y' => b'F',
        b'N' => b'Q',
        b'Q' => b'N',
        b'A' => b'G',
        b'G' => b'A',
        other => other,
    }
}

/// A sequence with no local similarity to `seq`: same length, but built from
/// a fixed low-complexity-free rotation of the residue alphabet.
pub fn unrelated(len: usize) -> String {
    const POOL: &[u8] = b"MGKWHPCERDANTQSVFYLI";
    (0..len).map(|i| POOL[(i * 7 + 3) % POOL.len()] as char).collect()
}

// ── Data root builder ─────────────────────────────────────────────────────────

/// A temporary, fully laid-out data root. Dropped with the test.
pub struct TestDataRoot {
    dir: TempDir,
    root: DataRoot,
}

impl TestDataRoot {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let root = DataRoot::new(dir.path());
        root.ensure_layout()?;
        Ok(Self { dir, root })
    }

    pub fn root(&self) -> DataRoot {
        self.root.clone()
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Registers a taxon: proteome, k-mer index, and feature annotation.
    pub fn add_taxon(&self, spec: &str, proteins: &[(&str, &str)]) -> Result<TaxonSpec> {
        let spec: TaxonSpec = spec.parse()?;
        let records: Vec<FastaRecord> =
            proteins.iter().map(|(id, seq)| protein(id, seq)).collect();
        GenomeRepository::new(self.root()).save(&spec, &records, None, true)?;
        IndexRepository::new(self.root()).save(&spec, &KmerIndex::build(&records))?;
        AnnotationRepository::new(self.root()).save(&spec, &annotate_proteome(&spec, &records))?;
        Ok(spec)
    }

    /// Writes the taxonomy table from `(tax_id, parent_id, rank, name)` rows.
    pub fn write_taxonomy(&self, rows: &[(u32, u32, &str, &str)]) -> Result<()> {
        let mut text = String::new();
        for (id, parent, rank, name) in rows {
            text.push_str(&format!("{id}\t{parent}\t{rank}\t{name}\n"));
        }
        std::fs::write(self.root.taxonomy_file(), text)?;
        Ok(())
    }

    /// A minimal vertebrate/fungus taxonomy covering the taxa the synthetic
    /// fixtures use: human (9606), mouse (10090), and baker's yeast (559292).
    pub fn write_default_taxonomy(&self) -> Result<()> {
        self.write_taxonomy(&[
            (131567, 131567, "no rank", "cellular organisms"),
            (2759, 131567, "superkingdom", "Eukaryota"),
            (33208, 2759, "kingdom", "Metazoa"),
            (7711, 33208, "phylum", "Chordata"),
            (40674, 7711, "class", "Mammalia"),
            (9443, 40674, "order", "Primates"),
            (9604, 9443, "family", "Hominidae"),
            (9605, 9604, "genus", "Homo"),
            (9606, 9605, "species", "Homo sapiens"),
            (9989, 40674, "order", "Rodentia"),
            (10088, 9989, "genus", "Mus"),
            (10090, 10088, "species", "Mus musculus"),
            (4751, 2759, "kingdom", "Fungi"),
            (4890, 4751, "phylum", "Ascomycota"),
            (4891, 4890, "class", "Saccharomycetes"),
            (4892, 4891, "order", "Saccharomycetales"),
            (4930, 4892, "genus", "Saccharomyces"),
            (559292, 4930, "species", "Saccharomyces cerevisiae"),
        ])
    }
}

/// A 60-residue seed with a signal peptide, a transmembrane stretch, and a
/// hydrophilic tail, so the feature detectors have something to find.
pub const SEED_SEQ: &str = "MKWVTFISLLFLFSSAYSRGVFRRDAHKSEVAHRFKDLGEENFKALVLIAFAQYLQQCPF";
