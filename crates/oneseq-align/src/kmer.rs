//! k-mer candidate index.
//!
//! The prefilter that stands in for a BLAST database: every proteome gets an
//! index of its 5-mers, and a query is first ranked against it by shared
//! k-mer count. Only the top candidates are handed to the full aligner.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use oneseq_common::error::Result;
use oneseq_common::fasta::FastaRecord;
use oneseq_common::seq;

pub const DEFAULT_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub seq: u32,
    pub pos: u32,
}

/// A ranked prefilter hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub seq_index: usize,
    pub shared_kmers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmerIndex {
    k: usize,
    /// Protein ids in sequence-index order.
    ids: Vec<String>,
    map: HashMap<u64, Vec<Posting>>,
}

impl KmerIndex {
    pub fn build(records: &[FastaRecord]) -> Self {
        Self::build_with_k(records, DEFAULT_K)
    }

    pub fn build_with_k(records: &[FastaRecord], k: usize) -> Self {
        assert!(k > 0 && k <= 12, "k must fit 5-bit packing into u64");
        let mut map: HashMap<u64, Vec<Posting>> = HashMap::new();
        let mut ids = Vec::with_capacity(records.len());
        for (seq_idx, rec) in records.iter().enumerate() {
            ids.push(rec.id.clone());
            for (pos, key) in kmer_keys(&rec.seq, k) {
                map.entry(key).or_default().push(Posting {
                    seq: seq_idx as u32,
                    pos: pos as u32,
                });
            }
        }
        debug!(sequences = records.len(), kmers = map.len(), k, "built k-mer index");
        Self { k, ids, map }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn num_sequences(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Target sequences sharing at least `min_shared` distinct k-mers with
    /// the query, ranked by shared count (ties: lower sequence index first).
    pub fn candidates(&self, query: &[u8], min_shared: usize) -> Vec<Candidate> {
        let query_kmers: HashSet<u64> =
            kmer_keys(query, self.k).map(|(_, key)| key).collect();
        let mut shared: HashMap<u32, usize> = HashMap::new();
        for key in &query_kmers {
            if let Some(postings) = self.map.get(key) {
                let mut seen: HashSet<u32> = HashSet::new();
                for p in postings {
                    if seen.insert(p.seq) {
                        *shared.entry(p.seq).or_insert(0) += 1;
                    }
                }
            }
        }
        let mut out: Vec<Candidate> = shared
            .into_iter()
            .filter(|&(_, n)| n >= min_shared)
            .map(|(seq, n)| Candidate { seq_index: seq as usize, shared_kmers: n })
            .collect();
        out.sort_by(|a, b| {
            b.shared_kmers
                .cmp(&a.shared_kmers)
                .then(a.seq_index.cmp(&b.seq_index))
        });
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Iterator over (position, packed key) for every window consisting purely of
/// standard residues. 5 bits per residue.
fn kmer_keys(seq: &[u8], k: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
    seq.windows(k).enumerate().filter_map(|(pos, window)| {
        let mut key = 0u64;
        for &residue in window {
            key = (key << 5) | seq::standard_index(residue)? as u64;
        }
        Some((pos, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, seq: &[u8]) -> FastaRecord {
        FastaRecord::new(id, seq.to_vec())
    }

    #[test]
    fn test_finds_planted_homolog_above_noise() {
        let query = b"MKVLLTAEWQRSDDKHGF";
        let records = vec![
            rec("noise1", b"PPPPGGGGSSSSTTTTNNNNQQQQ"),
            rec("homolog", b"AAMKVLLTAEWQRSDDKHGFAA"),
            rec("noise2", b"WWWWYYYYFFFFHHHHCCCCMMMM"),
        ];
        let index = KmerIndex::build(&records);
        let hits = index.candidates(query, 1);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].seq_index, 1);
        assert_eq!(index.ids()[hits[0].seq_index], "homolog");
        // Full-length containment shares every query k-mer.
        assert_eq!(hits[0].shared_kmers, query.len() - DEFAULT_K + 1);
    }

    #[test]
    fn test_min_shared_filters() {
        let records = vec![rec("a", b"MKVLLTAEWQ"), rec("b", b"MKVLLGGGGG")];
        let index = KmerIndex::build(&records);
        // Query shares only one 5-mer (MKVLL) with "b".
        let strict = index.candidates(b"MKVLLTAEWQ", 2);
        assert!(strict.iter().all(|c| c.seq_index == 0));
    }

    #[test]
    fn test_nonstandard_residues_excluded_from_keys() {
        let records = vec![rec("x", b"MKXVL")];
        let index = KmerIndex::build(&records);
        // The only possible 5-mer contains X, so nothing is indexed.
        assert!(index.candidates(b"MKXVL", 1).is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.idx.json");
        let records = vec![rec("a", b"MKVLLTAEWQRSDD")];
        let index = KmerIndex::build(&records);
        index.save(&path).unwrap();
        let back = KmerIndex::load(&path).unwrap();
        assert_eq!(back.k(), index.k());
        assert_eq!(back.num_sequences(), 1);
        assert_eq!(
            back.candidates(b"MKVLLTAEWQRSDD", 1),
            index.candidates(b"MKVLLTAEWQRSDD", 1)
        );
    }
}
