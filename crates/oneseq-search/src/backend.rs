//! Per-taxon search primitives shared by core compilation and the final
//! search: loading a taxon's search data, running the profile against it,
//! and the reciprocity check against the reference proteome.

use anyhow::{Context, Result};
use tracing::trace;

use oneseq_align::pairwise::{align_local, normalized_score, self_score, GapPenalties};
use oneseq_align::{KmerIndex, SequenceProfile};
use oneseq_common::fasta::FastaRecord;
use oneseq_common::taxon::TaxonSpec;
use oneseq_data::{DataRoot, GenomeRepository, IndexRepository};

use crate::job::{SearchOptions, DEFAULT_MAX_CANDIDATES};

/// Everything needed to search one taxon, loaded once per job and taxon.
pub struct TaxonData {
    pub spec: TaxonSpec,
    pub records: Vec<FastaRecord>,
    pub index: KmerIndex,
}

impl TaxonData {
    pub fn load(root: &DataRoot, spec: &TaxonSpec) -> Result<Self> {
        let records = GenomeRepository::new(root.clone())
            .load(spec)
            .with_context(|| format!("loading proteome of {spec}"))?;
        let index = IndexRepository::new(root.clone())
            .load(spec)
            .with_context(|| format!("loading search index of {spec}"))?;
        Ok(Self { spec: spec.clone(), records, index })
    }
}

/// A profile hit in one taxon.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileHit {
    pub record_index: usize,
    pub raw_score: f64,
    pub norm_score: f64,
}

/// Runs the profile against a taxon: k-mer prefilter on the consensus, then
/// profile alignment of the top candidates. Hits at or above the accept
/// threshold, best first.
pub fn profile_hits(
    profile: &SequenceProfile,
    data: &TaxonData,
    accept_threshold: f64,
) -> Vec<ProfileHit> {
    let consensus = profile.consensus();
    let candidates = data.index.candidates(&consensus, 1);
    let mut hits = Vec::new();
    for cand in candidates.into_iter().take(DEFAULT_MAX_CANDIDATES) {
        let record = &data.records[cand.seq_index];
        let Some(aln) = profile.align(&record.seq, GapPenalties::default()) else {
            continue;
        };
        let norm = profile.normalized(aln.score);
        trace!(taxon = %data.spec, id = %record.id, norm, "profile candidate scored");
        if norm >= accept_threshold {
            hits.push(ProfileHit {
                record_index: cand.seq_index,
                raw_score: aln.score,
                norm_score: norm,
            });
        }
    }
    hits.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.record_index.cmp(&b.record_index))
    });
    hits
}

/// Reciprocity: the hit, searched back against the reference proteome, must
/// recover the seed. With `check_coorthologs_ref` a best hit other than the
/// seed also passes if it aligns to the seed at or above the accept
/// threshold (a co-ortholog within the reference).
pub fn is_reciprocal(
    hit_seq: &[u8],
    reference: &TaxonData,
    seed: &FastaRecord,
    opts: &SearchOptions,
) -> bool {
    let candidates = reference.index.candidates(hit_seq, 1);
    let mut best: Option<(usize, i32)> = None;
    for cand in candidates.into_iter().take(DEFAULT_MAX_CANDIDATES) {
        let record = &reference.records[cand.seq_index];
        if let Some(aln) = align_local(hit_seq, &record.seq, GapPenalties::default()) {
            if best.map(|(_, s)| aln.score > s).unwrap_or(true) {
                best = Some((cand.seq_index, aln.score));
            }
        }
    }
    let Some((best_index, _)) = best else {
        return false;
    };
    let best_record = &reference.records[best_index];
    if best_record.id == seed.id {
        return true;
    }
    if opts.check_coorthologs_ref {
        if let Some(aln) = align_local(&best_record.seq, &seed.seq, GapPenalties::default()) {
            let norm = normalized_score(aln.score, self_score(&best_record.seq));
            return norm >= opts.accept_threshold;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(records: Vec<FastaRecord>) -> TaxonData {
        let index = KmerIndex::build(&records);
        TaxonData { spec: "TEST@1@1".parse().unwrap(), records, index }
    }

    const SEED: &[u8] = b"MKVLLTAEWQRSDDKHGFWYCP";

    #[test]
    fn test_profile_hits_rank_planted_ortholog_first() {
        let seed = FastaRecord::new("seed", SEED.to_vec());
        let profile = SequenceProfile::build(&seed, &[]);
        let taxon = data(vec![
            FastaRecord::new("noise", b"GGGGSSSSTTTTNNNNQQQQPPPP".to_vec()),
            FastaRecord::new("ortholog", b"AAMKVLLTAEWQRSDDKHGFWYCPAA".to_vec()),
        ]);
        let hits = profile_hits(&profile, &taxon, 0.25);
        assert!(!hits.is_empty());
        assert_eq!(taxon.records[hits[0].record_index].id, "ortholog");
        assert!(hits[0].norm_score > 0.8);
    }

    #[test]
    fn test_reciprocity_accepts_true_ortholog() {
        let seed = FastaRecord::new("seed", SEED.to_vec());
        let reference = data(vec![
            seed.clone(),
            FastaRecord::new("other", b"GGGGSSSSTTTTNNNNQQQQPPPP".to_vec()),
        ]);
        let opts = SearchOptions::default();
        assert!(is_reciprocal(SEED, &reference, &seed, &opts));
    }

    #[test]
    fn test_reciprocity_rejects_paralog_trap() {
        // The reference holds a paralog closer to the query than the seed.
        let seed = FastaRecord::new("seed", SEED.to_vec());
        let paralog_like_query = b"MKILLTAEWQRSDDKHGFWYCP"; // V->I vs seed
        let reference = data(vec![
            seed.clone(),
            FastaRecord::new("paralog", paralog_like_query.to_vec()),
        ]);
        let opts = SearchOptions::default();
        assert!(!is_reciprocal(paralog_like_query, &reference, &seed, &opts));
        // With the co-ortholog relaxation the paralog is close enough to the
        // seed to pass.
        let relaxed = SearchOptions { check_coorthologs_ref: true, ..opts };
        assert!(is_reciprocal(paralog_like_query, &reference, &seed, &relaxed));
    }
}
