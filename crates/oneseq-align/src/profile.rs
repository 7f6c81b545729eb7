//! Position-specific scoring profiles.
//!
//! A core ortholog group is summarized as a PSSM over the seed's coordinates
//! (a star alignment with the seed as master): every member is locally
//! aligned to the seed, aligned residues are counted per seed column, and the
//! counts become log-odds scores against Robinson-Robinson background
//! frequencies. Scores are expressed in half-bits so the default BLOSUM gap
//! penalties stay meaningful.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use oneseq_common::error::Result;
use oneseq_common::fasta::FastaRecord;
use oneseq_common::seq::{standard_index, STANDARD_RESIDUES};

use crate::blosum::BACKGROUND;
use crate::pairwise::{align_local, GapPenalties};

/// Pseudocount mass distributed over the background distribution.
const PSEUDOCOUNT: f64 = 5.0;
const HALF_BITS_PER_NAT: f64 = 2.0 / std::f64::consts::LN_2;

/// Local alignment of a profile against a sequence. Spans are 0-based
/// half-open; the profile span is in seed (master) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileAlignment {
    pub score: f64,
    pub profile_start: usize,
    pub profile_end: usize,
    pub target_start: usize,
    pub target_end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceProfile {
    pub master_id: String,
    pub member_ids: Vec<String>,
    /// Per seed column: log-odds score (half-bits) for each of the 20
    /// standard residues in alphabetical order.
    columns: Vec<[f32; 20]>,
}

impl SequenceProfile {
    /// Star alignment of `members` against `seed`. Members that do not align
    /// to the seed contribute nothing (the seed itself always counts).
    pub fn build(seed: &FastaRecord, members: &[FastaRecord]) -> Self {
        let mut counts = vec![[0f64; 20]; seed.seq.len()];
        for (col, &residue) in seed.seq.iter().enumerate() {
            if let Some(aa) = standard_index(residue) {
                counts[col][aa] += 1.0;
            }
        }
        let mut member_ids = Vec::with_capacity(members.len());
        for member in members {
            if member.id == seed.id {
                continue;
            }
            member_ids.push(member.id.clone());
            let Some(aln) = align_local(&member.seq, &seed.seq, GapPenalties::default()) else {
                debug!(member = %member.id, "member does not align to seed, skipped");
                continue;
            };
            for (mi, si) in aln.pairs {
                if let Some(aa) = standard_index(member.seq[mi as usize]) {
                    counts[si as usize][aa] += 1.0;
                }
            }
        }

        let columns = counts
            .iter()
            .map(|col| {
                let total: f64 = col.iter().sum();
                let mut scores = [0f32; 20];
                for aa in 0..20 {
                    let p = (col[aa] + PSEUDOCOUNT * BACKGROUND[aa]) / (total + PSEUDOCOUNT);
                    scores[aa] = ((p / BACKGROUND[aa]).ln() * HALF_BITS_PER_NAT) as f32;
                }
                scores
            })
            .collect();

        Self { master_id: seed.id.clone(), member_ids, columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Highest-scoring residue per column.
    pub fn consensus(&self) -> Vec<u8> {
        self.columns
            .iter()
            .map(|col| {
                let mut best = 0usize;
                for aa in 1..20 {
                    if col[aa] > col[best] {
                        best = aa;
                    }
                }
                STANDARD_RESIDUES[best]
            })
            .collect()
    }

    /// Maximum attainable alignment score: column-wise maxima.
    pub fn self_score(&self) -> f64 {
        self.columns
            .iter()
            .map(|col| col.iter().cloned().fold(f32::MIN, f32::max) as f64)
            .sum()
    }

    fn column_score(&self, col: usize, residue: u8) -> f64 {
        match standard_index(residue) {
            Some(aa) => self.columns[col][aa] as f64,
            // Ambiguity codes and X: neutral-ish, matching BLOSUM's X row.
            None => -1.0,
        }
    }

    /// Local profile-vs-sequence alignment (affine gaps, no traceback; the
    /// alignment start is carried through the DP as an origin).
    pub fn align(&self, target: &[u8], gaps: GapPenalties) -> Option<ProfileAlignment> {
        let n = self.columns.len();
        let m = target.len();
        if n == 0 || m == 0 {
            return None;
        }
        let cols = m + 1;
        let neg = f64::MIN / 4.0;
        let open_cost = (gaps.open + gaps.extend) as f64;
        let extend_cost = gaps.extend as f64;

        let mut mat = vec![0f64; (n + 1) * cols];
        let mut ix = vec![neg; (n + 1) * cols];
        let mut iy = vec![neg; (n + 1) * cols];
        // Alignment origin (profile_start, target_start) per cell and state.
        let mut org_m = vec![(0u32, 0u32); (n + 1) * cols];
        let mut org_x = vec![(0u32, 0u32); (n + 1) * cols];
        let mut org_y = vec![(0u32, 0u32); (n + 1) * cols];

        let mut best = 0f64;
        let mut best_cell = (0usize, 0usize);
        let mut best_origin = (0u32, 0u32);

        for i in 1..=n {
            for j in 1..=m {
                let idx = i * cols + j;
                let up = (i - 1) * cols + j;
                let left = i * cols + (j - 1);
                let diag = (i - 1) * cols + (j - 1);

                let x_open = mat[up] + open_cost;
                let x_ext = ix[up] + extend_cost;
                if x_ext > x_open {
                    ix[idx] = x_ext;
                    org_x[idx] = org_x[up];
                } else {
                    ix[idx] = x_open;
                    org_x[idx] = org_m[up];
                }

                let y_open = mat[left] + open_cost;
                let y_ext = iy[left] + extend_cost;
                if y_ext > y_open {
                    iy[idx] = y_ext;
                    org_y[idx] = org_y[left];
                } else {
                    iy[idx] = y_open;
                    org_y[idx] = org_m[left];
                }

                let s = self.column_score(i - 1, target[j - 1]);
                let (prev, origin) = {
                    let mut prev = mat[diag];
                    let mut origin = org_m[diag];
                    if ix[diag] > prev {
                        prev = ix[diag];
                        origin = org_x[diag];
                    }
                    if iy[diag] > prev {
                        prev = iy[diag];
                        origin = org_y[diag];
                    }
                    if prev <= 0.0 {
                        // Fresh local start at this cell.
                        (0.0, ((i - 1) as u32, (j - 1) as u32))
                    } else {
                        (prev, origin)
                    }
                };
                let diag_score = prev + s;
                if diag_score > 0.0 {
                    mat[idx] = diag_score;
                    org_m[idx] = origin;
                } else {
                    mat[idx] = 0.0;
                    org_m[idx] = ((i - 1) as u32, (j - 1) as u32);
                }

                if mat[idx] > best {
                    best = mat[idx];
                    best_cell = (i, j);
                    best_origin = org_m[idx];
                }
            }
        }

        if best <= 0.0 {
            return None;
        }
        Some(ProfileAlignment {
            score: best,
            profile_start: best_origin.0 as usize,
            profile_end: best_cell.0,
            target_start: best_origin.1 as usize,
            target_end: best_cell.1,
        })
    }

    /// Alignment score as a fraction of the profile's self score, in [0, 1].
    pub fn normalized(&self, score: f64) -> f64 {
        let denom = self.self_score();
        if denom <= 0.0 {
            return 0.0;
        }
        (score / denom).clamp(0.0, 1.0)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, seq: &[u8]) -> FastaRecord {
        FastaRecord::new(id, seq.to_vec())
    }

    const SEED: &[u8] = b"MKVLLTAEWQRSDDKHGF";

    #[test]
    fn test_single_member_consensus_is_seed() {
        let seed = rec("seed", SEED);
        let profile = SequenceProfile::build(&seed, &[]);
        assert_eq!(profile.consensus(), SEED.to_vec());
        assert_eq!(profile.len(), SEED.len());
        assert!(profile.member_ids.is_empty());
    }

    #[test]
    fn test_profile_recovers_seed_with_high_score() {
        let seed = rec("seed", SEED);
        let profile = SequenceProfile::build(&seed, &[]);
        let aln = profile.align(SEED, GapPenalties::default()).unwrap();
        let norm = profile.normalized(aln.score);
        assert!(norm > 0.99, "normalized self alignment {norm}");
        assert_eq!(aln.target_start, 0);
        assert_eq!(aln.target_end, SEED.len());
    }

    #[test]
    fn test_members_shift_column_scores() {
        let seed = rec("seed", SEED);
        // Two members with V->I at position 2.
        let variant = b"MKILLTAEWQRSDDKHGF";
        let members = vec![rec("m1", variant), rec("m2", variant)];
        let profile = SequenceProfile::build(&seed, &members);
        assert_eq!(profile.member_ids, vec!["m1", "m2"]);
        // The variant now scores at least as well as the seed residue there.
        let aln_seed = profile.align(SEED, GapPenalties::default()).unwrap();
        let aln_var = profile.align(variant, GapPenalties::default()).unwrap();
        assert!(aln_var.score >= aln_seed.score * 0.9);
    }

    #[test]
    fn test_profile_prefers_homolog_over_noise() {
        let seed = rec("seed", SEED);
        let profile = SequenceProfile::build(&seed, &[]);
        let homolog = profile.align(b"AAMKVLLTAEWQRSDDKHGFAA", GapPenalties::default());
        let noise = profile.align(b"PPPPGGGGNNNNQQQQCCCC", GapPenalties::default());
        let h = homolog.map(|a| a.score).unwrap_or(0.0);
        let n = noise.map(|a| a.score).unwrap_or(0.0);
        assert!(h > n, "homolog {h} vs noise {n}");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.profile.json");
        let seed = rec("seed", SEED);
        let profile = SequenceProfile::build(&seed, &[rec("m1", SEED)]);
        profile.save(&path).unwrap();
        let back = SequenceProfile::load(&path).unwrap();
        assert_eq!(back.master_id, "seed");
        assert_eq!(back.consensus(), profile.consensus());
        assert!((back.self_score() - profile.self_score()).abs() < 1e-6);
    }
}
