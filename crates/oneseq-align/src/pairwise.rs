//! Affine-gap local alignment (Smith-Waterman with Gotoh gap states).

use serde::{Deserialize, Serialize};

use crate::blosum;

/// Affine gap model: the first residue of a gap costs `open + extend`, each
/// further residue `extend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapPenalties {
    pub open: i32,
    pub extend: i32,
}

impl Default for GapPenalties {
    fn default() -> Self {
        Self { open: -10, extend: -1 }
    }
}

/// Result of a local alignment. Spans are 0-based half-open over the
/// original sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub score: i32,
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    /// Identical residue pairs over aligned (non-gap) columns.
    pub matches: usize,
    /// Total alignment columns including gaps.
    pub columns: usize,
    /// Aligned (query, target) index pairs for substitution columns, in
    /// sequence order. The profile builder maps member residues onto seed
    /// coordinates through these.
    pub pairs: Vec<(u32, u32)>,
}

impl Alignment {
    pub fn identity(&self) -> f64 {
        if self.columns == 0 {
            0.0
        } else {
            self.matches as f64 / self.columns as f64
        }
    }
}

// Traceback codes for the match state.
const TB_NONE: u8 = 0;
const TB_DIAG: u8 = 1; // came from M
const TB_DIAG_X: u8 = 2; // came from Ix (gap in target)
const TB_DIAG_Y: u8 = 3; // came from Iy (gap in query)
// Gap-state codes: whether the gap was opened (from M) or extended.
const GAP_OPEN: u8 = 0;
const GAP_EXTEND: u8 = 1;

/// Smith-Waterman with affine gaps and full traceback.
/// Returns `None` when no positive-scoring alignment exists.
pub fn align_local(query: &[u8], target: &[u8], gaps: GapPenalties) -> Option<Alignment> {
    let n = query.len();
    let m = target.len();
    if n == 0 || m == 0 {
        return None;
    }
    let cols = m + 1;
    let neg = i32::MIN / 2;
    let open_cost = gaps.open + gaps.extend;

    // Row-major (n+1) x (m+1) matrices.
    let mut mat = vec![0i32; (n + 1) * cols];
    let mut ix = vec![neg; (n + 1) * cols];
    let mut iy = vec![neg; (n + 1) * cols];
    let mut tb_m = vec![TB_NONE; (n + 1) * cols];
    let mut tb_x = vec![GAP_OPEN; (n + 1) * cols];
    let mut tb_y = vec![GAP_OPEN; (n + 1) * cols];

    let mut best = 0i32;
    let mut best_cell = (0usize, 0usize);

    for i in 1..=n {
        for j in 1..=m {
            let idx = i * cols + j;
            let up = (i - 1) * cols + j;
            let left = i * cols + (j - 1);
            let diag = (i - 1) * cols + (j - 1);

            // Gap in target: consume a query residue.
            let x_open = mat[up] + open_cost;
            let x_ext = ix[up] + gaps.extend;
            if x_ext > x_open {
                ix[idx] = x_ext;
                tb_x[idx] = GAP_EXTEND;
            } else {
                ix[idx] = x_open;
                tb_x[idx] = GAP_OPEN;
            }

            // Gap in query: consume a target residue.
            let y_open = mat[left] + open_cost;
            let y_ext = iy[left] + gaps.extend;
            if y_ext > y_open {
                iy[idx] = y_ext;
                tb_y[idx] = GAP_EXTEND;
            } else {
                iy[idx] = y_open;
                tb_y[idx] = GAP_OPEN;
            }

            let s = blosum::score(query[i - 1], target[j - 1]);
            let (prev, code) = {
                let mut prev = mat[diag];
                let mut code = TB_DIAG;
                if ix[diag] > prev {
                    prev = ix[diag];
                    code = TB_DIAG_X;
                }
                if iy[diag] > prev {
                    prev = iy[diag];
                    code = TB_DIAG_Y;
                }
                (prev, code)
            };
            let diag_score = prev + s;
            if diag_score > 0 {
                mat[idx] = diag_score;
                tb_m[idx] = code;
            } else {
                mat[idx] = 0;
                tb_m[idx] = TB_NONE;
            }

            if mat[idx] > best {
                best = mat[idx];
                best_cell = (i, j);
            }
        }
    }

    if best <= 0 {
        return None;
    }

    // Traceback from the best match cell.
    let (mut i, mut j) = best_cell;
    let (query_end, target_end) = (i, j);
    let mut matches = 0usize;
    let mut columns = 0usize;
    let mut pairs: Vec<(u32, u32)> = Vec::new();
    enum State {
        M,
        X,
        Y,
    }
    let mut state = State::M;
    loop {
        let idx = i * cols + j;
        match state {
            State::M => {
                if mat[idx] == 0 {
                    break;
                }
                if query[i - 1].eq_ignore_ascii_case(&target[j - 1]) {
                    matches += 1;
                }
                pairs.push(((i - 1) as u32, (j - 1) as u32));
                columns += 1;
                let code = tb_m[idx];
                i -= 1;
                j -= 1;
                state = match code {
                    TB_DIAG_X => State::X,
                    TB_DIAG_Y => State::Y,
                    _ => State::M,
                };
            }
            State::X => {
                columns += 1;
                let code = tb_x[idx];
                i -= 1;
                if code == GAP_OPEN {
                    state = State::M;
                }
            }
            State::Y => {
                columns += 1;
                let code = tb_y[idx];
                j -= 1;
                if code == GAP_OPEN {
                    state = State::M;
                }
            }
        }
    }

    pairs.reverse();
    Some(Alignment {
        score: best,
        query_start: i,
        query_end,
        target_start: j,
        target_end,
        matches,
        columns,
        pairs,
    })
}

/// Maximum attainable score of a sequence against itself: the diagonal sum.
pub fn self_score(seq: &[u8]) -> i32 {
    seq.iter().map(|&r| blosum::score(r, r)).sum()
}

/// Alignment score as a fraction of the query's self score, clamped to [0, 1].
pub fn normalized_score(score: i32, query_self_score: i32) -> f64 {
    if query_self_score <= 0 {
        return 0.0;
    }
    (score as f64 / query_self_score as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences_align_fully() {
        let seq = b"MKVLLTAEWQRS";
        let aln = align_local(seq, seq, GapPenalties::default()).unwrap();
        assert_eq!(aln.score, self_score(seq));
        assert_eq!(aln.query_start, 0);
        assert_eq!(aln.query_end, seq.len());
        assert_eq!(aln.target_start, 0);
        assert_eq!(aln.target_end, seq.len());
        assert!((aln.identity() - 1.0).abs() < f64::EPSILON);
        assert!((normalized_score(aln.score, self_score(seq)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_substitution_lowers_score() {
        let q = b"MKVLLTAEWQRS";
        let t = b"MKVLLTAEWQRA"; // S -> A at the end
        let aln = align_local(q, t, GapPenalties::default()).unwrap();
        assert!(aln.score < self_score(q));
        assert!(aln.score > 0);
        assert!(aln.matches >= 11);
    }

    #[test]
    fn test_gapped_alignment() {
        // Target has a residue deleted in the middle.
        let q = b"MKVLLTAEWQRSDDEEFF";
        let t = b"MKVLLTAWQRSDDEEFF";
        let aln = align_local(q, t, GapPenalties::default()).unwrap();
        // Either a gap is opened or the alignment splits; with a single
        // deletion the gapped form wins.
        assert!(aln.columns >= t.len());
        assert!(aln.score > 0);
    }

    #[test]
    fn test_local_alignment_finds_embedded_motif() {
        let q = b"WWHHKKWW";
        let t = b"AAAAAAAAAAWWHHKKWWAAAAAAAAAA";
        let aln = align_local(q, t, GapPenalties::default()).unwrap();
        assert_eq!(aln.target_start, 10);
        assert_eq!(aln.target_end, 18);
        assert_eq!(aln.matches, 8);
    }

    #[test]
    fn test_no_alignment_for_dissimilar() {
        let aln = align_local(b"WWWW", b"PPPP", GapPenalties::default());
        assert!(aln.is_none());
        assert!(align_local(b"", b"MKV", GapPenalties::default()).is_none());
    }
}
