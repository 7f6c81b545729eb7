//! Protein alphabet helpers.

/// The 20 standard residues in alphabetical order.
pub const STANDARD_RESIDUES: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

/// Residues accepted on intake: the standard 20 plus ambiguity codes and the
/// rare translated residues. `*` is handled separately (trailing stop only).
pub const EXTENDED_RESIDUES: &[u8; 25] = b"ACDEFGHIKLMNPQRSTVWYBZXUO";

pub fn is_standard(residue: u8) -> bool {
    STANDARD_RESIDUES.contains(&residue.to_ascii_uppercase())
}

pub fn is_valid(residue: u8) -> bool {
    EXTENDED_RESIDUES.contains(&residue.to_ascii_uppercase())
}

/// Index of a standard residue in [`STANDARD_RESIDUES`], or `None`.
pub fn standard_index(residue: u8) -> Option<usize> {
    STANDARD_RESIDUES
        .iter()
        .position(|&r| r == residue.to_ascii_uppercase())
}

/// Strips a single trailing `*` (translation stop) in place.
/// Returns true if a stop was removed.
pub fn strip_trailing_stop(seq: &mut Vec<u8>) -> bool {
    if seq.last() == Some(&b'*') {
        seq.pop();
        true
    } else {
        false
    }
}

/// Positions (0-based) of residues that are not part of the accepted
/// alphabet. Interior `*` counts as illegal; a trailing stop should have been
/// stripped before calling this.
pub fn illegal_positions(seq: &[u8]) -> Vec<usize> {
    seq.iter()
        .enumerate()
        .filter(|(_, &b)| !is_valid(b))
        .map(|(i, _)| i)
        .collect()
}
