//! Kyte-Doolittle hydropathy scale.

/// Hydropathy of a residue; ambiguity codes and unknowns are treated as
/// mildly polar (0.0 would bias window means upward in X-rich stretches).
pub fn kyte_doolittle(residue: u8) -> f64 {
    match residue.to_ascii_uppercase() {
        b'A' => 1.8,
        b'R' => -4.5,
        b'N' => -3.5,
        b'D' => -3.5,
        b'C' => 2.5,
        b'Q' => -3.5,
        b'E' => -3.5,
        b'G' => -0.4,
        b'H' => -3.2,
        b'I' => 4.5,
        b'L' => 3.8,
        b'K' => -3.9,
        b'M' => 1.9,
        b'F' => 2.8,
        b'P' => -1.6,
        b'S' => -0.8,
        b'T' => -0.7,
        b'W' => -0.9,
        b'Y' => -1.3,
        b'V' => 4.2,
        _ => -0.5,
    }
}

pub fn mean_hydropathy(window: &[u8]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|&r| kyte_doolittle(r)).sum::<f64>() / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extremes() {
        assert_eq!(kyte_doolittle(b'I'), 4.5);
        assert_eq!(kyte_doolittle(b'R'), -4.5);
        assert_eq!(kyte_doolittle(b'i'), 4.5);
    }

    #[test]
    fn test_mean_over_hydrophobic_stretch() {
        assert!(mean_hydropathy(b"ILVVLI") > 3.0);
        assert!(mean_hydropathy(b"RKDE") < -3.0);
    }
}
