//! Built-in sequence feature detectors.
//!
//! Deterministic stand-ins for the external annotation tools the original
//! data package was built with. Each detector scans fixed-size windows,
//! merges qualifying windows into regions, and reports 1-based inclusive
//! feature coordinates under the feature names the FAS scorer and the
//! domains tables use.

use crate::hydropathy::{kyte_doolittle, mean_hydropathy};
use crate::model::Feature;

// Low complexity (SEG-like).
pub const SEG_WINDOW: usize = 12;
pub const SEG_MAX_ENTROPY: f64 = 2.2;
pub const SEG_NAME: &str = "seg_low";

// Transmembrane helix (TMHMM-like).
pub const TM_WINDOW: usize = 19;
pub const TM_MIN_HYDROPATHY: f64 = 1.6;
pub const TM_MIN_REGION: usize = 15;
pub const TM_NAME: &str = "tmhmm_helix";

// Signal peptide (SignalP-like).
pub const SIGNAL_WINDOW: usize = 8;
pub const SIGNAL_MIN_HYDROPATHY: f64 = 2.0;
pub const SIGNAL_MAX_START: usize = 12;
pub const SIGNAL_NAME: &str = "signalp_signal";

// Coiled coil (COILS-like).
pub const COIL_WINDOW: usize = 21;
pub const COIL_MIN_AD_FRACTION: f64 = 0.75;
pub const COIL_MIN_POLAR_FRACTION: f64 = 0.5;
pub const COIL_HYDROPHOBIC_KD: f64 = 1.8;
pub const COIL_NAME: &str = "coils_coil";

/// Shannon entropy (bits) of the residue distribution in a window.
fn window_entropy(window: &[u8]) -> f64 {
    let mut counts = [0usize; 26];
    let mut total = 0usize;
    for &b in window {
        let b = b.to_ascii_uppercase();
        if b.is_ascii_uppercase() {
            counts[(b - b'A') as usize] += 1;
            total += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Merges overlapping or adjacent 0-based inclusive intervals; the region
/// score is the mean of the merged window scores.
fn merge_regions(mut windows: Vec<(usize, usize, f64)>) -> Vec<(usize, usize, f64)> {
    if windows.is_empty() {
        return windows;
    }
    windows.sort_by_key(|&(start, _, _)| start);
    let mut merged: Vec<(usize, usize, Vec<f64>)> = Vec::new();
    for (start, end, score) in windows {
        match merged.last_mut() {
            Some(last) if start <= last.1 + 1 => {
                last.1 = last.1.max(end);
                last.2.push(score);
            }
            _ => merged.push((start, end, vec![score])),
        }
    }
    merged
        .into_iter()
        .map(|(start, end, scores)| {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            (start, end, mean)
        })
        .collect()
}

fn to_features(regions: Vec<(usize, usize, f64)>, name: &str) -> Vec<Feature> {
    regions
        .into_iter()
        .map(|(start, end, score)| Feature {
            name: name.to_string(),
            start: start + 1,
            end: end + 1,
            score,
        })
        .collect()
}

pub fn low_complexity(seq: &[u8]) -> Vec<Feature> {
    let mut windows = Vec::new();
    for (i, window) in seq.windows(SEG_WINDOW).enumerate() {
        let entropy = window_entropy(window);
        if entropy < SEG_MAX_ENTROPY {
            windows.push((i, i + SEG_WINDOW - 1, entropy));
        }
    }
    to_features(merge_regions(windows), SEG_NAME)
}

pub fn transmembrane(seq: &[u8]) -> Vec<Feature> {
    let mut windows = Vec::new();
    for (i, window) in seq.windows(TM_WINDOW).enumerate() {
        let kd = mean_hydropathy(window);
        if kd >= TM_MIN_HYDROPATHY {
            windows.push((i, i + TM_WINDOW - 1, kd));
        }
    }
    let regions = merge_regions(windows)
        .into_iter()
        .filter(|&(start, end, _)| end - start + 1 >= TM_MIN_REGION)
        .collect();
    to_features(regions, TM_NAME)
}

/// A hydrophobic stretch starting within the first `SIGNAL_MAX_START`
/// residues. The feature always starts at position 1 (the reported region is
/// the whole leader up to the stretch end).
pub fn signal_peptide(seq: &[u8]) -> Vec<Feature> {
    let mut stretch_end = None;
    let mut best_kd = 0.0f64;
    // Window starts are 0-based, so the first SIGNAL_MAX_START residues are
    // offsets 0..SIGNAL_MAX_START.
    for start in 0..SIGNAL_MAX_START {
        if start + SIGNAL_WINDOW > seq.len() {
            break;
        }
        let kd = mean_hydropathy(&seq[start..start + SIGNAL_WINDOW]);
        if kd >= SIGNAL_MIN_HYDROPATHY {
            let mut end = start + SIGNAL_WINDOW;
            while end < seq.len() && kyte_doolittle(seq[end]) >= SIGNAL_MIN_HYDROPATHY {
                end += 1;
            }
            stretch_end = Some(stretch_end.map_or(end, |e: usize| e.max(end)));
            best_kd = best_kd.max(kd);
        } else if stretch_end.is_some() {
            break;
        }
    }
    match stretch_end {
        Some(end) => vec![Feature {
            name: SIGNAL_NAME.to_string(),
            start: 1,
            end,
            score: best_kd,
        }],
        None => Vec::new(),
    }
}

pub fn coiled_coil(seq: &[u8]) -> Vec<Feature> {
    let mut windows = Vec::new();
    for (i, window) in seq.windows(COIL_WINDOW).enumerate() {
        let mut best_fraction = 0.0f64;
        for frame in 0..7 {
            let mut ad_total = 0usize;
            let mut ad_hydrophobic = 0usize;
            let mut other_total = 0usize;
            let mut other_polar = 0usize;
            for (offset, &residue) in window.iter().enumerate() {
                let heptad = (offset + frame) % 7;
                let hydrophobic = kyte_doolittle(residue) >= COIL_HYDROPHOBIC_KD;
                if heptad == 0 || heptad == 3 {
                    ad_total += 1;
                    if hydrophobic {
                        ad_hydrophobic += 1;
                    }
                } else {
                    other_total += 1;
                    if !hydrophobic {
                        other_polar += 1;
                    }
                }
            }
            let ad_fraction = ad_hydrophobic as f64 / ad_total as f64;
            let polar_fraction = other_polar as f64 / other_total as f64;
            if ad_fraction >= COIL_MIN_AD_FRACTION && polar_fraction >= COIL_MIN_POLAR_FRACTION {
                best_fraction = best_fraction.max(ad_fraction);
            }
        }
        if best_fraction > 0.0 {
            windows.push((i, i + COIL_WINDOW - 1, best_fraction));
        }
    }
    to_features(merge_regions(windows), COIL_NAME)
}
