//! Greedy architecture linearization.
//!
//! Overlapping feature instances cannot all describe the same stretch of
//! sequence, so each architecture is reduced to a non-overlapping "path"
//! before scoring: instances are picked greedily by descending weight, ties
//! broken by earlier start, then name.

use oneseq_annotation::Architecture;

use crate::weights::WeightMode;

/// Indices (into `arch.features`) of the instances on the greedy path,
/// in sequence order.
pub fn greedy_path(arch: &Architecture, weights: &WeightMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..arch.features.len()).collect();
    order.sort_by(|&a, &b| {
        let (fa, fb) = (&arch.features[a], &arch.features[b]);
        let (wa, wb) = (weights.weight(&fa.name), weights.weight(&fb.name));
        wb.partial_cmp(&wa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(fa.start.cmp(&fb.start))
            .then(fa.name.cmp(&fb.name))
    });

    let mut picked: Vec<usize> = Vec::new();
    for idx in order {
        let f = &arch.features[idx];
        let overlaps = picked.iter().any(|&p| {
            let q = &arch.features[p];
            f.start <= q.end && q.start <= f.end
        });
        if !overlaps {
            picked.push(idx);
        }
    }
    picked.sort_by_key(|&i| (arch.features[i].start, arch.features[i].end));
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneseq_annotation::Feature;
    use std::collections::BTreeMap;

    fn arch(features: Vec<(&str, usize, usize)>) -> Architecture {
        Architecture {
            protein_id: "p".to_string(),
            length: 200,
            features: features
                .into_iter()
                .map(|(name, start, end)| Feature {
                    name: name.to_string(),
                    start,
                    end,
                    score: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_non_overlapping_keeps_everything() {
        let a = arch(vec![("x", 1, 10), ("y", 20, 30), ("x", 40, 50)]);
        assert_eq!(greedy_path(&a, &WeightMode::Uniform), vec![0, 1, 2]);
    }

    #[test]
    fn test_overlap_resolved_by_weight() {
        let mut counts = BTreeMap::new();
        counts.insert("common".to_string(), 1000);
        counts.insert("rare".to_string(), 1);
        let weights = WeightMode::ReferenceCounts(counts);
        // The rare feature overlaps the common one and wins.
        let a = arch(vec![("common", 1, 30), ("rare", 10, 20)]);
        assert_eq!(greedy_path(&a, &weights), vec![1]);
    }

    #[test]
    fn test_uniform_tie_prefers_earlier_start() {
        let a = arch(vec![("y", 5, 25), ("x", 1, 20)]);
        // Both weigh 1.0; "x" starts earlier and blocks "y".
        assert_eq!(greedy_path(&a, &WeightMode::Uniform), vec![1]);
    }
}
