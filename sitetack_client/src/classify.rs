// src/classify.rs

use crate::models::SequencePrediction;
use std::collections::BTreeMap;

/// Per-site highlight flags for one sequence, keyed by 1-based site.
pub type Classification = BTreeMap<usize, bool>;

/// A site is highlighted iff `probability > threshold`.
///
/// The threshold is not validated. A NaN threshold highlights nothing because
/// every comparison against NaN is false.
pub fn classify(sequence: &SequencePrediction, threshold: f64) -> Classification {
    let mut flags = Classification::new();
    for site in &sequence.site_predictions {
        let highlighted = site.probability > threshold;
        // A site scored twice is highlighted if any of its scores clears the threshold.
        let entry = flags.entry(site.site).or_insert(false);
        *entry |= highlighted;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SitePrediction;

    fn highlighted_sites(classification: &Classification) -> Vec<usize> {
        classification
            .iter()
            .filter(|&(_, &flag)| flag)
            .map(|(&site, _)| site)
            .collect()
    }

    fn sample() -> SequencePrediction {
        SequencePrediction::new(
            "p1",
            "ABCDE",
            vec![
                SitePrediction::new(5, "E", 0.95),
                SitePrediction::new(1, "A", 0.2),
                SitePrediction::new(3, "C", 0.5),
            ],
        )
    }

    #[test]
    fn equal_probability_is_not_highlighted() {
        let flags = classify(&sample(), 0.5);
        assert_eq!(flags.get(&3), Some(&false));
        assert_eq!(highlighted_sites(&flags), vec![5]);
    }

    #[test]
    fn nan_threshold_highlights_nothing() {
        let flags = classify(&sample(), f64::NAN);
        assert_eq!(flags.len(), 3);
        assert!(highlighted_sites(&flags).is_empty());
    }

    #[test]
    fn unscored_positions_are_absent() {
        let flags = classify(&sample(), 0.0);
        assert!(!flags.contains_key(&2));
        assert!(!flags.contains_key(&4));
        assert_eq!(highlighted_sites(&flags), vec![1, 3, 5]);
    }

    #[test]
    fn higher_threshold_highlights_a_subset() {
        let seq = sample();
        let thresholds = [-1.0, 0.0, 0.1, 0.2, 0.35, 0.5, 0.9, 0.95, 1.0];
        for pair in thresholds.windows(2) {
            let low = highlighted_sites(&classify(&seq, pair[0]));
            let high = highlighted_sites(&classify(&seq, pair[1]));
            assert!(
                high.iter().all(|s| low.contains(s)),
                "{:?} at {} is not a subset of {:?} at {}",
                high, pair[1], low, pair[0]
            );
        }
    }

    #[test]
    fn reclassifying_leaves_no_residue() {
        let seq = sample();
        let first = classify(&seq, 0.1);
        let _ = classify(&seq, 0.99);
        assert_eq!(classify(&seq, 0.1), first);
    }
}
