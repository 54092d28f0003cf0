use std::fmt::Display;

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::mergealign::{AlignedSequence, GAP};

/// A residue of one sequence, identified by the sequence's position in the sorted identifier list and the residue index.
type Residue = (usize, usize);

/// Pairwise-residue agreement between a tested alignment and a reference alignment.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct AccuracyReport {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl AccuracyReport {
    /// Compares the aligned residue pairs of all identifiers present in both alignments.
    pub fn compare(tested: &[AlignedSequence], reference: &[AlignedSequence]) -> Self {
        let reference_by_id: HashMap<_, _> = reference
            .iter()
            .map(|record| (record.id.as_str(), record.sequence.as_slice()))
            .collect();
        let mut common: Vec<_> = tested
            .iter()
            .filter_map(|record| {
                reference_by_id
                    .get(record.id.as_str())
                    .map(|reference| (record.id.as_str(), record.sequence.as_slice(), *reference))
            })
            .collect();
        common.sort_unstable_by_key(|(id, _, _)| *id);

        let tested_pairs = aligned_pairs(common.iter().map(|(_, tested, _)| *tested));
        let reference_pairs = aligned_pairs(common.iter().map(|(_, _, reference)| *reference));

        let true_positives = tested_pairs.intersection(&reference_pairs).count();
        Self {
            true_positives,
            false_positives: tested_pairs.len() - true_positives,
            false_negatives: reference_pairs.len() - true_positives,
        }
    }

    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    pub fn f_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }
}

impl Display for AccuracyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TP: {}, FP: {}, FN: {}, precision: {:.4}, recall: {:.4}, F-score: {:.4}",
            self.true_positives,
            self.false_positives,
            self.false_negatives,
            self.precision(),
            self.recall(),
            self.f_score()
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Collects every pair of residues that share a column, over all pairs of sequences.
fn aligned_pairs<'a>(sequences: impl Iterator<Item = &'a [u8]>) -> HashSet<(Residue, Residue)> {
    let sequences: Vec<_> = sequences.collect();
    let mut pairs = HashSet::default();

    for (first, first_sequence) in sequences.iter().enumerate() {
        for (second, second_sequence) in sequences.iter().enumerate().skip(first + 1) {
            let mut first_offset = 0;
            let mut second_offset = 0;

            for (first_character, second_character) in first_sequence.iter().zip(*second_sequence) {
                let first_residue = *first_character != GAP;
                let second_residue = *second_character != GAP;

                if first_residue && second_residue {
                    pairs.insert(((first, first_offset), (second, second_offset)));
                }
                if first_residue {
                    first_offset += 1;
                }
                if second_residue {
                    second_offset += 1;
                }
            }
        }
    }

    pairs
}
