use std::time::Instant;

use log::{debug, info};

use crate::error::{ConsensusError, Result};

pub mod coordinates;
mod display;
pub mod graph;
pub mod path;
pub mod reconstruct;

use coordinates::alignment_to_coordinates;
use graph::ConsensusGraph;
use path::best_path;
use reconstruct::reconstruct_alignment;

pub const GAP: u8 = b'-';

/// A position in alignment space.
///
/// Component `i` counts the residues of sequence `i` consumed so far.
/// The derived ordering is lexicographic, which is a linear extension of the component-wise order.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Coordinates {
    offsets: Vec<usize>,
}

impl Coordinates {
    pub fn origin(dimensions: usize) -> Self {
        Self {
            offsets: vec![0; dimensions],
        }
    }

    pub fn new(offsets: Vec<usize>) -> Self {
        Self { offsets }
    }

    pub fn dimensions(&self) -> usize {
        self.offsets.len()
    }

    pub fn offset(&self, index: usize) -> usize {
        self.offsets[index]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn is_origin(&self) -> bool {
        self.offsets.iter().all(|offset| *offset == 0)
    }

    /// Returns true if every component of `self` is at most the corresponding component of `other`.
    pub fn precedes(&self, other: &Self) -> bool {
        self.offsets
            .iter()
            .zip(&other.offsets)
            .all(|(own, other)| own <= other)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AlignedSequence {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl AlignedSequence {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }
}

/// One candidate alignment of the input sequences.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Where the alignment came from, used in diagnostics.
    pub name: String,
    pub records: Vec<AlignedSequence>,
}

impl Alignment {
    pub fn new(name: impl Into<String>, records: Vec<AlignedSequence>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn column_amount(&self) -> usize {
        self.records
            .first()
            .map(|record| record.sequence.len())
            .unwrap_or(0)
    }
}

/// The ungapped sequences every alignment has to agree on, in output order.
#[derive(Debug, Clone)]
pub struct ReferenceSequences {
    records: Vec<AlignedSequence>,
}

impl ReferenceSequences {
    /// Strips the gaps from the records of the given alignment.
    pub fn from_alignment(alignment: &Alignment) -> Self {
        Self {
            records: alignment
                .records
                .iter()
                .map(|record| AlignedSequence {
                    id: record.id.clone(),
                    sequence: ungapped(&record.sequence),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlignedSequence> {
        self.records.iter()
    }

    /// The tuple every alignment ends in.
    pub fn terminal(&self) -> Coordinates {
        Coordinates::new(
            self.records
                .iter()
                .map(|record| record.sequence.len())
                .collect(),
        )
    }
}

/// The merged alignment together with one confidence score per column.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusAlignment {
    pub records: Vec<AlignedSequence>,
    pub scores: Vec<f64>,
}

impl ConsensusAlignment {
    pub fn column_amount(&self) -> usize {
        self.scores.len()
    }

    /// Drops every column whose score is not strictly above `threshold`.
    ///
    /// The same columns are dropped from every sequence.
    pub fn filter_columns(&self, threshold: f64) -> Vec<AlignedSequence> {
        let retained: Vec<_> = self
            .scores
            .iter()
            .enumerate()
            .filter(|(_, score)| **score > threshold)
            .map(|(column, _)| column)
            .collect();

        self.records
            .iter()
            .map(|record| AlignedSequence {
                id: record.id.clone(),
                sequence: retained
                    .iter()
                    .map(|column| record.sequence[*column])
                    .collect(),
            })
            .collect()
    }

    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            self.scores.iter().sum::<f64>() / self.scores.len() as f64
        }
    }
}

pub fn ungapped(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .copied()
        .filter(|character| *character != GAP)
        .collect()
}

/// Merges the given alignments into a single consensus alignment.
///
/// The residues of the first alignment define the reference every other alignment is checked against.
pub fn merge_alignments(alignments: &[Alignment]) -> Result<ConsensusAlignment> {
    let first = alignments
        .first()
        .ok_or_else(|| ConsensusError::NoAlignments("the input set".to_string()))?;
    if first.records.is_empty() {
        return Err(ConsensusError::EmptyAlignment {
            alignment: first.name.clone(),
        });
    }

    let start_time = Instant::now();
    let references = ReferenceSequences::from_alignment(first);
    info!(
        "Merging {} alignments of {} sequences",
        alignments.len(),
        references.len()
    );

    let mut graph = ConsensusGraph::new(references.len(), alignments.len());
    for alignment in alignments {
        let columns = alignment_to_coordinates(alignment, &references)?;
        debug!(
            "Alignment {} has {} columns",
            alignment.name,
            columns.len()
        );
        graph.add_alignment(&alignment.name, &columns)?;
    }
    info!(
        "Built graph with {} nodes and {} edges",
        graph.len(),
        graph.edge_amount()
    );

    let path = best_path(&graph)?;
    let terminal = references.terminal();
    if path.columns.last() != Some(&terminal) {
        return Err(ConsensusError::BrokenBacktrack {
            terminal: terminal.to_string(),
        });
    }
    let consensus = reconstruct_alignment(&path, &references)?;

    let duration = Instant::now() - start_time;
    info!(
        "Consensus has {} columns with mean confidence {:.3}",
        consensus.column_amount(),
        consensus.mean_score()
    );
    info!("Runtime: {:.2}s", duration.as_secs_f64());

    Ok(consensus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn alignment(name: &str, records: &[(&str, &str)]) -> Alignment {
        Alignment::new(
            name,
            records
                .iter()
                .map(|(id, sequence)| AlignedSequence::new(*id, sequence.as_bytes()))
                .collect(),
        )
    }

    fn sequences(consensus: &ConsensusAlignment) -> Vec<(&str, &str)> {
        consensus
            .records
            .iter()
            .map(|record| {
                (
                    record.id.as_str(),
                    std::str::from_utf8(&record.sequence).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn single_alignment_is_reproduced() {
        let input = alignment(
            "a",
            &[("s1", "AC-GT-"), ("s2", "A-CG-T"), ("s3", "-ACGTT")],
        );
        let consensus = merge_alignments(&[input.clone()]).unwrap();

        assert_eq!(consensus.records, input.records);
        assert_eq!(consensus.scores, vec![1.0; 6]);
    }

    #[test]
    fn shared_transitions_win() {
        let first = alignment("a", &[("A", "AC-GT"), ("B", "A-CGT")]);
        let second = alignment("b", &[("A", "AC-GT"), ("B", "A-CGT")]);
        let third = alignment("c", &[("A", "A-CGT"), ("B", "AC-GT")]);
        let consensus = merge_alignments(&[first, second, third]).unwrap();

        assert_eq!(sequences(&consensus), vec![("A", "AC-GT"), ("B", "A-CGT")]);
        let expected = [1.0, 2.0 / 3.0, 2.0 / 3.0, 1.0, 1.0];
        assert_eq!(consensus.scores.len(), expected.len());
        for (score, expected) in consensus.scores.iter().zip(expected) {
            assert!((score - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn divergent_column_gets_half_support() {
        // Both alignments share the first and the last two transitions.
        let first = alignment("a", &[("A", "AC-GT"), ("B", "A-CGT")]);
        let second = alignment("b", &[("A", "ACG-T"), ("B", "A-CGT")]);
        let consensus = merge_alignments(&[first, second]).unwrap();

        assert_eq!(sequences(&consensus), vec![("A", "AC-GT"), ("B", "A-CGT")]);
        assert_eq!(consensus.scores, vec![1.0, 1.0, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn merging_is_deterministic() {
        let inputs = [
            alignment("a", &[("x", "MK-LV"), ("y", "M-KLV"), ("z", "MKL-V")]),
            alignment("b", &[("x", "MKLV-"), ("y", "M-KLV"), ("z", "MK-LV")]),
            alignment("c", &[("x", "-MKLV"), ("y", "MKLV-"), ("z", "MKLV-")]),
        ];

        let first = merge_alignments(&inputs).unwrap();
        let second = merge_alignments(&inputs).unwrap();
        assert_eq!(first, second);

        let length = first.column_amount();
        assert!(first
            .records
            .iter()
            .all(|record| record.sequence.len() == length));
        assert!(first
            .scores
            .iter()
            .all(|score| (0.0..=1.0).contains(score)));
        for (record, input) in first.records.iter().zip(&inputs[0].records) {
            assert_eq!(ungapped(&record.sequence), ungapped(&input.sequence));
        }
    }

    #[test]
    fn filtering_keeps_columns_consistent() {
        let first = alignment("a", &[("A", "AC-GT"), ("B", "A-CGT")]);
        let second = alignment("b", &[("A", "ACG-T"), ("B", "A-CGT")]);
        let consensus = merge_alignments(&[first, second]).unwrap();

        let filtered = consensus.filter_columns(0.5);
        assert_eq!(
            filtered,
            vec![
                AlignedSequence::new("A", "ACT"),
                AlignedSequence::new("B", "A-T"),
            ]
        );

        assert!(consensus
            .filter_columns(1.0)
            .iter()
            .all(|record| record.sequence.is_empty()));
    }

    #[test]
    fn mismatched_identifiers_are_rejected() {
        let first = alignment("a", &[("A", "AC-GT"), ("B", "A-CGT")]);
        let second = alignment("b", &[("A", "AC-GT"), ("C", "A-CGT")]);
        let error = merge_alignments(&[first, second]).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn empty_input_is_rejected() {
        let error = merge_alignments(&[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Input);

        let error = merge_alignments(&[alignment("a", &[])]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Input);
    }

    #[test]
    fn coordinates_order_is_lexicographic() {
        let mut coordinates = vec![
            Coordinates::new(vec![1, 0]),
            Coordinates::new(vec![0, 2]),
            Coordinates::origin(2),
            Coordinates::new(vec![1, 1]),
        ];
        coordinates.sort();

        assert!(coordinates[0].is_origin());
        assert_eq!(coordinates[1].offsets(), &[0, 2]);
        assert_eq!(coordinates[3].offsets(), &[1, 1]);
        assert!(coordinates[2].precedes(&coordinates[3]));
        assert!(!coordinates[1].precedes(&coordinates[2]));
    }
}
