use rustc_hash::FxHashMap as HashMap;

use super::{ungapped, Alignment, Coordinates, ReferenceSequences, GAP};
use crate::error::{ConsensusError, Result};

/// Converts a gapped sequence into the number of residues consumed up to and including each column.
pub fn gapped_to_offsets(sequence: &[u8]) -> Vec<usize> {
    sequence
        .iter()
        .scan(0, |offset, character| {
            if *character != GAP {
                *offset += 1;
            }
            Some(*offset)
        })
        .collect()
}

/// Inverse of [`gapped_to_offsets`] relative to the given ungapped sequence.
///
/// A column emits a gap if its offset equals the previous one, and the residue at the offset otherwise.
pub fn offsets_to_gapped(
    id: &str,
    offsets: impl IntoIterator<Item = usize>,
    reference: &[u8],
) -> Result<Vec<u8>> {
    let mut sequence = Vec::new();
    let mut previous_offset = 0;

    for offset in offsets {
        if offset == previous_offset {
            sequence.push(GAP);
        } else if offset < previous_offset || offset > reference.len() {
            return Err(ConsensusError::InvalidOffset {
                id: id.to_string(),
                offset,
                length: reference.len(),
            });
        } else {
            sequence.push(reference[offset - 1]);
        }

        previous_offset = offset;
    }

    Ok(sequence)
}

/// Combines the offsets of all sequences of one alignment into one coordinate tuple per column.
///
/// Components are ordered like the reference sequences.
pub fn alignment_to_coordinates(
    alignment: &Alignment,
    references: &ReferenceSequences,
) -> Result<Vec<Coordinates>> {
    let mut records = HashMap::default();
    for record in &alignment.records {
        if records.insert(record.id.as_str(), record).is_some() {
            return Err(ConsensusError::DuplicateIdentifier {
                alignment: alignment.name.clone(),
                id: record.id.clone(),
            });
        }
    }

    if let Some(unexpected) = alignment
        .records
        .iter()
        .find(|record| !references.iter().any(|reference| reference.id == record.id))
    {
        return Err(ConsensusError::UnexpectedIdentifier {
            alignment: alignment.name.clone(),
            id: unexpected.id.clone(),
        });
    }

    let column_amount = alignment.column_amount();
    if column_amount == 0 {
        return Err(ConsensusError::EmptyAlignment {
            alignment: alignment.name.clone(),
        });
    }

    let mut offsets = Vec::with_capacity(references.len());
    for reference in references.iter() {
        let record =
            records
                .get(reference.id.as_str())
                .ok_or_else(|| ConsensusError::MissingIdentifier {
                    alignment: alignment.name.clone(),
                    id: reference.id.clone(),
                })?;

        if record.sequence.len() != column_amount {
            return Err(ConsensusError::LengthMismatch {
                alignment: alignment.name.clone(),
                id: record.id.clone(),
                expected: column_amount,
                found: record.sequence.len(),
            });
        }
        if ungapped(&record.sequence) != reference.sequence {
            return Err(ConsensusError::ResidueMismatch {
                alignment: alignment.name.clone(),
                id: record.id.clone(),
            });
        }

        offsets.push(gapped_to_offsets(&record.sequence));
    }

    Ok((0..column_amount)
        .map(|column| Coordinates::new(offsets.iter().map(|offsets| offsets[column]).collect()))
        .collect())
}
