use super::{
    coordinates::offsets_to_gapped, path::ConsensusPath, AlignedSequence, ConsensusAlignment,
    ReferenceSequences,
};
use crate::error::{ConsensusError, Result};

/// Turns the chosen path back into gapped sequences, one per reference sequence.
pub fn reconstruct_alignment(
    path: &ConsensusPath,
    references: &ReferenceSequences,
) -> Result<ConsensusAlignment> {
    if let Some(column) = path
        .columns
        .iter()
        .find(|column| column.dimensions() != references.len())
    {
        return Err(ConsensusError::DimensionMismatch {
            coordinates: column.to_string(),
            expected: references.len(),
            found: column.dimensions(),
        });
    }

    let records = references
        .iter()
        .enumerate()
        .map(|(index, reference)| {
            let offsets = path.columns.iter().map(|column| column.offset(index));
            Ok(AlignedSequence {
                id: reference.id.clone(),
                sequence: offsets_to_gapped(&reference.id, offsets, &reference.sequence)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ConsensusAlignment {
        records,
        scores: path.confidences.clone(),
    })
}
