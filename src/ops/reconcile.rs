//! Terminal-gap trimming against a reference sequence.
//!
//! Residues missing at either end of a chain are usually disordered termini rather than
//! gaps worth modelling. Reconciliation drops such terminal runs from the missing-residue
//! list together with the matching reference positions, leaving interior gaps untouched.

use crate::model::records::{MissingResidue, ResidueSlot};
use crate::model::sequence::SequenceSet;
use std::collections::BTreeMap;

/// Interior missing residues and the reference sequences trimmed to match them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub sequences: SequenceSet,
    pub missing_residues: Vec<MissingResidue>,
}

/// Trims terminal gaps from every chain in `slots`.
///
/// `slots` is the merged present/missing polymer list in identity order (see
/// [`Structure::polymer_slots`](crate::Structure::polymer_slots)). Leading missing slots
/// remove the first reference position each; trailing missing slots remove the reference
/// position with the same index as the slot. Trimming of an end stops at the first present
/// residue, so a gap is only terminal when it touches the chain end. Chains without a
/// reference sequence have their missing residues trimmed and no sequence edited.
pub fn reconcile_middle_gaps(slots: &[ResidueSlot], sequences: &SequenceSet) -> Reconciliation {
    let mut per_chain: BTreeMap<char, Vec<&ResidueSlot>> = BTreeMap::new();
    for slot in slots {
        per_chain.entry(slot.id.chain_id).or_default().push(slot);
    }

    let mut trimmed = sequences.clone();
    let mut missing_residues = Vec::new();

    for (chain_id, mut chain_slots) in per_chain {
        let mut residues = sequences
            .get(chain_id)
            .map(|s| s.residues.clone())
            .unwrap_or_default();

        while chain_slots.first().is_some_and(|s| s.missing) {
            chain_slots.remove(0);
            if !residues.is_empty() {
                residues.remove(0);
            }
        }

        while chain_slots.last().is_some_and(|s| s.missing) {
            let index = chain_slots.len() - 1;
            chain_slots.pop();
            if index < residues.len() {
                residues.remove(index);
            }
        }

        if let Some(sequence) = trimmed.get_mut(chain_id) {
            sequence.residues = residues;
        }

        missing_residues.extend(
            chain_slots
                .into_iter()
                .filter(|s| s.missing)
                .map(|s| MissingResidue::new(s.id, &s.name)),
        );
    }

    Reconciliation {
        sequences: trimmed,
        missing_residues,
    }
}
