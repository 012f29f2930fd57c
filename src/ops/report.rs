//! Non-fatal outcomes of pipeline operations.
//!
//! Conditions the pipeline recovers from on its own (strategy substitutions, identifiers
//! that match nothing, gaps left unrepaired) are not errors. They are collected as
//! [`Warning`] values in the report each operation returns and mirrored to the `log`
//! facade at `warn` level as they happen.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An `include_mols`/`exclude_mols` entry could not be parsed or matched no residue.
    UnresolvedIdentifier { identifier: String, reason: String },
    /// Missing atoms are added by pdb2pqr, which always protonates the protein.
    ProtonationForced,
    /// A requested strategy was replaced by a supported one.
    StrategySubstituted {
        stage: &'static str,
        requested: String,
        used: String,
        reason: String,
    },
    /// The structure still has gaps and no residue repair was requested.
    UnrepairedGaps { count: usize },
    /// Ligands and cofactors were left unprotonated.
    UnprotonatedMolecules,
    /// Polymer residue count and reference sequence length differ.
    SequenceLength { structure: usize, sequence: usize },
}

impl Warning {
    pub(crate) fn emit(self, sink: &mut Vec<Warning>) {
        log::warn!("{}", self);
        sink.push(self);
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedIdentifier { identifier, reason } => {
                write!(f, "could not resolve residue '{}': {}", identifier, reason)
            }
            Self::ProtonationForced => write!(
                f,
                "pdb2pqr cannot add missing atoms without protonating; the protein will be protonated by pdb2pqr"
            ),
            Self::StrategySubstituted {
                stage,
                requested,
                used,
                reason,
            } => write!(
                f,
                "{}: switching from {} to {} ({})",
                stage, requested, used, reason
            ),
            Self::UnrepairedGaps { count } => write!(
                f,
                "protein has {} missing residue(s) and no repair strategy was selected",
                count
            ),
            Self::UnprotonatedMolecules => write!(
                f,
                "ligands and cofactors must be protonated before parametrisation"
            ),
            Self::SequenceLength {
                structure,
                sequence,
            } => write!(
                f,
                "reference sequence length ({}) does not match the structure's polymer length ({})",
                sequence, structure
            ),
        }
    }
}
