//! Annotation records that accompany a structure: gaps, incomplete residues, modified
//! residues, disulfide bridges, and site-of-interest memberships.

use super::atom::is_backbone_name;
use super::identity::ResidueId;
use std::fmt;

/// Residue present in the reference sequence but absent from the coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingResidue {
    pub id: ResidueId,
    pub name: String,
}

impl MissingResidue {
    pub fn new(id: ResidueId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for MissingResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.id)
    }
}

/// Residue present in the coordinates with some expected atoms absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAtoms {
    pub id: ResidueId,
    pub residue_name: String,
    pub atoms: Vec<String>,
}

impl MissingAtoms {
    pub fn new(id: ResidueId, residue_name: &str, atoms: Vec<String>) -> Self {
        Self {
            id,
            residue_name: residue_name.to_string(),
            atoms,
        }
    }

    /// Returns `true` when any of `C`, `CA`, or `N` is among the missing atoms.
    pub fn lacks_backbone(&self) -> bool {
        self.atoms.iter().any(|a| is_backbone_name(a))
    }
}

/// Non-standard residue together with the standard residue it derives from (`MODRES`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedResidue {
    pub id: ResidueId,
    pub name: String,
    pub standard_name: String,
    pub comment: String,
}

/// Disulfide bridge between two cysteines (`SSBOND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisulfideBond {
    pub first: ResidueId,
    pub second: ResidueId,
}

impl DisulfideBond {
    pub fn new(first: ResidueId, second: ResidueId) -> Self {
        Self { first, second }
    }
}

/// Residue listed by a `SITE` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteResidue {
    pub site: String,
    pub id: ResidueId,
    pub name: String,
}

/// Entry of the merged present/missing polymer residue list, in identity order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueSlot {
    pub id: ResidueId,
    pub name: String,
    pub missing: bool,
}
