use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Point = Point3<f64>;

/// Classification tag attached to every residue of a structure.
///
/// Exactly one category is assigned per residue, derived from its name through the
/// residue table (see [`crate::ResidueTable`]). Names unknown to the table are ligands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidueCategory {
    AminoAcid,
    AminoAcidModified,
    Water,
    Ligand,
    Cofactor,
    SimpleAnion,
    ComplexAnion,
    SimpleCation,
    ComplexCation,
}

impl ResidueCategory {
    pub const ALL: [ResidueCategory; 9] = [
        ResidueCategory::AminoAcid,
        ResidueCategory::AminoAcidModified,
        ResidueCategory::Water,
        ResidueCategory::Ligand,
        ResidueCategory::Cofactor,
        ResidueCategory::SimpleAnion,
        ResidueCategory::ComplexAnion,
        ResidueCategory::SimpleCation,
        ResidueCategory::ComplexCation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResidueCategory::AminoAcid => "amino_acid",
            ResidueCategory::AminoAcidModified => "amino_acid_modified",
            ResidueCategory::Water => "water",
            ResidueCategory::Ligand => "ligand",
            ResidueCategory::Cofactor => "cofactor",
            ResidueCategory::SimpleAnion => "simple_anion",
            ResidueCategory::ComplexAnion => "complex_anion",
            ResidueCategory::SimpleCation => "simple_cation",
            ResidueCategory::ComplexCation => "complex_cation",
        }
    }

    /// Returns `true` for standard and modified amino acids.
    pub fn is_protein(&self) -> bool {
        matches!(
            self,
            ResidueCategory::AminoAcid | ResidueCategory::AminoAcidModified
        )
    }

    /// Returns `true` for categories that live as separate small-molecule entities.
    pub fn is_small_molecule(&self) -> bool {
        matches!(self, ResidueCategory::Ligand | ResidueCategory::Cofactor)
    }

    pub fn is_ion(&self) -> bool {
        matches!(
            self,
            ResidueCategory::SimpleAnion
                | ResidueCategory::ComplexAnion
                | ResidueCategory::SimpleCation
                | ResidueCategory::ComplexCation
        )
    }
}

impl fmt::Display for ResidueCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ResidueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResidueCategory::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| format!("Invalid residue category: {}", s))
    }
}
