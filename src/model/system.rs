//! Parametrised fragments and the combined system assembled from them.
//!
//! A [`Fragment`] is whatever a force-field engine produced for one molecule (topology and
//! coordinate files). Fragments are merged in order into a [`CombinedSystem`], which can be
//! persisted as a TOML manifest and reloaded later without re-running the engines.

use super::types::ResidueCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

/// Role of a molecule handed to the force-field engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoleculeKind {
    Protein,
    Ligand,
    Cofactor,
    Water,
    SimpleAnion,
    ComplexAnion,
    SimpleCation,
    ComplexCation,
}

impl MoleculeKind {
    /// Kind of a standalone hetero group; polymer residues map to `Protein`.
    pub fn from_category(category: ResidueCategory) -> Self {
        match category {
            ResidueCategory::AminoAcid | ResidueCategory::AminoAcidModified => Self::Protein,
            ResidueCategory::Water => Self::Water,
            ResidueCategory::Ligand => Self::Ligand,
            ResidueCategory::Cofactor => Self::Cofactor,
            ResidueCategory::SimpleAnion => Self::SimpleAnion,
            ResidueCategory::ComplexAnion => Self::ComplexAnion,
            ResidueCategory::SimpleCation => Self::SimpleCation,
            ResidueCategory::ComplexCation => Self::ComplexCation,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Protein => "protein",
            Self::Ligand => "ligand",
            Self::Cofactor => "cofactor",
            Self::Water => "water",
            Self::SimpleAnion => "simple_anion",
            Self::ComplexAnion => "complex_anion",
            Self::SimpleCation => "simple_cation",
            Self::ComplexCation => "complex_cation",
        }
    }
}

impl fmt::Display for MoleculeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Force fields requested from the parametrisation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForceFieldParams {
    pub protein_ff: String,
    pub ligand_ff: String,
    pub water_model: String,
}

impl Default for ForceFieldParams {
    fn default() -> Self {
        Self {
            protein_ff: "ff14SB".to_string(),
            ligand_ff: "gaff2".to_string(),
            water_model: "tip3p".to_string(),
        }
    }
}

/// Parametrised output of one molecule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub kind: MoleculeKind,
    pub name: String,
    pub files: Vec<PathBuf>,
}

impl Fragment {
    pub fn new(kind: MoleculeKind, name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
            files,
        }
    }
}

/// Ordered merge of parametrised fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedSystem {
    #[serde(default, rename = "fragment")]
    fragments: Vec<Fragment>,
}

impl CombinedSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn count_kind(&self, kind: MoleculeKind) -> usize {
        self.fragments.iter().filter(|f| f.kind == kind).count()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl From<Fragment> for CombinedSystem {
    fn from(fragment: Fragment) -> Self {
        Self {
            fragments: vec![fragment],
        }
    }
}

impl AddAssign<Fragment> for CombinedSystem {
    fn add_assign(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }
}

impl AddAssign for CombinedSystem {
    fn add_assign(&mut self, other: CombinedSystem) {
        self.fragments.extend(other.fragments);
    }
}

impl Add<Fragment> for CombinedSystem {
    type Output = CombinedSystem;

    fn add(mut self, fragment: Fragment) -> Self::Output {
        self += fragment;
        self
    }
}

impl Add for CombinedSystem {
    type Output = CombinedSystem;

    fn add(mut self, other: CombinedSystem) -> Self::Output {
        self += other;
        self
    }
}

impl fmt::Display for CombinedSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombinedSystem {{ fragments: {} }}", self.fragments.len())
    }
}
