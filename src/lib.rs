//! # HoloForge
//!
//! **HoloForge** prepares protein–ligand complexes for molecular simulation. It reads an
//! experimental structure with its reference sequences and small molecules, filters the
//! parts a study does not need, repairs missing residues and atoms, protonates protein and
//! ligands, and assembles the parametrised pieces into one system.
//!
//! ## Features
//!
//! - **Annotated structure model** – `Structure` keeps the residues actually present
//!   together with the missing-residue, missing-atom, modified-residue, disulfide, and
//!   site records of the input file, all addressed by `ResidueId`.
//! - **Policy-driven filtering** – `ops::FilterConfig` selects chains and keeps, drops, or
//!   site-restricts each residue category, with explicit include and exclude lists.
//! - **Strategy-based repair** – `ops::PrepareRequest` picks an engine per stage; missing
//!   engines fall back with a recorded `ops::Warning` instead of silently changing output.
//! - **Pluggable engines** – structure repair, protonation, parametrisation, and download
//!   sit behind traits in `tools`, with process-backed implementations configured from
//!   TOML.
//! - **Owned working directories** – every `Protein` writes into its own `WorkDir`, held
//!   by a guard that is released on every exit path.

mod db;
mod model;

pub mod io;
pub mod ligand;
pub mod ops;
pub mod protein;
pub mod tools;
pub mod workdir;

pub use db::ResidueTable;
pub use ligand::{Ligand, MoleculeSite, molecule_name};
pub use model::atom::Atom;
pub use model::chain::Chain;
pub use model::identity::{DEFAULT_CHAIN, ParseIdentifierError, ResidueId};
pub use model::records::{
    DisulfideBond, MissingAtoms, MissingResidue, ModifiedResidue, ResidueSlot, SiteResidue,
};
pub use model::residue::Residue;
pub use model::sequence::{ChainSequence, SequenceSet};
pub use model::structure::{PurgeMode, Structure};
pub use model::system::{CombinedSystem, ForceFieldParams, Fragment, MoleculeKind};
pub use model::types::{Point, ResidueCategory};
pub use protein::{LigandRef, Protein, ProteinBuilder};
pub use workdir::{WorkDir, WorkDirGuard};
