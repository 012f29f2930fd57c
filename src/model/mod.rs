//! Core data structures describing a structure inventory.
//!
//! Residue identities, categories, atoms, residues, chains, the annotated `Structure`,
//! per-chain reference sequences, and the parametrised fragments of an assembled system.
//! These types are produced by the `io` readers, consumed and mutated by the `ops`
//! pipeline, and written back out by the `io` writers.

pub mod atom;
pub mod chain;
pub mod identity;
pub mod records;
pub mod residue;
pub mod sequence;
pub mod structure;
pub mod system;
pub mod types;
