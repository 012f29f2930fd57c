//! Preparation pipeline operations.
//!
//! Filtering ([`filter_structure`]), terminal-gap reconciliation
//! ([`reconcile_middle_gaps`]), repair orchestration ([`prepare_structure`]), and system
//! assembly ([`assemble_system`]) all share one [`Error`] type. Recoverable conditions
//! are returned as [`Warning`] values in each operation's report.

mod assemble;
mod error;
mod filter;
mod prepare;
mod reconcile;
mod report;
mod strategy;

pub use assemble::{
    AssembleTarget, MANIFEST_FILE, assemble_system, read_manifest, write_hetero_groups,
    write_manifest,
};
pub use error::Error;
pub use filter::{
    ChainSelection, FilterConfig, FilterOutcome, MissingResiduePolicy, Policy, filter_structure,
};
pub use prepare::{
    PrepareReport, PrepareTarget, ToolRun, prepare_structure, promote_incomplete_backbones,
};
pub use reconcile::{Reconciliation, reconcile_middle_gaps};
pub use report::Warning;
pub use strategy::{
    AtomStrategy, LigandProtonation, PrepareRequest, ProteinProtonation, ResidueStrategy,
    ResolvedPlan, resolve_strategies,
};
