//! Residue classification and filtering.
//!
//! A [`FilterConfig`] declares, per residue category, which residues survive: everything
//! (`all`), those on selected chains (`chain`), those named by a `SITE` record (`site`),
//! or nothing (`none`). Explicit `include_mols`/`exclude_mols` identifiers override the
//! category policies, and exclusion always wins.
//!
//! Small molecules live outside the structure as [`Ligand`] files, so the ligand and
//! cofactor policies select from the molecule list, while the remaining policies select
//! residues of the structure itself. Ligand and cofactor residues still present in the
//! structure are never kept.

use super::error::Error;
use super::reconcile::reconcile_middle_gaps;
use super::report::Warning;
use crate::db::ResidueTable;
use crate::ligand::Ligand;
use crate::model::identity::ResidueId;
use crate::model::sequence::SequenceSet;
use crate::model::structure::{PurgeMode, Structure};
use crate::model::types::ResidueCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Selection rule for one residue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    All,
    /// Keep residues on the selected chains.
    #[default]
    Chain,
    /// Keep residues listed by a `SITE` record.
    Site,
    None,
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Policy::All),
            "chain" => Ok(Policy::Chain),
            "site" => Ok(Policy::Site),
            "none" => Ok(Policy::None),
            other => Err(format!("unknown policy '{}'", other)),
        }
    }
}

/// Which recorded gaps are kept for repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingResiduePolicy {
    All,
    /// Keep interior gaps only; terminal runs are trimmed.
    #[default]
    Middle,
}

impl FromStr for MissingResiduePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MissingResiduePolicy::All),
            "middle" => Ok(MissingResiduePolicy::Middle),
            other => Err(format!("unknown missing-residue policy '{}'", other)),
        }
    }
}

/// Chains to keep, written as `"all"` or a list such as `["A", "C"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ChainSpec", into = "ChainSpec")]
pub enum ChainSelection {
    #[default]
    All,
    Only(BTreeSet<char>),
}

impl ChainSelection {
    pub fn only<I: IntoIterator<Item = char>>(chains: I) -> Self {
        ChainSelection::Only(chains.into_iter().collect())
    }

    pub fn contains(&self, chain_id: char) -> bool {
        match self {
            ChainSelection::All => true,
            ChainSelection::Only(chains) => chains.contains(&chain_id),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ChainSelection::All)
    }
}

impl FromStr for ChainSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ChainSelection::All);
        }
        s.split(',')
            .map(|part| {
                let part = part.trim();
                let mut chars = part.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(format!("invalid chain identifier '{}'", part)),
                }
            })
            .collect::<Result<BTreeSet<char>, _>>()
            .map(ChainSelection::Only)
    }
}

impl fmt::Display for ChainSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainSelection::All => f.write_str("all"),
            ChainSelection::Only(chains) => {
                let list: Vec<String> = chains.iter().map(char::to_string).collect();
                f.write_str(&list.join(","))
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChainSpec {
    Keyword(String),
    List(Vec<char>),
}

impl TryFrom<ChainSpec> for ChainSelection {
    type Error = String;

    fn try_from(spec: ChainSpec) -> Result<Self, Self::Error> {
        match spec {
            ChainSpec::Keyword(keyword) => keyword.parse(),
            ChainSpec::List(chains) => Ok(ChainSelection::only(chains)),
        }
    }
}

impl From<ChainSelection> for ChainSpec {
    fn from(selection: ChainSelection) -> Self {
        match selection {
            ChainSelection::All => ChainSpec::Keyword("all".to_string()),
            ChainSelection::Only(chains) => ChainSpec::List(chains.into_iter().collect()),
        }
    }
}

/// Declarative description of what a filter pass keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub missing_residues: MissingResiduePolicy,
    pub chains: ChainSelection,
    pub waters: Policy,
    pub ligands: Policy,
    pub cofactors: Policy,
    pub simple_anions: Policy,
    pub complex_anions: Policy,
    pub simple_cations: Policy,
    pub complex_cations: Policy,
    pub include_mols: Vec<String>,
    pub exclude_mols: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            missing_residues: MissingResiduePolicy::Middle,
            chains: ChainSelection::All,
            waters: Policy::Chain,
            ligands: Policy::Chain,
            cofactors: Policy::Chain,
            simple_anions: Policy::Chain,
            complex_anions: Policy::Chain,
            simple_cations: Policy::Chain,
            complex_cations: Policy::Chain,
            include_mols: Vec::new(),
            exclude_mols: Vec::new(),
        }
    }
}

impl FilterConfig {
    /// Keeps every category and every recorded gap.
    pub fn keep_all() -> Self {
        Self {
            missing_residues: MissingResiduePolicy::All,
            chains: ChainSelection::All,
            waters: Policy::All,
            ligands: Policy::All,
            cofactors: Policy::All,
            simple_anions: Policy::All,
            complex_anions: Policy::All,
            simple_cations: Policy::All,
            complex_cations: Policy::All,
            include_mols: Vec::new(),
            exclude_mols: Vec::new(),
        }
    }

    /// Policy governing standalone residues of `category` in the structure.
    fn residue_policy(&self, category: ResidueCategory) -> Option<Policy> {
        match category {
            ResidueCategory::Water => Some(self.waters),
            ResidueCategory::SimpleAnion => Some(self.simple_anions),
            ResidueCategory::ComplexAnion => Some(self.complex_anions),
            ResidueCategory::SimpleCation => Some(self.simple_cations),
            ResidueCategory::ComplexCation => Some(self.complex_cations),
            _ => None,
        }
    }

    fn molecule_policy(&self, category: ResidueCategory) -> Option<Policy> {
        match category {
            ResidueCategory::Ligand => Some(self.ligands),
            ResidueCategory::Cofactor => Some(self.cofactors),
            _ => None,
        }
    }
}

/// Result of a filter pass.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub ligands: Vec<Ligand>,
    pub cofactors: Vec<Ligand>,
    /// Reference sequences to persist, present when the structure had gaps.
    pub sequences: Option<SequenceSet>,
    pub removed_residues: usize,
    pub warnings: Vec<Warning>,
}

/// Applies `config` to `structure` and to the held small molecules.
///
/// The structure is only modified once every check has passed, so an error leaves it
/// untouched.
///
/// Without reference sequences, recorded gaps can still be kept as they are (`all`), but
/// terminal trimming (`middle`) is impossible.
///
/// # Errors
///
/// * [`Error::MissingSequence`] when gaps must be trimmed and no sequences are given.
/// * [`Error::SequenceMismatch`] when a polymer chain has no reference sequence.
pub fn filter_structure(
    structure: &mut Structure,
    molecules: &[Ligand],
    sequences: Option<&SequenceSet>,
    config: &FilterConfig,
    table: &ResidueTable,
) -> Result<FilterOutcome, Error> {
    let mut outcome = select_molecules(molecules, structure, config, table);

    let mut keep: HashSet<ResidueId> = structure
        .select(|chain_id, r| r.category.is_protein() && config.chains.contains(chain_id))
        .into_iter()
        .collect();

    if !structure.missing_residues.is_empty() {
        if let Some(sequences) = sequences {
            let missing_chains = sequences.uncovered(&structure.polymer_chain_ids());
            if !missing_chains.is_empty() {
                return Err(Error::SequenceMismatch { missing_chains });
            }
        }

        let gaps = match (config.missing_residues, sequences) {
            (MissingResiduePolicy::Middle, Some(sequences)) => {
                let reconciled = reconcile_middle_gaps(&structure.polymer_slots(), sequences);
                outcome.sequences = Some(reconciled.sequences);
                reconciled.missing_residues
            }
            (MissingResiduePolicy::Middle, None) => {
                return Err(Error::missing_sequence("trimming terminal gaps"));
            }
            (MissingResiduePolicy::All, sequences) => {
                outcome.sequences = sequences.cloned();
                structure.missing_residues.clone()
            }
        };
        if let Some(trimmed) = outcome.sequences.as_mut() {
            trimmed.retain_chains(|c| config.chains.contains(c));
        }
        keep.extend(
            gaps.iter()
                .filter(|m| config.chains.contains(m.id.chain_id))
                .map(|m| m.id),
        );
    }

    keep.extend(structure.select(|chain_id, residue| {
        let Some(policy) = config.residue_policy(residue.category) else {
            return false;
        };
        let on_chain = config.chains.contains(chain_id);
        match policy {
            Policy::All => true,
            Policy::Chain => on_chain,
            Policy::Site => {
                let id = residue.identity(chain_id);
                on_chain && structure.site_residues.iter().any(|s| s.id == id)
            }
            Policy::None => false,
        }
    }));

    for entry in &config.include_mols {
        if let Some(id) = locate(structure, molecules, entry, &mut outcome.warnings) {
            keep.insert(id);
        }
    }
    for entry in &config.exclude_mols {
        if let Some(id) = locate(structure, molecules, entry, &mut outcome.warnings) {
            keep.remove(&id);
        }
    }

    let before = structure.residue_count();
    structure.purge(&keep, PurgeMode::Keep);
    outcome.removed_residues = before - structure.residue_count();

    log::info!(
        "Filter kept {} residue(s), {} missing residue(s), {} ligand(s), {} cofactor(s)",
        structure.residue_count(),
        structure.missing_residues.len(),
        outcome.ligands.len(),
        outcome.cofactors.len()
    );
    Ok(outcome)
}

/// Splits the held molecules into kept ligands and cofactors.
///
/// Molecules follow the same `all`/`chain` rules as residues, but the `site` rule matches
/// the molecule's number and insertion code against `SITE` records on any chain, without
/// consulting the chain selection. Other residue categories combine `site` with the chain
/// selection. Exclusion by identifier drops a molecule before any rule is applied, and
/// inclusion keeps it regardless of policy.
fn select_molecules(
    molecules: &[Ligand],
    structure: &Structure,
    config: &FilterConfig,
    table: &ResidueTable,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for molecule in molecules {
        let category = molecule.category(table);
        let Some(policy) = config.molecule_policy(category) else {
            log::debug!("Dropping {} classified as {}", molecule, category);
            continue;
        };
        if config
            .exclude_mols
            .iter()
            .any(|e| molecule.matches_identifier(e))
        {
            continue;
        }

        let site = molecule.site();
        let included = config
            .include_mols
            .iter()
            .any(|e| molecule.matches_identifier(e));
        let keep = included
            || match policy {
                Policy::All => true,
                Policy::Chain => {
                    config.chains.is_all()
                        || site
                            .as_ref()
                            .is_some_and(|s| config.chains.contains(s.id.chain_id))
                }
                Policy::Site => site.as_ref().is_some_and(|s| {
                    structure
                        .site_residues
                        .iter()
                        .any(|r| r.id.same_position(&s.id))
                }),
                Policy::None => false,
            };

        if keep {
            match category {
                ResidueCategory::Cofactor => outcome.cofactors.push(molecule.clone()),
                _ => outcome.ligands.push(molecule.clone()),
            }
        }
    }

    outcome
}

/// Resolves an include/exclude entry to a residue of the structure or a recorded gap.
///
/// Entries that name a held molecule are handled by the molecule stage and resolve to
/// nothing here without a warning.
fn locate(
    structure: &Structure,
    molecules: &[Ligand],
    entry: &str,
    warnings: &mut Vec<Warning>,
) -> Option<ResidueId> {
    let names_molecule = molecules.iter().any(|m| m.matches_identifier(entry));

    let id = match ResidueId::parse(entry) {
        Ok(id) => id,
        Err(e) => {
            if !names_molecule {
                Warning::UnresolvedIdentifier {
                    identifier: entry.to_string(),
                    reason: e.to_string(),
                }
                .emit(warnings);
            }
            return None;
        }
    };

    let present = structure
        .find_residue(&id)
        .is_some_and(|r| !r.category.is_small_molecule());
    let missing = structure.missing_residues.iter().any(|m| m.id == id);
    if present || missing {
        return Some(id);
    }

    if !names_molecule {
        Warning::UnresolvedIdentifier {
            identifier: entry.to_string(),
            reason: "no matching residue".to_string(),
        }
        .emit(warnings);
    }
    None
}
