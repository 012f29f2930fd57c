//! Repair strategies and their compatibility rules.
//!
//! Each repair stage picks one engine or `none`. Some combinations cannot run as requested
//! (an unlicensed Modeller, pdb2pqr adding atoms without protonating); [`resolve_strategies`]
//! settles them up front and reports every substitution as a [`Warning`].

use super::report::Warning;
use crate::tools::{ToolKind, ToolOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn parse_choice<T: Copy>(
    input: &str,
    choices: &[T],
    name: fn(&T) -> &'static str,
    stage: &str,
) -> Result<T, String> {
    let normalized = input.trim().to_ascii_lowercase();
    choices
        .iter()
        .copied()
        .find(|c| name(c) == normalized)
        .ok_or_else(|| format!("unknown {} strategy '{}'", stage, input.trim()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResidueStrategy {
    Modeller,
    CharmmGui,
    #[default]
    #[serde(rename = "pdbfixer")]
    PdbFixer,
    None,
}

impl ResidueStrategy {
    const ALL: [ResidueStrategy; 4] = [
        ResidueStrategy::Modeller,
        ResidueStrategy::CharmmGui,
        ResidueStrategy::PdbFixer,
        ResidueStrategy::None,
    ];

    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            ResidueStrategy::Modeller => Some(ToolKind::Modeller),
            ResidueStrategy::CharmmGui => Some(ToolKind::CharmmGui),
            ResidueStrategy::PdbFixer => Some(ToolKind::PdbFixer),
            ResidueStrategy::None => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.tool().map_or("none", |t| t.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AtomStrategy {
    Modeller,
    #[default]
    #[serde(rename = "pdb2pqr")]
    Pdb2Pqr,
    #[serde(rename = "pdbfixer")]
    PdbFixer,
    None,
}

impl AtomStrategy {
    const ALL: [AtomStrategy; 4] = [
        AtomStrategy::Modeller,
        AtomStrategy::Pdb2Pqr,
        AtomStrategy::PdbFixer,
        AtomStrategy::None,
    ];

    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            AtomStrategy::Modeller => Some(ToolKind::Modeller),
            AtomStrategy::Pdb2Pqr => Some(ToolKind::Pdb2Pqr),
            AtomStrategy::PdbFixer => Some(ToolKind::PdbFixer),
            AtomStrategy::None => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.tool().map_or("none", |t| t.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProteinProtonation {
    #[default]
    #[serde(rename = "pdb2pqr")]
    Pdb2Pqr,
    #[serde(rename = "none")]
    None,
}

impl ProteinProtonation {
    const ALL: [ProteinProtonation; 2] = [ProteinProtonation::Pdb2Pqr, ProteinProtonation::None];

    pub fn name(&self) -> &'static str {
        match self {
            ProteinProtonation::Pdb2Pqr => "pdb2pqr",
            ProteinProtonation::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LigandProtonation {
    #[default]
    Babel,
    None,
}

impl LigandProtonation {
    const ALL: [LigandProtonation; 2] = [LigandProtonation::Babel, LigandProtonation::None];

    pub fn name(&self) -> &'static str {
        match self {
            LigandProtonation::Babel => "babel",
            LigandProtonation::None => "none",
        }
    }
}

impl FromStr for ResidueStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, &Self::ALL, Self::name, "missing-residue")
    }
}

impl FromStr for AtomStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, &Self::ALL, Self::name, "missing-atom")
    }
}

impl FromStr for ProteinProtonation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, &Self::ALL, Self::name, "protein protonation")
    }
}

impl FromStr for LigandProtonation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, &Self::ALL, Self::name, "ligand protonation")
    }
}

impl fmt::Display for ResidueStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for AtomStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ProteinProtonation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for LigandProtonation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a repair pass needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepareRequest {
    pub add_missing_residues: ResidueStrategy,
    pub add_missing_atoms: AtomStrategy,
    pub protonate_protein: ProteinProtonation,
    pub protonate_ligands: LigandProtonation,
    pub missing_residue_options: ToolOptions,
    pub missing_atom_options: ToolOptions,
    pub protonate_protein_options: ToolOptions,
    pub protonate_ligand_options: ToolOptions,
    /// Convert modified residues to their standard parents before filling gaps.
    pub replace_nonstandard: bool,
    /// Attempt in-place atom repair even for residues missing backbone atoms.
    pub force_add_atoms: bool,
}

impl Default for PrepareRequest {
    fn default() -> Self {
        Self {
            add_missing_residues: ResidueStrategy::PdbFixer,
            add_missing_atoms: AtomStrategy::Pdb2Pqr,
            protonate_protein: ProteinProtonation::Pdb2Pqr,
            protonate_ligands: LigandProtonation::Babel,
            missing_residue_options: ToolOptions::new(),
            missing_atom_options: ToolOptions::new(),
            protonate_protein_options: ToolOptions::new(),
            protonate_ligand_options: ToolOptions::new(),
            replace_nonstandard: true,
            force_add_atoms: false,
        }
    }
}

/// Strategies that will actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub residues: ResidueStrategy,
    pub atoms: AtomStrategy,
    pub protein_protonation: ProteinProtonation,
    pub ligand_protonation: LigandProtonation,
}

impl ResolvedPlan {
    /// Whether pdb2pqr runs, either to add atoms or to protonate.
    pub fn runs_pdb2pqr(&self) -> bool {
        self.atoms == AtomStrategy::Pdb2Pqr
            || self.protein_protonation == ProteinProtonation::Pdb2Pqr
    }
}

impl fmt::Display for ResolvedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "residues: {}, atoms: {}, protein protonation: {}, ligand protonation: {}",
            self.residues, self.atoms, self.protein_protonation, self.ligand_protonation
        )
    }
}

const MODELLER_UNAVAILABLE: &str = "modeller is unavailable or unlicensed";

/// Resolves the requested strategies against the structure state and the available
/// engines.
///
/// Substitutions only apply to stages that have work to do: an unavailable Modeller is
/// replaced by CHARMM-GUI for gaps and by pdb2pqr for incomplete residues. Requesting
/// pdb2pqr for atoms without pdb2pqr protonation is reported but left as is, since pdb2pqr
/// always protonates.
pub fn resolve_strategies(
    request: &PrepareRequest,
    has_missing_residues: bool,
    has_missing_atoms: bool,
    modeller_available: bool,
) -> (ResolvedPlan, Vec<Warning>) {
    let mut warnings = Vec::new();
    let mut plan = ResolvedPlan {
        residues: request.add_missing_residues,
        atoms: request.add_missing_atoms,
        protein_protonation: request.protonate_protein,
        ligand_protonation: request.protonate_ligands,
    };

    if plan.atoms == AtomStrategy::Pdb2Pqr
        && plan.protein_protonation != ProteinProtonation::Pdb2Pqr
    {
        Warning::ProtonationForced.emit(&mut warnings);
    }

    if has_missing_residues && plan.residues == ResidueStrategy::Modeller && !modeller_available
    {
        plan.residues = ResidueStrategy::CharmmGui;
        substituted("add_missing_residues", "modeller", "charmm-gui", MODELLER_UNAVAILABLE)
            .emit(&mut warnings);
    }

    if has_missing_atoms && plan.atoms == AtomStrategy::Modeller && !modeller_available {
        plan.atoms = AtomStrategy::Pdb2Pqr;
        substituted("add_missing_atoms", "modeller", "pdb2pqr", MODELLER_UNAVAILABLE)
            .emit(&mut warnings);
    }

    (plan, warnings)
}

pub(crate) fn substituted(
    stage: &'static str,
    requested: &str,
    used: &str,
    reason: &str,
) -> Warning {
    Warning::StrategySubstituted {
        stage,
        requested: requested.to_string(),
        used: used.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(residues: ResidueStrategy, atoms: AtomStrategy) -> PrepareRequest {
        PrepareRequest {
            add_missing_residues: residues,
            add_missing_atoms: atoms,
            ..PrepareRequest::default()
        }
    }

    #[test]
    fn unlicensed_modeller_falls_back_to_charmm_gui_for_gaps() {
        let (plan, warnings) = resolve_strategies(
            &request(ResidueStrategy::Modeller, AtomStrategy::PdbFixer),
            true,
            false,
            false,
        );

        assert_eq!(plan.residues, ResidueStrategy::CharmmGui);
        assert_eq!(plan.atoms, AtomStrategy::PdbFixer);
        assert_eq!(
            warnings,
            vec![substituted(
                "add_missing_residues",
                "modeller",
                "charmm-gui",
                MODELLER_UNAVAILABLE
            )]
        );
    }

    #[test]
    fn unlicensed_modeller_falls_back_to_pdb2pqr_for_atoms() {
        let (plan, warnings) = resolve_strategies(
            &request(ResidueStrategy::Modeller, AtomStrategy::Modeller),
            false,
            true,
            false,
        );

        assert_eq!(plan.residues, ResidueStrategy::Modeller);
        assert_eq!(plan.atoms, AtomStrategy::Pdb2Pqr);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn substitutions_need_work_to_do() {
        let (plan, warnings) = resolve_strategies(
            &request(ResidueStrategy::Modeller, AtomStrategy::Modeller),
            false,
            false,
            false,
        );
        assert_eq!(plan.residues, ResidueStrategy::Modeller);
        assert_eq!(plan.atoms, AtomStrategy::Modeller);
        assert!(warnings.is_empty());

        let (plan, _) = resolve_strategies(
            &request(ResidueStrategy::Modeller, AtomStrategy::Modeller),
            true,
            true,
            true,
        );
        assert_eq!(plan.residues, ResidueStrategy::Modeller);
    }

    #[test]
    fn pdb2pqr_atoms_without_pdb2pqr_protonation_only_warns() {
        let request = PrepareRequest {
            protonate_protein: ProteinProtonation::None,
            ..PrepareRequest::default()
        };
        let (plan, warnings) = resolve_strategies(&request, false, true, true);

        assert_eq!(plan.protein_protonation, ProteinProtonation::None);
        assert!(plan.runs_pdb2pqr());
        assert_eq!(warnings, vec![Warning::ProtonationForced]);
    }

    #[test]
    fn strategies_parse_case_insensitively() {
        assert_eq!(
            " CHARMM-GUI ".parse::<ResidueStrategy>(),
            Ok(ResidueStrategy::CharmmGui)
        );
        assert_eq!("none".parse::<AtomStrategy>(), Ok(AtomStrategy::None));
        assert_eq!(
            "pdb2pqr".parse::<ProteinProtonation>(),
            Ok(ProteinProtonation::Pdb2Pqr)
        );
        assert!("openbabel".parse::<LigandProtonation>().is_err());
    }

    #[test]
    fn requests_deserialize_with_defaults() {
        let request: PrepareRequest = toml::from_str(
            r#"
            add_missing_residues = "charmm-gui"
            add_missing_atoms = "none"
            force_add_atoms = true

            [protonate_protein_options]
            ph = "7.0"
            "#,
        )
        .unwrap();

        assert_eq!(request.add_missing_residues, ResidueStrategy::CharmmGui);
        assert_eq!(request.add_missing_atoms, AtomStrategy::None);
        assert_eq!(request.protonate_protein, ProteinProtonation::Pdb2Pqr);
        assert_eq!(request.protonate_ligands, LigandProtonation::Babel);
        assert!(request.replace_nonstandard);
        assert!(request.force_add_atoms);
        assert_eq!(request.protonate_protein_options["ph"], "7.0");
    }
}
