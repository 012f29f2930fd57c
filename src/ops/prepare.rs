//! Repair orchestration: gap filling, atom completion, and protonation through external
//! engines.
//!
//! Every engine run consumes the current structure file and produces a new one. The
//! structure is re-read from each output before the next stage looks at it, so later
//! decisions always see what the previous engine actually wrote.

use super::error::Error;
use super::report::Warning;
use super::strategy::{
    AtomStrategy, LigandProtonation, PrepareRequest, ProteinProtonation, ResidueStrategy,
    ResolvedPlan, resolve_strategies, substituted,
};
use crate::io::{self, IoContext};
use crate::ligand::Ligand;
use crate::model::identity::ResidueId;
use crate::model::records::MissingResidue;
use crate::model::structure::{PurgeMode, Structure};
use crate::tools::{ToolAction, ToolInput, ToolKind, ToolOptions, Toolbox, merge_options};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One engine invocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRun {
    pub tool: ToolKind,
    pub action: ToolAction,
}

#[derive(Debug, Clone)]
pub struct PrepareReport {
    pub plan: ResolvedPlan,
    pub runs: Vec<ToolRun>,
    /// Residues converted to gaps because they lacked backbone atoms.
    pub promoted: Vec<ResidueId>,
    pub warnings: Vec<Warning>,
}

impl PrepareReport {
    /// Whether any run used `tool`.
    pub fn ran(&self, tool: ToolKind) -> bool {
        self.runs.iter().any(|r| r.tool == tool)
    }
}

/// Mutable state a repair pass works on.
pub struct PrepareTarget<'a> {
    pub structure: &'a mut Structure,
    /// Current structure file; replaced by each engine's output.
    pub structure_path: &'a mut PathBuf,
    pub sequence_path: Option<&'a Path>,
    pub code: Option<&'a str>,
    /// Ligands, cofactors, and the reference ligand.
    pub molecules: Vec<&'a mut Ligand>,
}

/// Converts residues missing any backbone atom into missing residues.
///
/// The residues are removed from the structure and appended to the gap list, which is then
/// re-sorted. Returns the converted identities.
pub fn promote_incomplete_backbones(structure: &mut Structure) -> Vec<ResidueId> {
    let (promoted, kept): (Vec<_>, Vec<_>) = structure
        .missing_atoms
        .drain(..)
        .partition(|m| m.lacks_backbone());
    structure.missing_atoms = kept;

    if promoted.is_empty() {
        return Vec::new();
    }

    let ids: HashSet<ResidueId> = promoted.iter().map(|m| m.id).collect();
    structure.purge(&ids, PurgeMode::Discard);
    structure.missing_residues.extend(
        promoted
            .iter()
            .map(|m| MissingResidue::new(m.id, &m.residue_name)),
    );
    structure.sort_missing_residues();

    promoted.into_iter().map(|m| m.id).collect()
}

struct Runner<'t, 'a> {
    target: &'t mut PrepareTarget<'a>,
    toolbox: &'t Toolbox,
    context: &'t IoContext,
    runs: Vec<ToolRun>,
}

impl Runner<'_, '_> {
    fn run(&mut self, tool: ToolKind, action: ToolAction, options: &ToolOptions) -> Result<(), Error> {
        let engine = self.toolbox.get(tool)?;
        let input = ToolInput {
            structure: self.target.structure_path.as_path(),
            sequence: self.target.sequence_path,
            code: self.target.code,
        };
        log::info!("Running {} to {}", tool, action);
        let output = engine.apply(&input, action, options)?;

        *self.target.structure = io::read_pdb_file(&output, self.context)?;
        *self.target.structure_path = output;
        self.runs.push(ToolRun { tool, action });
        Ok(())
    }
}

/// Runs the repair pass described by `request`.
///
/// # Errors
///
/// * [`Error::MissingSequence`] when Modeller must fill gaps and no sequence is available.
/// * [`Error::ToolUnavailable`] when a resolved stage has no usable engine.
/// * Any engine or I/O failure; the target then reflects the last successful run.
pub fn prepare_structure(
    mut target: PrepareTarget<'_>,
    request: &PrepareRequest,
    toolbox: &Toolbox,
    context: &IoContext,
) -> Result<PrepareReport, Error> {
    let mut promoted = Vec::new();
    if !request.force_add_atoms {
        promoted = promote_incomplete_backbones(target.structure);
        if !promoted.is_empty() {
            log::info!(
                "Treating {} residue(s) with incomplete backbones as missing",
                promoted.len()
            );
            io::write_pdb_file(target.structure_path, target.structure)?;
        }
    }

    let (mut plan, mut warnings) = resolve_strategies(
        request,
        !target.structure.missing_residues.is_empty(),
        !target.structure.missing_atoms.is_empty(),
        toolbox.is_available(ToolKind::Modeller),
    );

    let mut runner = Runner {
        target: &mut target,
        toolbox,
        context,
        runs: Vec::new(),
    };

    if request.replace_nonstandard && !runner.target.structure.modified_residues.is_empty() {
        runner.run(
            ToolKind::PdbFixer,
            ToolAction::ReplaceNonstandard,
            &ToolOptions::new(),
        )?;
    }

    let mut atoms_filled = false;
    let gaps = runner.target.structure.missing_residues.len();
    if gaps > 0 {
        match plan.residues {
            ResidueStrategy::Modeller => {
                let with_atoms = plan.atoms == AtomStrategy::Modeller;
                let options = if with_atoms {
                    merge_options(&request.missing_residue_options, &request.missing_atom_options)
                } else {
                    request.missing_residue_options.clone()
                };
                if runner.target.sequence_path.is_none() {
                    return Err(Error::missing_sequence("add missing residues with modeller"));
                }
                runner.run(
                    ToolKind::Modeller,
                    ToolAction::AddMissingResidues { with_atoms },
                    &options,
                )?;
                atoms_filled = with_atoms;
            }
            ResidueStrategy::CharmmGui => {
                runner.run(
                    ToolKind::CharmmGui,
                    ToolAction::AddMissingResidues { with_atoms: false },
                    &request.missing_residue_options,
                )?;
            }
            ResidueStrategy::PdbFixer => {
                let with_atoms = plan.atoms == AtomStrategy::PdbFixer;
                runner.run(
                    ToolKind::PdbFixer,
                    ToolAction::AddMissingResidues { with_atoms },
                    &request.missing_residue_options,
                )?;
                atoms_filled = with_atoms;
            }
            ResidueStrategy::None => {
                Warning::UnrepairedGaps { count: gaps }.emit(&mut warnings);
            }
        }
    }

    if !atoms_filled && !runner.target.structure.missing_atoms.is_empty() {
        match plan.atoms {
            AtomStrategy::Modeller => {
                plan.atoms = AtomStrategy::Pdb2Pqr;
                substituted(
                    "add_missing_atoms",
                    "modeller",
                    "pdb2pqr",
                    "modeller only adds atoms while filling gaps",
                )
                .emit(&mut warnings);
            }
            AtomStrategy::PdbFixer => {
                runner.run(
                    ToolKind::PdbFixer,
                    ToolAction::AddMissingAtoms,
                    &request.missing_atom_options,
                )?;
            }
            AtomStrategy::Pdb2Pqr | AtomStrategy::None => {}
        }
    }

    if plan.runs_pdb2pqr() {
        let mut options = ToolOptions::new();
        if plan.atoms == AtomStrategy::Pdb2Pqr {
            options = request.missing_atom_options.clone();
        }
        if plan.protein_protonation == ProteinProtonation::Pdb2Pqr {
            options = merge_options(&options, &request.protonate_protein_options);
        }
        runner.run(ToolKind::Pdb2Pqr, ToolAction::Protonate, &options)?;
    }

    let mut runs = std::mem::take(&mut runner.runs);
    match plan.ligand_protonation {
        LigandProtonation::Babel => {
            let pending = target.molecules.iter().any(|m| !m.is_protonated());
            if pending {
                let babel = toolbox.get(ToolKind::Babel)?;
                for molecule in target.molecules.iter_mut().filter(|m| !m.is_protonated()) {
                    molecule.protonate(babel, &request.protonate_ligand_options)?;
                    runs.push(ToolRun {
                        tool: ToolKind::Babel,
                        action: ToolAction::Protonate,
                    });
                }
            }
        }
        LigandProtonation::None => Warning::UnprotonatedMolecules.emit(&mut warnings),
    }

    log::info!("Preparation finished ({})", plan);
    Ok(PrepareReport {
        plan,
        runs,
        promoted,
        warnings,
    })
}
