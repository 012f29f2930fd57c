//! Assembly of the parametrised system.
//!
//! The protein, every held ligand and cofactor, and every remaining hetero group are
//! parametrised separately and merged in a fixed order: protein, ligands, cofactors, then
//! the other hetero groups in the order they appear in the structure.

use super::error::Error;
use crate::io;
use crate::ligand::Ligand;
use crate::model::identity::ResidueId;
use crate::model::structure::{PurgeMode, Structure};
use crate::model::system::{CombinedSystem, ForceFieldParams, MoleculeKind};
use crate::tools::{ParametriseRequest, Parametriser};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the manifest describing an assembled system.
pub const MANIFEST_FILE: &str = "complex_template.toml";

pub struct AssembleTarget<'a> {
    pub structure: &'a mut Structure,
    /// Protein structure file; rewritten with the protein-only, renumbered structure.
    pub structure_path: &'a Path,
    /// Directory receiving hetero group files and the manifest.
    pub work_dir: &'a Path,
    pub name: &'a str,
    pub ligands: &'a mut [Ligand],
    pub cofactors: &'a mut [Ligand],
}

/// Writes each hetero group of `structure` to its own PDB file.
///
/// Files are named `<name>_<category>_<residue>.pdb` and returned with their molecule
/// kind, in discovery order.
pub fn write_hetero_groups(
    structure: &Structure,
    dir: &Path,
    name: &str,
) -> Result<Vec<(MoleculeKind, PathBuf)>, Error> {
    structure
        .hetero_groups()
        .into_iter()
        .map(|(category, group)| {
            let residue = group
                .iter_residues()
                .next()
                .map(|(chain_id, r)| r.identity(chain_id).to_string())
                .unwrap_or_default();
            let path = dir.join(format!("{}_{}_{}.pdb", name, category, residue));
            io::write_pdb_file(&path, &group)?;
            Ok((MoleculeKind::from_category(category), path))
        })
        .collect()
}

/// Splits off hetero groups, parametrises every part, and merges the fragments.
///
/// The merged system is also written as [`MANIFEST_FILE`] into the working directory.
pub fn assemble_system(
    target: AssembleTarget<'_>,
    parametriser: &dyn Parametriser,
    params: &ForceFieldParams,
    reparametrise: bool,
) -> Result<CombinedSystem, Error> {
    log::info!("Parametrising {}", target.name);

    let hetero_files = write_hetero_groups(target.structure, target.work_dir, target.name)?;
    let hetero: HashSet<ResidueId> = target
        .structure
        .select(|_, r| !r.category.is_protein())
        .into_iter()
        .collect();
    target.structure.purge(&hetero, PurgeMode::Discard);
    target.structure.renumber_residues();
    io::write_pdb_file(target.structure_path, target.structure)?;

    let protein = parametriser.parametrise(&ParametriseRequest {
        input: target.structure_path,
        kind: MoleculeKind::Protein,
        params,
        disulfide_bonds: &target.structure.disulfide_bonds,
        id: None,
    })?;
    let mut system = CombinedSystem::from(protein);

    for ligand in target.ligands.iter_mut() {
        system += ligand.parametrise(parametriser, params, reparametrise, MoleculeKind::Ligand, None)?;
    }

    for cofactor in target.cofactors.iter_mut() {
        let id = cofactor.site().map(|s| s.residue_name);
        system += cofactor.parametrise(
            parametriser,
            params,
            reparametrise,
            MoleculeKind::Cofactor,
            id.as_deref(),
        )?;
    }

    for (kind, path) in &hetero_files {
        system += parametriser.parametrise(&ParametriseRequest {
            input: path,
            kind: *kind,
            params,
            disulfide_bonds: &[],
            id: None,
        })?;
    }

    write_manifest(&system, target.work_dir)?;
    log::info!(
        "Assembled {} fragment(s): {} ligand(s), {} cofactor(s), {} other hetero group(s)",
        system.len(),
        target.ligands.len(),
        target.cofactors.len(),
        hetero_files.len()
    );
    Ok(system)
}

pub fn write_manifest(system: &CombinedSystem, dir: &Path) -> Result<PathBuf, Error> {
    let path = dir.join(MANIFEST_FILE);
    let content = system
        .to_toml_string()
        .map_err(|e| Error::config(Some(path.clone()), e.to_string()))?;
    fs::write(&path, content).map_err(|e| Error::filesystem(e, &path))?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<CombinedSystem, Error> {
    let content = fs::read_to_string(path).map_err(|e| Error::filesystem(e, path))?;
    CombinedSystem::from_toml_str(&content)
        .map_err(|e| Error::config(Some(path.to_path_buf()), e.to_string()))
}
