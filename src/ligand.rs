//! Small molecules (ligands and cofactors) handled as standalone files.
//!
//! Molecules are named `<code>_<RES>_<chain>_<resSeq><iCode>`, for example
//! `1ABC_HEM_A_401`. The embedded residue name decides whether a molecule is a ligand or a
//! cofactor, and the chain and number place it relative to the protein for filtering.
//! Molecules whose names do not follow the convention are treated as ligands with no
//! known position.

use crate::db::ResidueTable;
use crate::model::identity::ResidueId;
use crate::model::system::{ForceFieldParams, Fragment, MoleculeKind};
use crate::model::types::ResidueCategory;
use crate::ops::Error;
use crate::tools::{
    ParametriseRequest, Parametriser, StructureTool, ToolAction, ToolInput, ToolOptions,
};
use std::fmt;
use std::path::{Path, PathBuf};

/// Builds the conventional molecule name for a residue of structure `code`.
pub fn molecule_name(code: &str, residue_name: &str, id: &ResidueId) -> String {
    format!("{}_{}_{}_{}", code, residue_name, id.chain_id, id.seq_code())
}

/// Position information embedded in a conventional molecule name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeSite {
    pub code: String,
    pub residue_name: String,
    pub id: ResidueId,
    /// Sequence number and insertion code exactly as written in the name.
    pub seq_code: String,
}

impl MoleculeSite {
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split('_');
        let code = parts.next()?;
        let residue_name = parts.next()?;
        let chain = parts.next()?;
        let seq_code = parts.next()?;

        let word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !word(code) || !word(residue_name) || !word(seq_code) {
            return None;
        }
        let mut chain_chars = chain.chars();
        let chain_id = match (chain_chars.next(), chain_chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => c,
            _ => return None,
        };
        if seq_code.starts_with(|c: char| c.is_alphabetic()) {
            return None;
        }

        let parsed = ResidueId::parse(seq_code).ok()?;
        Some(Self {
            code: code.to_string(),
            residue_name: residue_name.to_string(),
            id: ResidueId::new(chain_id, parsed.res_seq, parsed.i_code),
            seq_code: seq_code.to_string(),
        })
    }
}

/// A ligand or cofactor file with its preparation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ligand {
    name: String,
    path: PathBuf,
    protonated: bool,
    parametrised_files: Vec<PathBuf>,
}

impl Ligand {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            protonated: false,
            parametrised_files: Vec::new(),
        }
    }

    /// Creates a molecule named after the file stem.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(name, path)
    }

    /// Marks the molecule as already carrying its hydrogens.
    pub fn with_protonated(mut self, protonated: bool) -> Self {
        self.protonated = protonated;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_protonated(&self) -> bool {
        self.protonated
    }

    pub fn parametrised_files(&self) -> &[PathBuf] {
        &self.parametrised_files
    }

    pub fn site(&self) -> Option<MoleculeSite> {
        MoleculeSite::parse(&self.name)
    }

    /// Category implied by the embedded residue name.
    pub fn category(&self, table: &ResidueTable) -> ResidueCategory {
        match self.site() {
            Some(site) => table.category(&site.residue_name),
            None => ResidueCategory::Ligand,
        }
    }

    /// Whether a user identifier such as `"400G"` or `"B400G"` refers to this molecule.
    ///
    /// The identifier matches when it equals the embedded `resSeq+iCode` text or when it
    /// parses to the molecule's full identity.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let Some(site) = self.site() else {
            return false;
        };
        identifier.trim() == site.seq_code
            || ResidueId::parse(identifier).is_ok_and(|id| id == site.id)
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Adds hydrogens with `tool`, replacing the molecule file with the tool output.
    pub fn protonate(
        &mut self,
        tool: &dyn StructureTool,
        options: &ToolOptions,
    ) -> Result<(), Error> {
        log::info!("Protonating {}", self.name);
        let output = tool.apply(&ToolInput::structure(&self.path), ToolAction::Protonate, options)?;
        self.path = output;
        self.protonated = true;
        self.parametrised_files.clear();
        Ok(())
    }

    /// Parametrises the molecule, reusing earlier output unless `reparametrise` is set.
    pub fn parametrise(
        &mut self,
        parametriser: &dyn Parametriser,
        params: &ForceFieldParams,
        reparametrise: bool,
        kind: MoleculeKind,
        id: Option<&str>,
    ) -> Result<Fragment, Error> {
        if !self.parametrised_files.is_empty() && !reparametrise {
            log::debug!("{} is already parametrised", self.name);
            return Ok(Fragment::new(kind, &self.name, self.parametrised_files.clone()));
        }

        let fragment = parametriser.parametrise(&ParametriseRequest {
            input: &self.path,
            kind,
            params,
            disulfide_bonds: &[],
            id,
        })?;
        self.parametrised_files = fragment.files.clone();
        Ok(Fragment::new(kind, &self.name, fragment.files))
    }
}

impl fmt::Display for Ligand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
