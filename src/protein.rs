//! The protein being prepared, with its small molecules and files.
//!
//! A [`Protein`] owns one structure, an optional set of reference sequences, the held
//! ligands and cofactors, and at most one reference ligand. Its lifecycle is
//! [`filter`](Protein::filter) → [`prepare`](Protein::prepare) →
//! [`parametrise`](Protein::parametrise); each step mutates the structure in place and
//! rewrites `<name>.pdb` (and `<name>.fasta` when sequences change) in the working
//! directory.

use crate::io::{self, IoContext};
use crate::ligand::Ligand;
use crate::model::identity::ResidueId;
use crate::model::sequence::SequenceSet;
use crate::model::structure::Structure;
use crate::model::system::{CombinedSystem, ForceFieldParams};
use crate::ops::{
    self, AssembleTarget, Error, FilterConfig, FilterOutcome, PrepareReport, PrepareRequest,
    PrepareTarget, Warning,
};
use crate::tools::download::Downloader;
use crate::tools::{Parametriser, Toolbox};
use crate::workdir::{WorkDir, WorkDirGuard};
use std::path::{Path, PathBuf};

/// How the reference ligand is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LigandRef {
    /// Use the only held ligand, if there is exactly one.
    #[default]
    Auto,
    /// Never assign a reference ligand.
    Disabled,
    Molecule(Ligand),
    /// Pick the held ligand whose chain and number match, e.g. `"400G"` or `"B400G"`.
    Identifier(String),
    /// Load the reference ligand from a file; it is named `<protein>_ref`.
    File(PathBuf),
}

/// Builder for [`Protein`].
///
/// Inputs the caller does not supply are requested from the downloader, when one is set
/// and a structure code is known.
#[derive(Default)]
pub struct ProteinBuilder {
    code: Option<String>,
    name: Option<String>,
    work_dir: Option<PathBuf>,
    structure: Option<PathBuf>,
    sequence: Option<PathBuf>,
    ligands: Option<Vec<Ligand>>,
    ligand_ref: LigandRef,
    complex_template: Option<PathBuf>,
    context: IoContext,
    downloader: Option<Box<dyn Downloader>>,
}

impl ProteinBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Name of the protein; defaults to the structure code.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Working directory; defaults to a directory named after the protein.
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(path.into());
        self
    }

    pub fn structure_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.structure = Some(path.into());
        self
    }

    pub fn sequence_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sequence = Some(path.into());
        self
    }

    /// Small molecules to hold. Without this call they are downloaded when possible.
    pub fn ligands(mut self, ligands: Vec<Ligand>) -> Self {
        self.ligands = Some(ligands);
        self
    }

    pub fn ligand_files<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ligands(paths.into_iter().map(Ligand::from_file).collect())
    }

    pub fn ligand_ref(mut self, ligand_ref: LigandRef) -> Self {
        self.ligand_ref = ligand_ref;
        self
    }

    /// Manifest of an already assembled system; see [`Protein::parametrise`].
    pub fn complex_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.complex_template = Some(path.into());
        self
    }

    pub fn context(mut self, context: IoContext) -> Self {
        self.context = context;
        self
    }

    pub fn downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Some(Box::new(downloader));
        self
    }

    /// Loads all inputs into the working directory and applies the initial filter.
    ///
    /// The initial filter keeps every residue category and every recorded gap, so it only
    /// removes ligand and cofactor residues from the structure (they are held as separate
    /// molecules) and drops held molecules that classify as neither.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingName`] when neither a name nor a code is given.
    /// * [`Error::ToolUnavailable`] when an input is absent and cannot be downloaded.
    /// * [`Error::LigandNotFound`] / [`Error::MalformedIdentifier`] for an unusable
    ///   reference-ligand identifier.
    /// * Any I/O or parse failure of the inputs.
    pub fn build(self) -> Result<Protein, Error> {
        let name = self
            .name
            .clone()
            .or_else(|| self.code.clone())
            .ok_or(Error::MissingName)?;
        let work_dir = WorkDir::new(self.work_dir.clone().unwrap_or_else(|| PathBuf::from(&name)));

        let (mut protein, ligand_ref) = {
            let guard = work_dir.enter()?;
            self.load(&guard, name, work_dir.clone())?
        };

        protein.filter(&FilterConfig::keep_all())?;
        protein.set_ligand_ref(ligand_ref)?;
        Ok(protein)
    }

    fn load(
        self,
        guard: &WorkDirGuard<'_>,
        name: String,
        work_dir: WorkDir,
    ) -> Result<(Protein, LigandRef), Error> {
        let downloader = self.downloader.as_deref();
        let code = self.code.as_deref();

        let source = match (&self.structure, code, downloader) {
            (Some(path), _, _) => path.clone(),
            (None, Some(code), Some(downloader)) => {
                downloader.fetch_structure(code, guard.path())?
            }
            _ => return Err(Error::tool_unavailable("downloader")),
        };
        let structure_path = guard.import(&source, format!("{}.pdb", name))?;
        let structure = io::read_pdb_file(&structure_path, &self.context)?;
        log::info!("Loaded {}: {}", name, structure);

        let sequence_source = match (&self.sequence, code, downloader) {
            (Some(path), _, _) => Some(path.clone()),
            (None, Some(code), Some(downloader)) => {
                Some(downloader.fetch_sequence(code, guard.path())?)
            }
            _ => None,
        };
        let (sequences, sequence_path) = match sequence_source {
            Some(source) => {
                let path = guard.import(&source, format!("{}.fasta", name))?;
                (Some(io::read_fasta_file(&path)?), Some(path))
            }
            None => (None, None),
        };

        let mut ligands = match self.ligands {
            Some(ligands) => ligands,
            None => match (code, downloader) {
                (Some(code), Some(downloader)) => downloader
                    .fetch_ligands(code, guard.path())?
                    .into_iter()
                    .map(Ligand::from_file)
                    .collect(),
                _ => Vec::new(),
            },
        };
        for ligand in &mut ligands {
            if let Some(file_name) = ligand.path().file_name().map(PathBuf::from) {
                let path = guard.import(ligand.path(), file_name)?;
                ligand.set_path(path);
            }
        }

        let ligand_ref = match self.ligand_ref {
            LigandRef::File(path) => {
                let extension = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                let ref_name = format!("{}_ref", name);
                let imported = guard.import(&path, format!("{}{}", ref_name, extension))?;
                LigandRef::Molecule(Ligand::new(ref_name, imported))
            }
            other => other,
        };

        let complex_template = self
            .complex_template
            .as_deref()
            .map(ops::read_manifest)
            .transpose()?;

        let mut protein = Protein {
            name,
            code: self.code,
            work_dir,
            structure,
            structure_path,
            sequences,
            sequence_path,
            ligands,
            cofactors: Vec::new(),
            ligand_ref: None,
            complex_template,
            context: self.context,
            warnings: Vec::new(),
        };
        if let Some(warning) = protein.sequence_length_warning() {
            warning.emit(&mut protein.warnings);
        }
        Ok((protein, ligand_ref))
    }
}

/// A protein under preparation.
#[derive(Debug)]
pub struct Protein {
    name: String,
    code: Option<String>,
    work_dir: WorkDir,
    structure: Structure,
    structure_path: PathBuf,
    sequences: Option<SequenceSet>,
    sequence_path: Option<PathBuf>,
    ligands: Vec<Ligand>,
    cofactors: Vec<Ligand>,
    ligand_ref: Option<Ligand>,
    complex_template: Option<CombinedSystem>,
    context: IoContext,
    warnings: Vec<Warning>,
}

impl Protein {
    pub fn builder() -> ProteinBuilder {
        ProteinBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn structure_path(&self) -> &Path {
        &self.structure_path
    }

    pub fn sequences(&self) -> Option<&SequenceSet> {
        self.sequences.as_ref()
    }

    pub fn sequence_path(&self) -> Option<&Path> {
        self.sequence_path.as_deref()
    }

    pub fn ligands(&self) -> &[Ligand] {
        &self.ligands
    }

    pub fn cofactors(&self) -> &[Ligand] {
        &self.cofactors
    }

    pub fn ligand_ref(&self) -> Option<&Ligand> {
        self.ligand_ref.as_ref()
    }

    pub fn complex_template(&self) -> Option<&CombinedSystem> {
        self.complex_template.as_ref()
    }

    /// Warnings raised while loading the inputs.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Assigns the reference ligand. A reference, once set, cannot be replaced.
    ///
    /// # Errors
    ///
    /// * [`Error::ReferenceReassignment`] when a reference ligand is already set.
    /// * [`Error::MalformedIdentifier`] when an identifier cannot be parsed.
    /// * [`Error::LigandNotFound`] when no held ligand matches an identifier.
    pub fn set_ligand_ref(&mut self, ligand_ref: LigandRef) -> Result<(), Error> {
        if let Some(current) = &self.ligand_ref {
            return Err(Error::reference_reassignment(current.name()));
        }

        self.ligand_ref = match ligand_ref {
            LigandRef::Auto if self.ligands.len() == 1 => self.ligands.pop(),
            LigandRef::Auto | LigandRef::Disabled => None,
            LigandRef::Molecule(ligand) => Some(ligand),
            LigandRef::Identifier(identifier) => {
                let wanted = ResidueId::parse(&identifier)?;
                let index = self
                    .ligands
                    .iter()
                    .position(|l| {
                        l.site().is_some_and(|s| {
                            s.id.chain_id == wanted.chain_id && s.seq_code == wanted.seq_code()
                        })
                    })
                    .ok_or_else(|| Error::ligand_not_found(&identifier))?;
                Some(self.ligands.remove(index))
            }
            LigandRef::File(path) => Some(Ligand::new(format!("{}_ref", self.name), path)),
        };

        if let Some(ligand) = &self.ligand_ref {
            log::info!("Reference ligand of {} is {}", self.name, ligand);
        }
        Ok(())
    }

    /// Filters the structure and the held molecules; see [`ops::filter_structure`].
    pub fn filter(&mut self, config: &FilterConfig) -> Result<FilterOutcome, Error> {
        let guard = self.work_dir.enter()?;

        let molecules: Vec<Ligand> = self
            .ligands
            .iter()
            .chain(&self.cofactors)
            .cloned()
            .collect();
        let outcome = ops::filter_structure(
            &mut self.structure,
            &molecules,
            self.sequences.as_ref(),
            config,
            self.context.table(),
        )?;

        self.ligands = outcome.ligands.clone();
        self.cofactors = outcome.cofactors.clone();
        if let Some(sequences) = &outcome.sequences {
            let path = self
                .sequence_path
                .clone()
                .unwrap_or_else(|| guard.join(format!("{}.fasta", self.name)));
            io::write_fasta_file(&path, sequences)?;
            self.sequences = Some(sequences.clone());
            self.sequence_path = Some(path);
        }
        io::write_pdb_file(&self.structure_path, &self.structure)?;
        Ok(outcome)
    }

    /// Repairs and protonates the protein and protonates the held molecules; see
    /// [`ops::prepare_structure`].
    ///
    /// The final structure is copied back to `<name>.pdb`.
    pub fn prepare(
        &mut self,
        request: &PrepareRequest,
        toolbox: &Toolbox,
    ) -> Result<PrepareReport, Error> {
        let guard = self.work_dir.enter()?;
        let canonical = guard.join(format!("{}.pdb", self.name));

        let molecules: Vec<&mut Ligand> = self
            .ligands
            .iter_mut()
            .chain(self.cofactors.iter_mut())
            .chain(self.ligand_ref.iter_mut())
            .collect();
        let mut report = ops::prepare_structure(
            PrepareTarget {
                structure: &mut self.structure,
                structure_path: &mut self.structure_path,
                sequence_path: self.sequence_path.as_deref(),
                code: self.code.as_deref(),
                molecules,
            },
            request,
            toolbox,
            &self.context,
        )?;

        if self.structure_path != canonical {
            self.structure_path = guard.import(&self.structure_path, &canonical)?;
        }
        if let Some(warning) = self.sequence_length_warning() {
            warning.emit(&mut report.warnings);
        }
        Ok(report)
    }

    /// Parametrises the protein and every held molecule and merges the result.
    ///
    /// When a complex template is already present it is returned unchanged unless
    /// `reparametrise` is set.
    pub fn parametrise(
        &mut self,
        parametriser: &dyn Parametriser,
        params: &ForceFieldParams,
        reparametrise: bool,
    ) -> Result<CombinedSystem, Error> {
        if let Some(system) = &self.complex_template {
            if !reparametrise {
                log::debug!("{} is already parametrised", self.name);
                return Ok(system.clone());
            }
        }

        let guard = self.work_dir.enter()?;
        let system = ops::assemble_system(
            AssembleTarget {
                structure: &mut self.structure,
                structure_path: &self.structure_path,
                work_dir: guard.path(),
                name: &self.name,
                ligands: &mut self.ligands,
                cofactors: &mut self.cofactors,
            },
            parametriser,
            params,
            reparametrise,
        )?;
        self.complex_template = Some(system.clone());
        Ok(system)
    }

    /// Compares the polymer length (present plus missing residues) with the total
    /// reference sequence length.
    pub fn sequence_length_warning(&self) -> Option<Warning> {
        let sequences = self.sequences.as_ref()?;
        let structure = self.structure.polymer_slots().len();
        let sequence = sequences.total_len();
        (structure != sequence).then_some(Warning::SequenceLength {
            structure,
            sequence,
        })
    }
}
