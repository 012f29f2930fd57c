use std::fs;
use std::io::{self as stdio, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use prettytable::{Table, format, row};
use serde::de::DeserializeOwned;

use holo_forge::io::IoContext;
use holo_forge::ops::Warning;
use holo_forge::{LigandRef, Protein, ResidueTable};

pub mod filter;
pub mod info;
pub mod prepare;
pub mod run;

/// Inputs describing the protein to work on, shared by every pipeline subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ProteinArgs {
    /// Four-character PDB code; also the default protein name.
    #[arg(short, long)]
    pub code: Option<String>,
    /// Structure file in PDB format. Each subcommand starts again from this file; use
    /// `--resume` to continue from the working directory instead.
    #[arg(short, long, value_name = "FILE", conflicts_with = "resume")]
    pub structure: Option<PathBuf>,
    /// Reference sequences in FASTA format.
    #[arg(long, value_name = "FILE", conflicts_with = "resume")]
    pub sequence: Option<PathBuf>,
    /// Continue from `<name>.pdb` and `<name>.fasta` left in the working directory by an
    /// earlier subcommand.
    #[arg(long)]
    pub resume: bool,
    /// Small-molecule file named `<code>_<RES>_<chain>_<number>`; repeatable.
    #[arg(short, long = "ligand", value_name = "FILE")]
    pub ligands: Vec<PathBuf>,
    /// Hold no small molecules instead of downloading them.
    #[arg(long, conflicts_with = "ligands")]
    pub no_ligands: bool,
    /// Reference ligand: `auto`, `none`, an identifier such as `400G`, or a file.
    #[arg(long, value_name = "REF")]
    pub ligand_ref: Option<String>,
    /// Protein name; required when no code is given.
    #[arg(short, long)]
    pub name: Option<String>,
    /// Working directory; defaults to the protein name.
    #[arg(short, long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
    /// Residue classification table replacing the built-in one.
    #[arg(long, value_name = "FILE")]
    pub residue_table: Option<PathBuf>,
}

impl ProteinArgs {
    fn ligand_ref(&self) -> LigandRef {
        match self.ligand_ref.as_deref() {
            None | Some("auto") => LigandRef::Auto,
            Some("none") => LigandRef::Disabled,
            Some(value) if Path::new(value).is_file() => LigandRef::File(value.into()),
            Some(value) => LigandRef::Identifier(value.to_string()),
        }
    }

    /// Structure and sequence files to load. With `--resume` these are the working-directory
    /// copies written by the previous subcommand.
    fn input_files(&self) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
        if !self.resume {
            return Ok((self.structure.clone(), self.sequence.clone()));
        }

        let Some(name) = self.name.as_ref().or(self.code.as_ref()) else {
            bail!("--resume needs --name or --code to locate the working directory.");
        };
        let work_dir = self.work_dir.clone().unwrap_or_else(|| PathBuf::from(name));
        let structure = work_dir.join(format!("{}.pdb", name));
        ensure_file(&structure, "--resume (run a subcommand without it first)")?;
        let sequence = work_dir.join(format!("{}.fasta", name));
        log::info!("Resuming from {}", structure.display());
        Ok((Some(structure), sequence.is_file().then_some(sequence)))
    }
}

/// Builds the I/O context, honouring a custom residue table.
pub fn load_context(residue_table: Option<&Path>) -> Result<IoContext> {
    let Some(path) = residue_table else {
        return Ok(IoContext::new_default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read residue table {}", path.display()))?;
    let table = ResidueTable::from_toml_str(&content)
        .with_context(|| format!("Failed to parse residue table {}", path.display()))?;
    Ok(IoContext::with_table(table))
}

/// Loads the protein into its working directory.
pub fn load_protein(args: &ProteinArgs) -> Result<Protein> {
    let mut builder = Protein::builder()
        .context(load_context(args.residue_table.as_deref())?)
        .ligand_ref(args.ligand_ref());

    if let Some(code) = &args.code {
        builder = builder.code(code);
    }
    if let Some(name) = &args.name {
        builder = builder.name(name);
    }
    if let Some(dir) = &args.work_dir {
        builder = builder.work_dir(dir);
    }
    let (structure, sequence) = args.input_files()?;
    if let Some(path) = &structure {
        builder = builder.structure_file(path);
    }
    if let Some(path) = sequence {
        builder = builder.sequence_file(path);
    }
    if args.no_ligands {
        builder = builder.ligands(Vec::new());
    } else if !args.ligands.is_empty() {
        builder = builder.ligand_files(args.ligands.iter().cloned());
    }

    #[cfg(feature = "fetch")]
    {
        builder = builder.downloader(holo_forge::tools::download::RcsbDownloader::new(
            load_context(args.residue_table.as_deref())?,
        ));
    }
    if cfg!(not(feature = "fetch")) && structure.is_none() {
        bail!("No --structure provided and this build cannot download. Rebuild with --features fetch or pass -s/--structure.");
    }

    let protein = run_with_spinner("Loading protein", || {
        builder.build().context("Failed to load the protein")
    })?;
    print_warnings(protein.warnings())?;
    Ok(protein)
}

/// Reads a TOML document into `T`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Wraps long-running operations with a spinner rendered to stderr.
///
/// Without a terminal on stderr the work runs silently.
pub fn run_with_spinner<T, F>(message: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    if !stdio::stderr().is_terminal() {
        return work();
    }

    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    let result = work();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} ✓", message)),
        Err(_) => spinner.abandon_with_message(format!("{} ✗", message)),
    }

    result
}

pub fn print_warnings(warnings: &[Warning]) -> Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }

    let mut stderr = stdio::stderr().lock();
    print_boxed_label(&mut stderr, "Warnings")?;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    for (index, warning) in warnings.iter().enumerate() {
        table.add_row(row![index + 1, warning]);
    }
    table
        .print(&mut stderr)
        .context("Failed to render warnings")?;
    Ok(())
}

pub fn print_boxed_label<W: Write>(writer: &mut W, title: &str) -> stdio::Result<()> {
    let inner = format!(" {title} ");
    let width = inner.chars().count();
    writeln!(writer, "╭{}╮", "─".repeat(width))?;
    writeln!(writer, "│{}│", inner)?;
    writeln!(writer, "╰{}╯", "─".repeat(width))?;
    Ok(())
}

/// Fails when the requested file does not exist, with a hint naming the flag.
pub fn ensure_file(path: &Path, flag: &str) -> Result<()> {
    if !path.is_file() {
        bail!("{} does not exist. Check {}.", path.display(), flag);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_reads_the_working_directory_copies() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("1abc");
        fs::create_dir(&work).unwrap();
        fs::write(work.join("1abc.pdb"), "END\n").unwrap();
        let args = ProteinArgs {
            code: Some("1abc".into()),
            work_dir: Some(work.clone()),
            resume: true,
            ..ProteinArgs::default()
        };

        let (structure, sequence) = args.input_files().unwrap();
        assert_eq!(structure, Some(work.join("1abc.pdb")));
        assert_eq!(sequence, None);

        fs::write(work.join("1abc.fasta"), ">1ABC_A\nA\n").unwrap();
        let (_, sequence) = args.input_files().unwrap();
        assert_eq!(sequence, Some(work.join("1abc.fasta")));
    }

    #[test]
    fn resume_without_an_earlier_run_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let args = ProteinArgs {
            name: Some("target".into()),
            work_dir: Some(root.path().to_path_buf()),
            resume: true,
            ..ProteinArgs::default()
        };
        assert!(args.input_files().is_err());
    }

    #[test]
    fn without_resume_the_given_inputs_are_used() {
        let args = ProteinArgs {
            structure: Some("input.pdb".into()),
            ..ProteinArgs::default()
        };
        let (structure, sequence) = args.input_files().unwrap();
        assert_eq!(structure, Some(PathBuf::from("input.pdb")));
        assert_eq!(sequence, None);
    }
}
