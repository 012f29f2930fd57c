use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use holo_forge::Protein;
use holo_forge::ops::{
    AtomStrategy, LigandProtonation, PrepareReport, PrepareRequest, ProteinProtonation,
    ResidueStrategy,
};
use holo_forge::tools::{Toolbox, ToolboxConfig};

use crate::commands::{load_toml, print_boxed_label, print_warnings, run_with_spinner};

/// Repair settings. Flags override the values read from `--prepare-config`.
#[derive(Debug, Clone, Default, Args)]
pub struct PrepareArgs {
    /// TOML file with `[tools.<engine>]` tables.
    #[arg(long, value_name = "FILE")]
    tools: PathBuf,
    /// TOML file with the repair settings.
    #[arg(long, value_name = "FILE")]
    prepare_config: Option<PathBuf>,
    /// Engine filling missing residues: modeller, charmm-gui, pdbfixer, or none.
    #[arg(long)]
    add_missing_residues: Option<ResidueStrategy>,
    /// Engine adding missing atoms: modeller, pdb2pqr, pdbfixer, or none.
    #[arg(long)]
    add_missing_atoms: Option<AtomStrategy>,
    /// pdb2pqr or none.
    #[arg(long)]
    protonate_protein: Option<ProteinProtonation>,
    /// babel or none.
    #[arg(long)]
    protonate_ligands: Option<LigandProtonation>,
    /// Keep modified residues instead of converting them to their parents.
    #[arg(long)]
    keep_nonstandard: bool,
    /// Repair residues missing backbone atoms in place instead of rebuilding them.
    #[arg(long)]
    force_add_atoms: bool,
}

impl PrepareArgs {
    pub fn request(&self) -> Result<PrepareRequest> {
        let mut request = match &self.prepare_config {
            Some(path) => load_toml(path)?,
            None => PrepareRequest::default(),
        };
        if let Some(strategy) = self.add_missing_residues {
            request.add_missing_residues = strategy;
        }
        if let Some(strategy) = self.add_missing_atoms {
            request.add_missing_atoms = strategy;
        }
        if let Some(strategy) = self.protonate_protein {
            request.protonate_protein = strategy;
        }
        if let Some(strategy) = self.protonate_ligands {
            request.protonate_ligands = strategy;
        }
        if self.keep_nonstandard {
            request.replace_nonstandard = false;
        }
        if self.force_add_atoms {
            request.force_add_atoms = true;
        }
        Ok(request)
    }
}

pub fn run(protein: &mut Protein, args: &PrepareArgs) -> Result<()> {
    let request = args.request()?;
    let config = ToolboxConfig::load(&args.tools)
        .with_context(|| format!("Failed to load tools from {}", args.tools.display()))?;
    let toolbox = Toolbox::from_config(&config);

    let report = run_with_spinner("Preparing", || {
        protein
            .prepare(&request, &toolbox)
            .context("Failed to prepare the protein")
    })?;

    print_report(&report)?;
    log::info!("Prepared structure written to {}", protein.structure_path().display());
    Ok(())
}

pub fn print_report(report: &PrepareReport) -> Result<()> {
    let mut stderr = io::stderr().lock();

    print_boxed_label(&mut stderr, "Repair Plan")?;
    writeln!(&mut stderr, "{}", report.plan)?;

    if !report.runs.is_empty() {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["Step", "Engine", "Action"]);
        for (index, run) in report.runs.iter().enumerate() {
            table.add_row(row![index + 1, run.tool, run.action]);
        }
        table
            .print(&mut stderr)
            .context("Failed to render tool runs")?;
    }

    if !report.promoted.is_empty() {
        let promoted: Vec<_> = report.promoted.iter().map(|id| id.to_string()).collect();
        writeln!(
            &mut stderr,
            "Rebuilt as missing residues (incomplete backbone): {}",
            promoted.join(", ")
        )?;
    }
    drop(stderr);

    print_warnings(&report.warnings)
}
