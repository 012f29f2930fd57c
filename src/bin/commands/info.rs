use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use holo_forge::io::{read_fasta_file, read_pdb_file};
use holo_forge::{Chain, ResidueCategory, SequenceSet, Structure};

use crate::commands::{ensure_file, load_context, print_boxed_label, run_with_spinner};

/// Report-only command that inspects a structure file.
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Structure file in PDB format.
    #[arg(value_name = "FILE")]
    structure: PathBuf,
    /// Reference sequences to compare against.
    #[arg(long, value_name = "FILE")]
    sequence: Option<PathBuf>,
    /// Residue classification table replacing the built-in one.
    #[arg(long, value_name = "FILE")]
    residue_table: Option<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    ensure_file(&args.structure, "the structure path")?;
    let context = load_context(args.residue_table.as_deref())?;

    let (structure, sequences) = run_with_spinner("Reading structure", || {
        let structure = read_pdb_file(&args.structure, &context)
            .with_context(|| format!("Failed to parse {}", args.structure.display()))?;
        let sequences = args
            .sequence
            .as_deref()
            .map(|path| {
                read_fasta_file(path)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            })
            .transpose()?;
        Ok((structure, sequences))
    })?;

    print_tables(&structure, sequences.as_ref())
}

fn print_tables(structure: &Structure, sequences: Option<&SequenceSet>) -> Result<()> {
    let mut stderr = io::stderr().lock();

    print_boxed_label(&mut stderr, "HoloForge Structure Report")?;
    writeln!(&mut stderr)?;

    print_boxed_label(&mut stderr, "Chain Breakdown")?;
    let mut chain_table = Table::new();
    chain_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    chain_table.set_titles(row![
        "Chain",
        "Residues",
        "Atoms",
        "Missing Residues",
        "Reference Length",
        "Composition"
    ]);
    for chain in structure.iter_chains() {
        let missing = structure
            .missing_residues
            .iter()
            .filter(|m| m.id.chain_id == chain.id)
            .count();
        let reference = sequences
            .and_then(|s| s.get(chain.id))
            .map(|s| s.len().to_string())
            .unwrap_or_else(|| "-".to_string());
        chain_table.add_row(row![
            chain.id,
            chain.residue_count(),
            chain.iter_atoms().count(),
            missing,
            reference,
            composition(chain)
        ]);
    }
    chain_table
        .print(&mut stderr)
        .context("Failed to render chain summary")?;
    writeln!(&mut stderr)?;

    let hetero: Vec<_> = structure
        .iter_residues()
        .filter(|(_, r)| !r.category.is_protein())
        .collect();
    if !hetero.is_empty() {
        print_boxed_label(&mut stderr, "Hetero Groups")?;
        let mut hetero_table = Table::new();
        hetero_table.set_format(*format::consts::FORMAT_BOX_CHARS);
        hetero_table.set_titles(row!["Residue", "Name", "Category", "Atoms"]);
        for (chain_id, residue) in hetero {
            hetero_table.add_row(row![
                residue.identity(chain_id),
                residue.name,
                residue.category,
                residue.atom_count()
            ]);
        }
        hetero_table
            .print(&mut stderr)
            .context("Failed to render hetero groups")?;
        writeln!(&mut stderr)?;
    }

    print_boxed_label(&mut stderr, "Structure Summary")?;
    let mut summary_table = Table::new();
    summary_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    summary_table.set_titles(row!["Metric", "Value"]);
    summary_table.add_row(row!["Missing Residues", structure.missing_residues.len()]);
    summary_table.add_row(row!["Residues Missing Atoms", structure.missing_atoms.len()]);
    summary_table.add_row(row![
        "Residues Missing Backbone",
        structure
            .missing_atoms
            .iter()
            .filter(|m| m.lacks_backbone())
            .count()
    ]);
    summary_table.add_row(row!["Modified Residues", structure.modified_residues.len()]);
    summary_table.add_row(row!["Disulfide Bonds", structure.disulfide_bonds.len()]);
    summary_table.add_row(row!["Site Residues", structure.site_residues.len()]);
    if let Some(sequences) = sequences {
        summary_table.add_row(row![
            "Polymer Slots / Reference Length",
            format!("{} / {}", structure.polymer_slots().len(), sequences.total_len())
        ]);
    }
    summary_table
        .print(&mut stderr)
        .context("Failed to render structure summary")?;

    Ok(())
}

/// Residue counts per category, e.g. `amino_acid 120, water 30`.
fn composition(chain: &Chain) -> String {
    if chain.is_empty() {
        return "Empty".to_string();
    }

    let mut counts: BTreeMap<ResidueCategory, usize> = BTreeMap::new();
    for residue in chain.iter_residues() {
        *counts.entry(residue.category).or_default() += 1;
    }
    counts
        .iter()
        .map(|(category, count)| format!("{} {}", category, count))
        .collect::<Vec<_>>()
        .join(", ")
}
