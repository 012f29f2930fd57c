use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use prettytable::{Table, format, row};
use serde::Deserialize;

use holo_forge::ops::{FilterConfig, MANIFEST_FILE, PrepareRequest};
use holo_forge::tools::{
    CommandParametriser, ParametriserConfig, ToolConfig, ToolKind, Toolbox, ToolboxConfig,
};
use holo_forge::{CombinedSystem, ForceFieldParams, Protein};

use crate::commands::prepare::print_report;
use crate::commands::{
    ensure_file, load_toml, print_boxed_label, print_warnings, run_with_spinner,
};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// TOML pipeline with `[filter]`, `[prepare]`, `[params]`, `[tools.<engine>]`, and
    /// `[parametriser]` tables.
    #[arg(long, value_name = "FILE")]
    pipeline: PathBuf,
    /// Parametrise again even when a complex template exists.
    #[arg(long)]
    reparametrise: bool,
}

/// Whole-pipeline description read from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Pipeline {
    pub filter: FilterConfig,
    pub prepare: PrepareRequest,
    pub params: ForceFieldParams,
    pub reparametrise: bool,
    pub tools: BTreeMap<ToolKind, ToolConfig>,
    pub parametriser: Option<ParametriserConfig>,
}

impl Pipeline {
    fn toolbox_config(&self) -> ToolboxConfig {
        ToolboxConfig {
            tools: self.tools.clone(),
            parametriser: self.parametriser.clone(),
        }
    }
}

pub fn run(protein: &mut Protein, args: &RunArgs) -> Result<()> {
    ensure_file(&args.pipeline, "--pipeline")?;
    let pipeline: Pipeline = load_toml(&args.pipeline)?;
    let config = pipeline.toolbox_config();
    let parametriser_config = config.parametriser.clone().ok_or_else(|| {
        anyhow!(
            "{} has no [parametriser] table; it is required to assemble the system.",
            args.pipeline.display()
        )
    })?;
    let toolbox = Toolbox::from_config(&config);
    let parametriser = CommandParametriser::new(parametriser_config);

    let outcome = run_with_spinner("Filtering", || {
        protein
            .filter(&pipeline.filter)
            .context("Failed to filter the protein")
    })?;
    print_warnings(&outcome.warnings)?;

    let report = run_with_spinner("Preparing", || {
        protein
            .prepare(&pipeline.prepare, &toolbox)
            .context("Failed to prepare the protein")
    })?;
    print_report(&report)?;

    let reparametrise = args.reparametrise || pipeline.reparametrise;
    let system = run_with_spinner("Parametrising", || {
        protein
            .parametrise(&parametriser, &pipeline.params, reparametrise)
            .context("Failed to parametrise the system")
    })?;

    print_system(&system)?;
    log::info!(
        "Complex template written to {}",
        protein.work_dir().join(MANIFEST_FILE).display()
    );
    Ok(())
}

fn print_system(system: &CombinedSystem) -> Result<()> {
    let mut stderr = io::stderr().lock();
    print_boxed_label(&mut stderr, "Assembled System")?;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["#", "Kind", "Name", "Files"]);
    for (index, fragment) in system.fragments().iter().enumerate() {
        let files: Vec<_> = fragment
            .files
            .iter()
            .map(|f| f.display().to_string())
            .collect();
        table.add_row(row![index + 1, fragment.kind, fragment.name, files.join("\n")]);
    }
    table
        .print(&mut stderr)
        .context("Failed to render the assembled system")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use holo_forge::ops::{ChainSelection, ResidueStrategy};

    #[test]
    fn pipeline_file_combines_every_stage() {
        let pipeline: Pipeline = toml::from_str(
            r#"
            reparametrise = true

            [filter]
            chains = ["A"]
            waters = "none"

            [prepare]
            add_missing_residues = "charmm-gui"

            [params]
            protein_ff = "ff19SB"

            [tools.pdb2pqr]
            program = "pdb2pqr30"

            [parametriser]
            program = "tleap-wrapper"
            "#,
        )
        .unwrap();

        assert!(pipeline.reparametrise);
        assert_eq!(pipeline.filter.chains, ChainSelection::only(['A']));
        assert_eq!(
            pipeline.prepare.add_missing_residues,
            ResidueStrategy::CharmmGui
        );
        assert_eq!(pipeline.params.protein_ff, "ff19SB");
        assert_eq!(pipeline.params.water_model, "tip3p");
        let config = pipeline.toolbox_config();
        assert!(config.tools.contains_key(&ToolKind::Pdb2Pqr));
        assert!(config.parametriser.is_some());
    }

    #[test]
    fn unknown_pipeline_tables_are_rejected() {
        let result: Result<Pipeline, _> = toml::from_str("[solvate]\nbox = 10\n");
        assert!(result.is_err());
    }
}
