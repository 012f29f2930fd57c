use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use holo_forge::Protein;
use holo_forge::ops::{ChainSelection, FilterConfig, MissingResiduePolicy, Policy};

use crate::commands::{load_toml, print_warnings, run_with_spinner};

/// Filter settings. Flags override the values read from `--filter-config`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// TOML file with the filter settings.
    #[arg(long, value_name = "FILE")]
    filter_config: Option<PathBuf>,
    /// Chains to keep, e.g. `A,B`, or `all`.
    #[arg(long)]
    chains: Option<ChainSelection>,
    /// Gaps to keep: `all` or `middle`.
    #[arg(long)]
    missing_residues: Option<MissingResiduePolicy>,
    #[arg(long)]
    waters: Option<Policy>,
    #[arg(long)]
    ligands: Option<Policy>,
    #[arg(long)]
    cofactors: Option<Policy>,
    #[arg(long)]
    simple_anions: Option<Policy>,
    #[arg(long)]
    complex_anions: Option<Policy>,
    #[arg(long)]
    simple_cations: Option<Policy>,
    #[arg(long)]
    complex_cations: Option<Policy>,
    /// Residue or molecule to keep regardless of policy; repeatable.
    #[arg(long = "include", value_name = "ID")]
    include_mols: Vec<String>,
    /// Residue or molecule to drop regardless of policy; repeatable.
    #[arg(long = "exclude", value_name = "ID")]
    exclude_mols: Vec<String>,
}

impl FilterArgs {
    pub fn config(&self) -> Result<FilterConfig> {
        let mut config = match &self.filter_config {
            Some(path) => load_toml(path)?,
            None => FilterConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut FilterConfig) {
        if let Some(chains) = &self.chains {
            config.chains = chains.clone();
        }
        if let Some(policy) = self.missing_residues {
            config.missing_residues = policy;
        }
        let overrides = [
            (self.waters, &mut config.waters),
            (self.ligands, &mut config.ligands),
            (self.cofactors, &mut config.cofactors),
            (self.simple_anions, &mut config.simple_anions),
            (self.complex_anions, &mut config.complex_anions),
            (self.simple_cations, &mut config.simple_cations),
            (self.complex_cations, &mut config.complex_cations),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        config.include_mols.extend(self.include_mols.iter().cloned());
        config.exclude_mols.extend(self.exclude_mols.iter().cloned());
    }
}

pub fn run(protein: &mut Protein, args: &FilterArgs) -> Result<()> {
    let config = args.config()?;
    let outcome = run_with_spinner("Filtering", || {
        protein.filter(&config).context("Failed to filter the protein")
    })?;

    log::info!(
        "Removed {} residue(s); holding {} ligand(s) and {} cofactor(s); wrote {}",
        outcome.removed_residues,
        outcome.ligands.len(),
        outcome.cofactors.len(),
        protein.structure_path().display()
    );
    print_warnings(&outcome.warnings)
}
