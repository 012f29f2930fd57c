//! External structure engines.
//!
//! Repair and protonation engines are black boxes that consume a structure file and
//! return a new one. Each engine is addressed by a [`ToolKind`] and driven through the
//! [`StructureTool`] trait; a [`Toolbox`] holds one implementation per kind. The
//! process-backed implementation configured from TOML lives in [`CommandTool`], and tests
//! substitute their own implementations.

mod config;
pub mod download;
mod parametrise;
mod process;

use crate::ops::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use config::{ParametriserConfig, ToolConfig, ToolboxConfig};
pub use parametrise::{CommandParametriser, ParametriseRequest, Parametriser};
pub use process::CommandTool;

/// Free-form engine options, rendered as `--key=value` arguments by [`CommandTool`].
pub type ToolOptions = BTreeMap<String, String>;

/// Returns `base` overlaid with `overrides`; keys present in both take the override.
pub fn merge_options(base: &ToolOptions, overrides: &ToolOptions) -> ToolOptions {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Modeller,
    CharmmGui,
    #[serde(rename = "pdbfixer")]
    PdbFixer,
    #[serde(rename = "pdb2pqr")]
    Pdb2Pqr,
    Babel,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Modeller,
        ToolKind::CharmmGui,
        ToolKind::PdbFixer,
        ToolKind::Pdb2Pqr,
        ToolKind::Babel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Modeller => "modeller",
            ToolKind::CharmmGui => "charmm-gui",
            ToolKind::PdbFixer => "pdbfixer",
            ToolKind::Pdb2Pqr => "pdb2pqr",
            ToolKind::Babel => "babel",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| format!("unknown tool '{}'", s.trim()))
    }
}

/// What an engine is asked to do with its input structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    /// Convert modified residues to their standard parents.
    ReplaceNonstandard,
    /// Model missing residues; `with_atoms` also completes incomplete residues.
    AddMissingResidues { with_atoms: bool },
    AddMissingAtoms,
    Protonate,
}

impl ToolAction {
    /// Key used for per-action arguments in tool configuration.
    pub fn key(&self) -> &'static str {
        match self {
            ToolAction::ReplaceNonstandard => "replace_nonstandard",
            ToolAction::AddMissingResidues { with_atoms: false } => "add_missing_residues",
            ToolAction::AddMissingResidues { with_atoms: true } => "add_missing_residues_and_atoms",
            ToolAction::AddMissingAtoms => "add_missing_atoms",
            ToolAction::Protonate => "protonate",
        }
    }
}

impl fmt::Display for ToolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key().replace('_', " "))
    }
}

/// Files an engine run may read.
#[derive(Debug, Clone, Copy)]
pub struct ToolInput<'a> {
    pub structure: &'a Path,
    pub sequence: Option<&'a Path>,
    pub code: Option<&'a str>,
}

impl<'a> ToolInput<'a> {
    pub fn structure(path: &'a Path) -> Self {
        Self {
            structure: path,
            sequence: None,
            code: None,
        }
    }
}

pub trait StructureTool {
    fn kind(&self) -> ToolKind;

    /// Whether the engine can run at all (installed, licensed).
    fn is_available(&self) -> bool {
        true
    }

    /// Runs the engine and returns the path of the structure it produced.
    fn apply(
        &self,
        input: &ToolInput<'_>,
        action: ToolAction,
        options: &ToolOptions,
    ) -> Result<PathBuf, Error>;
}

/// Registry of engine implementations, one per [`ToolKind`].
#[derive(Default)]
pub struct Toolbox {
    tools: BTreeMap<ToolKind, Box<dyn StructureTool>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds process-backed tools for every engine listed in `config`.
    pub fn from_config(config: &ToolboxConfig) -> Self {
        let mut toolbox = Self::new();
        for (kind, tool_config) in &config.tools {
            toolbox.register(CommandTool::new(*kind, tool_config.clone()));
        }
        toolbox
    }

    /// Adds `tool`, replacing any implementation registered for the same kind.
    pub fn register<T: StructureTool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.insert(tool.kind(), Box::new(tool));
        self
    }

    pub fn is_available(&self, kind: ToolKind) -> bool {
        self.tools.get(&kind).is_some_and(|t| t.is_available())
    }

    pub fn get(&self, kind: ToolKind) -> Result<&dyn StructureTool, Error> {
        self.tools
            .get(&kind)
            .filter(|t| t.is_available())
            .map(|t| t.as_ref())
            .ok_or_else(|| Error::tool_unavailable(kind.name()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.tools.keys().copied()
    }
}

impl fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolbox")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        kind: ToolKind,
        available: bool,
    }

    impl StructureTool for Fixed {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn apply(
            &self,
            input: &ToolInput<'_>,
            _action: ToolAction,
            _options: &ToolOptions,
        ) -> Result<PathBuf, Error> {
            Ok(input.structure.to_path_buf())
        }
    }

    #[test]
    fn tool_kinds_parse_from_their_names() {
        assert_eq!("charmm-gui".parse::<ToolKind>(), Ok(ToolKind::CharmmGui));
        assert_eq!(" PDB2PQR ".parse::<ToolKind>(), Ok(ToolKind::Pdb2Pqr));
        assert!("rosetta".parse::<ToolKind>().is_err());
    }

    #[test]
    fn unavailable_tools_are_rejected_by_the_toolbox() {
        let mut toolbox = Toolbox::new();
        toolbox
            .register(Fixed {
                kind: ToolKind::Modeller,
                available: false,
            })
            .register(Fixed {
                kind: ToolKind::PdbFixer,
                available: true,
            });

        assert!(!toolbox.is_available(ToolKind::Modeller));
        assert!(toolbox.is_available(ToolKind::PdbFixer));
        assert!(!toolbox.is_available(ToolKind::Babel));
        assert!(matches!(
            toolbox.get(ToolKind::Modeller),
            Err(Error::ToolUnavailable { .. })
        ));
        assert_eq!(toolbox.get(ToolKind::PdbFixer).unwrap().kind(), ToolKind::PdbFixer);
    }

    #[test]
    fn merged_options_prefer_overrides() {
        let base: ToolOptions = [("ph".to_string(), "7.0".to_string())].into();
        let overrides: ToolOptions = [
            ("ph".to_string(), "6.5".to_string()),
            ("ff".to_string(), "AMBER".to_string()),
        ]
        .into();

        let merged = merge_options(&base, &overrides);
        assert_eq!(merged["ph"], "6.5");
        assert_eq!(merged["ff"], "AMBER");
    }
}
