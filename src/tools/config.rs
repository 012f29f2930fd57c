use super::ToolKind;
use crate::ops::Error;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// Command line of one external engine.
///
/// `args` and `action_args` may contain the placeholders `{input}`, `{output}`,
/// `{sequence}`, and `{code}`. Arguments that reference a placeholder with no value for
/// the current run are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra arguments keyed by action (`add_missing_residues`, `protonate`, ...).
    #[serde(default)]
    pub action_args: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Environment variables that must be set for the engine to count as available.
    #[serde(default)]
    pub requires_env: Vec<String>,
}

impl ToolConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            action_args: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: 0,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            requires_env: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Command line of the external force-field engine.
///
/// Besides the [`ToolConfig`] placeholders, `args` may use `{kind}`, `{id}`,
/// `{protein_ff}`, `{ligand_ff}`, `{water_model}`, and `{output_dir}`. Every entry of
/// `outputs` names a file the engine is expected to produce, with `{stem}` replaced by
/// the input file stem.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametriserConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ParametriserConfig {
    /// Command settings shared with the structure engines.
    pub fn command(&self) -> ToolConfig {
        ToolConfig {
            args: self.args.clone(),
            timeout_secs: self.timeout_secs,
            retries: self.retries,
            retry_backoff_ms: self.retry_backoff_ms,
            ..ToolConfig::new(self.program.clone())
        }
    }
}

/// `[tools.<name>]` and `[parametriser]` tables of a tool configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolboxConfig {
    #[serde(default)]
    pub tools: BTreeMap<ToolKind, ToolConfig>,
    pub parametriser: Option<ParametriserConfig>,
}

impl ToolboxConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::config(None, e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::filesystem(e, path))?;
        toml::from_str(&content).map_err(|e| Error::config(Some(path.to_path_buf()), e.to_string()))
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_outputs() -> Vec<String> {
    vec!["{stem}.top".to_string(), "{stem}.gro".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolbox_config_parses_engines_with_defaults() {
        let config = ToolboxConfig::from_toml_str(
            r#"
            [tools.pdbfixer]
            program = "pdbfixer"
            args = ["{input}", "--output={output}"]

            [tools.pdbfixer.action_args]
            add_missing_residues = ["--add-residues"]

            [tools.modeller]
            program = "mod_fill"
            requires_env = ["KEY_MODELLER"]
            timeout_secs = 30
            retries = 2
            "#,
        )
        .unwrap();

        let fixer = &config.tools[&ToolKind::PdbFixer];
        assert_eq!(fixer.timeout(), Duration::from_secs(600));
        assert_eq!(fixer.retries, 0);
        assert_eq!(fixer.action_args["add_missing_residues"], vec!["--add-residues"]);

        let modeller = &config.tools[&ToolKind::Modeller];
        assert_eq!(modeller.requires_env, vec!["KEY_MODELLER"]);
        assert_eq!(modeller.retries, 2);
        assert!(config.parametriser.is_none());
    }

    #[test]
    fn parametriser_config_shares_command_settings() {
        let config = ToolboxConfig::from_toml_str(
            r#"
            [parametriser]
            program = "tleap-wrapper"
            args = ["{input}", "{kind}"]
            outputs = ["{stem}.prmtop", "{stem}.inpcrd"]
            "#,
        )
        .unwrap();

        let parametriser = config.parametriser.unwrap();
        assert_eq!(parametriser.command().program, "tleap-wrapper");
        assert_eq!(parametriser.command().timeout_secs, 600);
        assert_eq!(parametriser.outputs.len(), 2);
    }

    #[test]
    fn unknown_engines_are_configuration_errors() {
        let result = ToolboxConfig::from_toml_str(
            r#"
            [tools.rosetta]
            program = "rosetta"
            "#,
        );
        assert!(matches!(result, Err(Error::Config { path: None, .. })));
    }
}
