use crate::model::identity::ParseIdentifierError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MalformedIdentifier(#[from] ParseIdentifierError),

    #[error("reference sequence does not cover chain(s) {}", format_chains(.missing_chains))]
    SequenceMismatch { missing_chains: Vec<char> },

    #[error("{operation} requires a reference sequence but none was supplied")]
    MissingSequence { operation: String },

    #[error("reference ligand is already set to '{current}'")]
    ReferenceReassignment { current: String },

    #[error("no ligand matches identifier '{identifier}'")]
    LigandNotFound { identifier: String },

    #[error("a name is required when no structure code is given")]
    MissingName,

    #[error("external tool '{tool}' is not available")]
    ToolUnavailable { tool: String },

    #[error("external tool '{tool}' failed: {details}")]
    ToolInvocation { tool: String, details: String },

    #[error("external tool '{tool}' timed out after {}s", .timeout.as_secs())]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("invalid configuration in {path_desc}: {details}", path_desc = config_source(.path))]
    Config {
        path: Option<PathBuf>,
        details: String,
    },

    #[error(transparent)]
    Io(#[from] crate::io::Error),
}

impl Error {
    pub fn missing_sequence(operation: impl Into<String>) -> Self {
        Self::MissingSequence {
            operation: operation.into(),
        }
    }

    pub fn reference_reassignment(current: impl Into<String>) -> Self {
        Self::ReferenceReassignment {
            current: current.into(),
        }
    }

    pub fn ligand_not_found(identifier: impl Into<String>) -> Self {
        Self::LigandNotFound {
            identifier: identifier.into(),
        }
    }

    pub fn tool_unavailable(tool: impl Into<String>) -> Self {
        Self::ToolUnavailable { tool: tool.into() }
    }

    pub fn tool_invocation(tool: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            details: details.into(),
        }
    }

    pub fn tool_timeout(tool: impl Into<String>, timeout: Duration) -> Self {
        Self::ToolTimeout {
            tool: tool.into(),
            timeout,
        }
    }

    pub fn config(path: Option<PathBuf>, details: impl Into<String>) -> Self {
        Self::Config {
            path,
            details: details.into(),
        }
    }

    /// Filesystem failure outside of structure or sequence parsing.
    pub fn filesystem(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io(crate::io::Error::from_io(source, Some(path.into())))
    }

    /// Returns `true` for failures worth retrying against the same input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ToolInvocation { .. } | Self::ToolTimeout { .. })
    }
}

fn format_chains(chains: &[char]) -> String {
    chains
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn config_source(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("'{}'", p.display()),
        None => "inline configuration".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::identity::ResidueId;

    #[test]
    fn malformed_identifier_converts_from_parse_error() {
        let err: Error = ResidueId::parse("A?").unwrap_err().into();
        assert!(matches!(err, Error::MalformedIdentifier(_)));
        assert!(err.to_string().contains("A?"));
    }

    #[test]
    fn sequence_mismatch_lists_uncovered_chains() {
        let err = Error::SequenceMismatch {
            missing_chains: vec!['B', 'C'],
        };
        assert_eq!(
            err.to_string(),
            "reference sequence does not cover chain(s) B, C"
        );
    }

    #[test]
    fn only_tool_failures_are_transient() {
        assert!(Error::tool_invocation("pdb2pqr", "exit status 1").is_transient());
        assert!(Error::tool_timeout("modeller", Duration::from_secs(5)).is_transient());
        assert!(!Error::MissingName.is_transient());
    }
}
