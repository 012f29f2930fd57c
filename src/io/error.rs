use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File formats the crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pdb,
    Fasta,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Pdb => f.write_str("PDB"),
            Format::Fasta => f.write_str("FASTA"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error for {}: {source}", location(.path))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to parse {format} {}: {details} (line {line_number})",
        location(.path)
    )]
    Parse {
        format: Format,
        path: Option<PathBuf>,
        line_number: usize,
        details: String,
    },

    #[error("inconsistent data in {format} {}: {details}", location(.path))]
    InconsistentData {
        format: Format,
        path: Option<PathBuf>,
        details: String,
    },
}

impl Error {
    pub fn from_io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { path, source }
    }

    pub fn parse(
        format: Format,
        path: Option<PathBuf>,
        line_number: usize,
        details: impl Into<String>,
    ) -> Self {
        Self::Parse {
            format,
            path,
            line_number,
            details: details.into(),
        }
    }

    pub fn inconsistent_data(
        format: Format,
        path: Option<PathBuf>,
        details: impl Into<String>,
    ) -> Self {
        Self::InconsistentData {
            format,
            path,
            details: details.into(),
        }
    }

    /// File the error refers to, if known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::InconsistentData { path, .. } => path.as_deref(),
        }
    }

    /// Names the file an error from an anonymous stream came from. A path that is already
    /// set is kept.
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        let (Self::Io { path, .. }
        | Self::Parse { path, .. }
        | Self::InconsistentData { path, .. }) = &mut self;
        if path.is_none() {
            *path = Some(new_path.into());
        }
        self
    }
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("file '{}'", p.display()),
        None => "stream source".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_mentions_stream_when_path_is_absent() {
        let err = Error::parse(Format::Pdb, None, 7, "Invalid X coordinate");
        assert_eq!(
            err.to_string(),
            "failed to parse PDB stream source: Invalid X coordinate (line 7)"
        );
        assert!(err.path().is_none());
    }

    #[test]
    fn with_path_fills_in_a_missing_location_only() {
        let err = Error::parse(Format::Fasta, None, 1, "bad header").with_path("seq.fasta");
        assert_eq!(
            err.to_string(),
            "failed to parse FASTA file 'seq.fasta': bad header (line 1)"
        );

        let err = err.with_path("other.fasta");
        assert_eq!(err.path(), Some(Path::new("seq.fasta")));
    }
}
