//! Residue identities and the short identifier strings users type to refer to them.
//!
//! A [`ResidueId`] is the `(chainID, resSeq, iCode)` triple used throughout the crate to
//! address residues, missing residues, and small molecules. Identifiers such as `"400G"`
//! or `"B12A"` are normalized into that triple by [`ResidueId::parse`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chain assigned to identifiers that do not start with a chain letter.
pub const DEFAULT_CHAIN: char = 'A';

/// Raised when an identifier string cannot be normalized into a [`ResidueId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed residue identifier '{input}'")]
pub struct ParseIdentifierError {
    pub input: String,
}

/// Immutable `(chain, sequence number, insertion code)` triple.
///
/// Ordering is lexicographic over the fields in declaration order. A blank insertion code
/// (`None`) sorts before any letter, so `A10 < A10A < A11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueId {
    pub chain_id: char,
    pub res_seq: i32,
    pub i_code: Option<char>,
}

impl ResidueId {
    pub fn new(chain_id: char, res_seq: i32, i_code: Option<char>) -> Self {
        Self {
            chain_id,
            res_seq,
            i_code: i_code.filter(|c| !c.is_whitespace()),
        }
    }

    /// Normalizes a short identifier such as `"400G"` into a residue identity.
    ///
    /// Surrounding whitespace is ignored. A leading letter is consumed as the chain
    /// (defaulting to [`DEFAULT_CHAIN`]); a trailing letter is consumed as the insertion
    /// code. The remainder must be numeric and is truncated towards zero, so `"12.0"`
    /// yields sequence number 12.
    ///
    /// # Errors
    ///
    /// Returns [`ParseIdentifierError`] when the numeric remainder is empty or invalid.
    pub fn parse(input: &str) -> Result<Self, ParseIdentifierError> {
        let malformed = || ParseIdentifierError {
            input: input.to_string(),
        };

        let mut rest = input.trim();

        let mut chars = rest.chars();
        let chain_id = match chars.next() {
            Some(c) if c.is_alphabetic() => {
                rest = chars.as_str();
                c
            }
            Some(_) => DEFAULT_CHAIN,
            None => return Err(malformed()),
        };

        let mut i_code = None;
        if let Some(last) = rest.chars().last() {
            if last.is_alphabetic() {
                i_code = Some(last);
                rest = &rest[..rest.len() - last.len_utf8()];
            }
        }

        let value: f64 = rest.trim().parse().map_err(|_| malformed())?;
        if !value.is_finite() || value.abs() >= i32::MAX as f64 {
            return Err(malformed());
        }

        Ok(Self::new(chain_id, value.trunc() as i32, i_code))
    }

    /// Sequence number and insertion code without the chain, e.g. `"400G"`.
    pub fn seq_code(&self) -> String {
        match self.i_code {
            Some(code) => format!("{}{}", self.res_seq, code),
            None => self.res_seq.to_string(),
        }
    }

    /// Compares sequence number and insertion code while ignoring the chain.
    pub fn same_position(&self, other: &ResidueId) -> bool {
        self.res_seq == other.res_seq && self.i_code == other.i_code
    }

    /// Insertion code rendered as the single PDB column character.
    pub fn i_code_char(&self) -> char {
        self.i_code.unwrap_or(' ')
    }
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.chain_id, self.seq_code())
    }
}

impl FromStr for ResidueId {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
