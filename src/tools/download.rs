//! Retrieval of deposited structures, sequences, and ligands by structure code.
//!
//! The [`Downloader`] trait is only consulted for inputs the caller did not supply. With
//! the `fetch` feature enabled, [`RcsbDownloader`] implements it over HTTPS against the
//! RCSB PDB using `ureq`.

use crate::ligand::molecule_name;
use crate::model::identity::ResidueId;
use crate::ops::Error;
use std::path::{Path, PathBuf};

pub trait Downloader {
    /// Downloads the structure of `code` into `dest_dir` and returns its path.
    fn fetch_structure(&self, code: &str, dest_dir: &Path) -> Result<PathBuf, Error>;

    /// Downloads the reference sequences of `code` into `dest_dir`.
    fn fetch_sequence(&self, code: &str, dest_dir: &Path) -> Result<PathBuf, Error>;

    /// Downloads one file per small-molecule instance of `code`, named by
    /// [`molecule_name`].
    fn fetch_ligands(&self, code: &str, dest_dir: &Path) -> Result<Vec<PathBuf>, Error>;
}

pub fn structure_url(code: &str) -> String {
    format!("https://files.rcsb.org/download/{}.pdb", code.to_ascii_uppercase())
}

pub fn sequence_url(code: &str) -> String {
    format!("https://www.rcsb.org/fasta/entry/{}", code.to_ascii_uppercase())
}

/// Model-server URL of one ligand instance, addressed by author chain and number.
pub fn ligand_url(code: &str, id: &ResidueId) -> String {
    let mut url = format!(
        "https://models.rcsb.org/v1/{}/ligand?auth_asym_id={}&auth_seq_id={}",
        code.to_ascii_lowercase(),
        id.chain_id,
        id.res_seq
    );
    if let Some(i_code) = id.i_code {
        url.push_str(&format!("&pdbx_PDB_ins_code={}", i_code));
    }
    url.push_str("&encoding=sdf");
    url
}

/// Validates a four-character PDB code.
pub fn validate_code(code: &str) -> Result<(), Error> {
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(Error::config(
            None,
            format!("'{}' is not a four-character PDB code", code),
        ))
    }
}

#[cfg(feature = "fetch")]
pub use rcsb::RcsbDownloader;

#[cfg(feature = "fetch")]
mod rcsb {
    use super::*;
    use crate::io::{self, IoContext};
    use std::io::Read;

    const USER_AGENT: &str = concat!("holo-forge/", env!("CARGO_PKG_VERSION"));

    /// [`Downloader`] for the RCSB PDB.
    ///
    /// Ligand instances are discovered from the hetero groups of the downloaded structure
    /// that classify as ligand or cofactor under `context`.
    #[derive(Debug, Clone, Default)]
    pub struct RcsbDownloader {
        context: IoContext,
    }

    impl RcsbDownloader {
        pub fn new(context: IoContext) -> Self {
            Self { context }
        }

        fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, Error> {
            log::info!("Downloading {}", url);
            let response = ureq::get(url)
                .header("User-Agent", USER_AGENT)
                .call()
                .map_err(|e| Error::tool_invocation("download", format!("{}: {}", url, e)))?;

            let status = response.status().as_u16();
            if status >= 400 {
                return Err(Error::tool_invocation(
                    "download",
                    format!("HTTP error {}: {}", status, url),
                ));
            }

            let mut content = Vec::new();
            response
                .into_body()
                .into_reader()
                .read_to_end(&mut content)
                .map_err(|e| Error::filesystem(e, dest))?;
            std::fs::write(dest, content).map_err(|e| Error::filesystem(e, dest))?;
            Ok(dest.to_path_buf())
        }
    }

    impl Downloader for RcsbDownloader {
        fn fetch_structure(&self, code: &str, dest_dir: &Path) -> Result<PathBuf, Error> {
            validate_code(code)?;
            let dest = dest_dir.join(format!("{}_source.pdb", code));
            if dest.is_file() {
                return Ok(dest);
            }
            self.download(&structure_url(code), &dest)
        }

        fn fetch_sequence(&self, code: &str, dest_dir: &Path) -> Result<PathBuf, Error> {
            validate_code(code)?;
            let dest = dest_dir.join(format!("{}.fasta", code));
            if dest.is_file() {
                return Ok(dest);
            }
            self.download(&sequence_url(code), &dest)
        }

        fn fetch_ligands(&self, code: &str, dest_dir: &Path) -> Result<Vec<PathBuf>, Error> {
            let structure_path = self.fetch_structure(code, dest_dir)?;
            let structure = io::read_pdb_file(&structure_path, &self.context)?;

            structure
                .iter_residues()
                .filter(|(_, r)| r.category.is_small_molecule())
                .map(|(chain_id, residue)| {
                    let id = residue.identity(chain_id);
                    let dest = dest_dir.join(format!(
                        "{}.sdf",
                        molecule_name(code, &residue.name, &id)
                    ));
                    if dest.is_file() {
                        Ok(dest)
                    } else {
                        self.download(&ligand_url(code, &id), &dest)
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_rcsb_layout() {
        assert_eq!(
            structure_url("1abc"),
            "https://files.rcsb.org/download/1ABC.pdb"
        );
        assert_eq!(sequence_url("1abc"), "https://www.rcsb.org/fasta/entry/1ABC");
        assert_eq!(
            ligand_url("1ABC", &ResidueId::new('B', 400, Some('G'))),
            "https://models.rcsb.org/v1/1abc/ligand?auth_asym_id=B&auth_seq_id=400&pdbx_PDB_ins_code=G&encoding=sdf"
        );
    }

    #[test]
    fn codes_must_be_four_alphanumerics() {
        assert!(validate_code("1ABC").is_ok());
        assert!(validate_code("1AB").is_err());
        assert!(validate_code("1AB!").is_err());
    }
}
