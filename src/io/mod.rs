mod context;
mod error;
mod fasta;
mod pdb;

use crate::model::{sequence::SequenceSet, structure::Structure};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub use pdb::reader::read as read_pdb_structure;
pub use pdb::writer::write_structure as write_pdb_structure;

pub use fasta::{read as read_fasta_sequences, write as write_fasta_sequences};

pub use context::IoContext;

pub use error::{Error, Format};

pub fn read_pdb_file(path: &Path, context: &IoContext) -> Result<Structure, Error> {
    let file = File::open(path).map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;
    read_pdb_structure(BufReader::new(file), context).map_err(|e| e.with_path(path))
}

pub fn write_pdb_file(path: &Path, structure: &Structure) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;
    write_pdb_structure(BufWriter::new(file), structure).map_err(|e| e.with_path(path))
}

pub fn read_fasta_file(path: &Path) -> Result<SequenceSet, Error> {
    let file = File::open(path).map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;
    read_fasta_sequences(BufReader::new(file)).map_err(|e| e.with_path(path))
}

pub fn write_fasta_file(path: &Path, sequences: &SequenceSet) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;
    write_fasta_sequences(BufWriter::new(file), sequences).map_err(|e| e.with_path(path))
}
