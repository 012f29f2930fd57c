//! FASTA reference sequences keyed by chain.
//!
//! Two header styles are understood. RCSB downloads look like
//! `>1ABC_1|Chains A, B[auth C]|PROTEIN NAME|Organism` and describe every chain of one
//! entity; such a record is expanded into one sequence per chain with the header rewritten
//! to `1ABC_<chain>` / `Chain <chain>`. Any other header must name its chain either as a
//! single character (`>A`) or as a `_`-separated suffix (`>1ABC_A`).

use crate::io::error::{Error, Format};
use crate::model::sequence::{ChainSequence, SequenceSet};
use bio::io::fasta;
use std::io::{Read, Write};

const FORMAT: Format = Format::Fasta;

pub fn read<R: Read>(reader: R) -> Result<SequenceSet, Error> {
    let mut set = SequenceSet::new();

    for (index, record) in fasta::Reader::new(reader).records().enumerate() {
        let record = record.map_err(|e| Error::from_io(e, None))?;
        let record_num = index + 1;

        for (chain_id, sequence) in expand_record(&record, record_num)? {
            if set.get(chain_id).is_some() {
                return Err(Error::inconsistent_data(
                    FORMAT,
                    None,
                    format!("chain '{}' is described by more than one record", chain_id),
                ));
            }
            set.insert(chain_id, sequence);
        }
    }

    Ok(set)
}

pub fn write<W: Write>(writer: W, sequences: &SequenceSet) -> Result<(), Error> {
    let mut writer = fasta::Writer::new(writer);
    for (_, sequence) in sequences.iter() {
        writer
            .write(
                &sequence.id,
                sequence.description.as_deref(),
                &sequence.residues,
            )
            .map_err(|e| Error::from_io(e, None))?;
    }
    writer.flush().map_err(|e| Error::from_io(e, None))
}

fn expand_record(
    record: &fasta::Record,
    record_num: usize,
) -> Result<Vec<(char, ChainSequence)>, Error> {
    let header = match record.desc() {
        Some(desc) => format!("{} {}", record.id(), desc),
        None => record.id().to_string(),
    };
    let residues = record.seq();

    if record.id().contains('|') {
        return expand_rcsb_header(&header, residues, record_num);
    }

    let chain_id = plain_chain_id(record.id()).ok_or_else(|| {
        Error::parse(
            FORMAT,
            None,
            record_num,
            format!("cannot determine the chain of record '{}'", record.id()),
        )
    })?;
    Ok(vec![(
        chain_id,
        ChainSequence::new(record.id(), record.desc(), residues),
    )])
}

fn expand_rcsb_header(
    header: &str,
    residues: &[u8],
    record_num: usize,
) -> Result<Vec<(char, ChainSequence)>, Error> {
    let segments: Vec<&str> = header.split('|').map(str::trim).collect();
    let code = segments[0].split('_').next().unwrap_or(segments[0]);

    let chain_index = segments
        .iter()
        .position(|s| s.starts_with("Chain"))
        .ok_or_else(|| Error::parse(FORMAT, None, record_num, "header lists no chains"))?;
    let chain_list = segments[chain_index]
        .split_once(' ')
        .map(|(_, list)| list)
        .unwrap_or_default();

    let mut expanded = Vec::new();
    for entry in chain_list.split(',') {
        let chain_id = rcsb_chain_label(entry).ok_or_else(|| {
            Error::parse(
                FORMAT,
                None,
                record_num,
                format!("invalid chain label '{}'", entry.trim()),
            )
        })?;

        let description: Vec<String> = segments
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, s)| {
                if i == chain_index {
                    format!("Chain {}", chain_id)
                } else {
                    s.to_string()
                }
            })
            .collect();
        let id = format!("{}_{}", code, chain_id);
        expanded.push((
            chain_id,
            ChainSequence::new(&id, Some(&description.join("|")), residues),
        ));
    }

    Ok(expanded)
}

/// Chain label of an RCSB entry, preferring the author label of `A[auth C]`.
fn rcsb_chain_label(entry: &str) -> Option<char> {
    let entry = entry.trim();
    let label = match entry.split_once("[auth") {
        Some((_, auth)) => auth.trim_end_matches(']').trim(),
        None => entry,
    };
    single_char(label)
}

fn plain_chain_id(id: &str) -> Option<char> {
    match id.rsplit_once('_') {
        Some((_, suffix)) => single_char(suffix),
        None => single_char(id),
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<SequenceSet, Error> {
        read(Cursor::new(text.as_bytes()))
    }

    #[test]
    fn rcsb_entity_record_expands_to_each_chain() {
        let set = parse(">1ABC_1|Chains A, B|LYSOZYME C|Gallus gallus (9031)\nKVFGR\nCELAA\n")
            .unwrap();

        assert_eq!(set.chain_ids().into_iter().collect::<Vec<_>>(), vec!['A', 'B']);
        let b = set.get('B').unwrap();
        assert_eq!(b.id, "1ABC_B");
        assert_eq!(
            b.description.as_deref(),
            Some("Chain B|LYSOZYME C|Gallus gallus (9031)")
        );
        assert_eq!(b.as_str(), "KVFGRCELAA");
    }

    #[test]
    fn rcsb_author_chain_labels_take_precedence() {
        let set = parse(">2XYZ_1|Chains A[auth C]|KINASE|Homo sapiens (9606)\nMSE\n").unwrap();
        assert!(set.get('A').is_none());
        assert_eq!(set.get('C').unwrap().id, "2XYZ_C");
    }

    #[test]
    fn plain_headers_name_their_chain() {
        let set = parse(">A\nMKV\n>1ABC_B some protein\nGGS\n").unwrap();
        assert_eq!(set.get('A').unwrap().as_str(), "MKV");
        assert_eq!(set.get('B').unwrap().description.as_deref(), Some("some protein"));
    }

    #[test]
    fn headers_without_chain_are_rejected() {
        let result = parse(">protein\nMKV\n");
        assert!(matches!(result, Err(Error::Parse { line_number: 1, .. })));
    }

    #[test]
    fn duplicate_chains_are_inconsistent() {
        let result = parse(">A\nMKV\n>X_A\nGGS\n");
        assert!(matches!(result, Err(Error::InconsistentData { .. })));
    }

    #[test]
    fn written_sequences_read_back_per_chain() {
        let set = parse(">1ABC_1|Chains A, B|LYSOZYME C|Gallus gallus (9031)\nKVFGR\n").unwrap();
        let mut buffer = Vec::new();
        write(&mut buffer, &set).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with(">1ABC_A Chain A|LYSOZYME C|Gallus gallus (9031)\n"));
        assert_eq!(read(Cursor::new(buffer)).unwrap(), set);
    }
}
