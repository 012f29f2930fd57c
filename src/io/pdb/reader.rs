use crate::io::context::IoContext;
use crate::io::error::{Error, Format};
use crate::model::{
    atom::Atom,
    identity::ResidueId,
    records::{DisulfideBond, MissingAtoms, MissingResidue, ModifiedResidue, SiteResidue},
    residue::Residue,
    structure::Structure,
    types::Point,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ResKey {
    res_seq: i32,
    i_code: Option<char>,
}

struct TempResidue {
    raw_name: String,
    is_hetatm: bool,
    atom_order: Vec<String>,
    atoms: HashMap<String, (f64, Atom)>,
}

/// Reads a PDB stream into a [`Structure`], including its annotation records.
///
/// Besides `ATOM`/`HETATM` records the reader understands `REMARK 465` (missing
/// residues), `REMARK 470` (missing atoms), `MODRES`, `SSBOND`, and `SITE`. Only the first
/// model of multi-model files is read, and alternate locations are resolved by keeping the
/// highest-occupancy copy of each atom.
pub fn read<R: BufRead>(reader: R, context: &IoContext) -> Result<Structure, Error> {
    let mut structure = Structure::new();

    let mut chain_order: Vec<char> = Vec::new();
    let mut chain_map: HashMap<char, BTreeMap<ResKey, TempResidue>> = HashMap::new();

    let mut line_num = 0;

    for line in reader.lines() {
        line_num += 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if line.starts_with("ENDMDL") {
            break;
        }

        if line.starts_with("CRYST1") {
            structure.crystal = Some(line.trim_end().to_string());
            continue;
        }

        if line.starts_with("REMARK 465") {
            if let Some(missing) = parse_remark_465(&line) {
                structure.missing_residues.push(missing);
            }
            continue;
        }

        if line.starts_with("REMARK 470") {
            if let Some(missing) = parse_remark_470(&line) {
                structure.missing_atoms.push(missing);
            }
            continue;
        }

        if line.starts_with("MODRES") {
            structure
                .modified_residues
                .push(parse_modres(&line, line_num)?);
            continue;
        }

        if line.starts_with("SSBOND") {
            structure
                .disulfide_bonds
                .push(parse_ssbond(&line, line_num)?);
            continue;
        }

        if line.starts_with("SITE  ") {
            structure.site_residues.extend(parse_site(&line));
            continue;
        }

        let is_atom = line.starts_with("ATOM  ");
        let is_hetatm = line.starts_with("HETATM");

        if is_atom || is_hetatm {
            parse_atom_record(&line, line_num, is_hetatm, &mut chain_order, &mut chain_map)?;
        }
    }

    let modified: HashSet<ResidueId> = structure
        .modified_residues
        .iter()
        .map(|m| m.id)
        .collect();

    for chain_id in chain_order {
        if let Some(residues) = chain_map.remove(&chain_id) {
            let chain = structure.chain_or_insert(chain_id);

            for (res_key, temp_res) in residues {
                let id = ResidueId::new(chain_id, res_key.res_seq, res_key.i_code);
                let category =
                    context.classify_residue(&temp_res.raw_name, modified.contains(&id));

                let mut residue =
                    Residue::new(res_key.res_seq, res_key.i_code, &temp_res.raw_name, category);
                residue.hetero = temp_res.is_hetatm;

                let TempResidue {
                    atom_order,
                    mut atoms,
                    ..
                } = temp_res;
                for name in atom_order {
                    if let Some((_, atom)) = atoms.remove(&name) {
                        residue.add_atom(atom);
                    }
                }

                chain.add_residue(residue);
            }
        }
    }

    structure.sort_missing_residues();

    Ok(structure)
}

fn parse_atom_record(
    line: &str,
    line_num: usize,
    is_hetatm: bool,
    chain_order: &mut Vec<char>,
    chain_map: &mut HashMap<char, BTreeMap<ResKey, TempResidue>>,
) -> Result<(), Error> {
    if line.len() < 54 {
        return Err(Error::parse(Format::Pdb, None, line_num, "Atom record too short"));
    }

    let atom_name = column(line, 12, 16).to_string();
    let res_name = column(line, 17, 20).to_string();
    let chain_id = char_at(line, 21);
    let i_code = blank_to_none(char_at(line, 26));

    let res_seq = column(line, 22, 26)
        .parse::<i32>()
        .map_err(|_| Error::parse(Format::Pdb, None, line_num, "Invalid residue sequence number"))?;

    let x = parse_coordinate(line, 30, 38, line_num, "Invalid X coordinate")?;
    let y = parse_coordinate(line, 38, 46, line_num, "Invalid Y coordinate")?;
    let z = parse_coordinate(line, 46, 54, line_num, "Invalid Z coordinate")?;

    let occupancy = column(line, 54, 60).parse::<f64>().unwrap_or(1.0);
    let b_factor = column(line, 60, 66).parse::<f64>().unwrap_or(0.0);
    let element = column(line, 76, 78);

    let mut atom = Atom::new(&atom_name, element, Point::new(x, y, z));
    atom.occupancy = occupancy;
    atom.b_factor = b_factor;

    if !chain_map.contains_key(&chain_id) {
        chain_map.insert(chain_id, BTreeMap::new());
        chain_order.push(chain_id);
    }
    let residues = chain_map.entry(chain_id).or_default();

    let temp_res = residues
        .entry(ResKey { res_seq, i_code })
        .or_insert_with(|| TempResidue {
            raw_name: res_name,
            is_hetatm,
            atom_order: Vec::new(),
            atoms: HashMap::new(),
        });

    match temp_res.atoms.get(&atom_name) {
        Some((old_occ, _)) => {
            if occupancy > *old_occ {
                temp_res.atoms.insert(atom_name, (occupancy, atom));
            }
        }
        None => {
            temp_res.atom_order.push(atom_name.clone());
            temp_res.atoms.insert(atom_name, (occupancy, atom));
        }
    }

    Ok(())
}

fn parse_coordinate(
    line: &str,
    start: usize,
    end: usize,
    line_num: usize,
    details: &str,
) -> Result<f64, Error> {
    column(line, start, end)
        .parse::<f64>()
        .map_err(|_| Error::parse(Format::Pdb, None, line_num, details))
}

fn parse_remark_465(line: &str) -> Option<MissingResidue> {
    let name = column(line, 15, 18);
    let seq = column(line, 21, 26).parse::<i32>().ok()?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let id = ResidueId::new(char_at(line, 19), seq, blank_to_none(char_at(line, 26)));
    Some(MissingResidue::new(id, name))
}

fn parse_remark_470(line: &str) -> Option<MissingAtoms> {
    let name = column(line, 15, 18);
    let seq = column(line, 20, 24).parse::<i32>().ok()?;
    if name.is_empty() {
        return None;
    }
    let id = ResidueId::new(char_at(line, 19), seq, blank_to_none(char_at(line, 24)));
    let atoms: Vec<String> = line
        .get(25..)
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if atoms.is_empty() {
        return None;
    }
    Some(MissingAtoms::new(id, name, atoms))
}

fn parse_modres(line: &str, line_num: usize) -> Result<ModifiedResidue, Error> {
    let id = parse_residue_fields(line, 16, 18, 22, 22)
        .ok_or_else(|| Error::parse(Format::Pdb, None, line_num, "Invalid MODRES residue number"))?;
    Ok(ModifiedResidue {
        id,
        name: column(line, 12, 15).to_string(),
        standard_name: column(line, 24, 27).to_string(),
        comment: column(line, 29, 80).to_string(),
    })
}

fn parse_ssbond(line: &str, line_num: usize) -> Result<DisulfideBond, Error> {
    let first = parse_residue_fields(line, 15, 17, 21, 21);
    let second = parse_residue_fields(line, 29, 31, 35, 35);
    match (first, second) {
        (Some(first), Some(second)) => Ok(DisulfideBond::new(first, second)),
        _ => Err(Error::parse(
            Format::Pdb,
            None,
            line_num,
            "Invalid SSBOND residue number",
        )),
    }
}

fn parse_site(line: &str) -> Vec<SiteResidue> {
    let site = column(line, 11, 14).to_string();
    (0..4)
        .filter_map(|k| {
            let base = 18 + 11 * k;
            let name = column(line, base, base + 3);
            if name.is_empty() {
                return None;
            }
            let id = parse_residue_fields(line, base + 4, base + 5, base + 9, base + 9)?;
            Some(SiteResidue {
                site: site.clone(),
                id,
                name: name.to_string(),
            })
        })
        .collect()
}

/// Reads `chain`, `resSeq[seq_start..seq_end]`, and `iCode` columns into an identity.
fn parse_residue_fields(
    line: &str,
    chain_col: usize,
    seq_start: usize,
    seq_end: usize,
    i_code_col: usize,
) -> Option<ResidueId> {
    let seq = column(line, seq_start, seq_end).parse::<i32>().ok()?;
    Some(ResidueId::new(
        char_at(line, chain_col),
        seq,
        blank_to_none(char_at(line, i_code_col)),
    ))
}

fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or_default().trim()
}

fn char_at(line: &str, index: usize) -> char {
    line.get(index..).and_then(|s| s.chars().next()).unwrap_or(' ')
}

fn blank_to_none(c: char) -> Option<char> {
    if c == ' ' { None } else { Some(c) }
}
