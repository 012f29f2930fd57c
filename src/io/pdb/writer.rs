use crate::io::error::Error;
use crate::model::{
    atom::Atom,
    identity::ResidueId,
    records::{MissingAtoms, MissingResidue, ModifiedResidue, SiteResidue},
    residue::Residue,
    structure::Structure,
};
use std::io::Write;

/// Writes `structure` as PDB, annotations first, then coordinates.
///
/// Annotation records use the same columns the reader expects, so a written file reads
/// back into an equivalent structure.
pub fn write_structure<W: Write>(writer: W, structure: &Structure) -> Result<(), Error> {
    let mut ctx = WriterContext::new(writer);

    ctx.write_missing_residues(&structure.missing_residues)?;
    ctx.write_missing_atoms(&structure.missing_atoms)?;
    ctx.write_modified_residues(&structure.modified_residues)?;
    ctx.write_disulfide_bonds(structure)?;
    ctx.write_sites(&structure.site_residues)?;

    if let Some(crystal) = &structure.crystal {
        ctx.line(crystal)?;
    }

    ctx.write_atoms(structure)?;

    ctx.line("END   ")?;

    ctx.writer.flush().map_err(|e| Error::from_io(e, None))
}

struct WriterContext<W> {
    writer: W,
    current_serial: usize,
}

impl<W: Write> WriterContext<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            current_serial: 1,
        }
    }

    fn line(&mut self, text: &str) -> Result<(), Error> {
        writeln!(self.writer, "{}", text).map_err(|e| Error::from_io(e, None))
    }

    fn write_missing_residues(&mut self, missing: &[MissingResidue]) -> Result<(), Error> {
        if missing.is_empty() {
            return Ok(());
        }
        self.line("REMARK 465   M RES C SSSEQI")?;
        for m in missing {
            let text = format!(
                "REMARK 465     {:>3} {} {:>5}{}",
                truncate(&m.name, 3),
                m.id.chain_id,
                m.id.res_seq,
                m.id.i_code_char()
            );
            self.line(text.trim_end())?;
        }
        Ok(())
    }

    fn write_missing_atoms(&mut self, missing: &[MissingAtoms]) -> Result<(), Error> {
        if missing.is_empty() {
            return Ok(());
        }
        self.line("REMARK 470   M RES CSSEQI  ATOMS")?;
        for m in missing {
            let atoms: Vec<String> = m.atoms.iter().map(|a| format!("{:<4}", a)).collect();
            let text = format!(
                "REMARK 470     {:>3} {}{:>4}{}  {}",
                truncate(&m.residue_name, 3),
                m.id.chain_id,
                m.id.res_seq,
                m.id.i_code_char(),
                atoms.join(" ")
            );
            self.line(text.trim_end())?;
        }
        Ok(())
    }

    fn write_modified_residues(&mut self, modified: &[ModifiedResidue]) -> Result<(), Error> {
        for m in modified {
            let text = format!(
                "MODRES      {:>3} {} {:>4}{} {:>3}  {}",
                truncate(&m.name, 3),
                m.id.chain_id,
                m.id.res_seq,
                m.id.i_code_char(),
                truncate(&m.standard_name, 3),
                m.comment
            );
            self.line(text.trim_end())?;
        }
        Ok(())
    }

    fn write_disulfide_bonds(&mut self, structure: &Structure) -> Result<(), Error> {
        for (index, bond) in structure.disulfide_bonds.iter().enumerate() {
            let name = |id: &ResidueId| {
                structure
                    .find_residue(id)
                    .map(|r| truncate(&r.name, 3).to_string())
                    .unwrap_or_else(|| "CYS".to_string())
            };
            let text = format!(
                "SSBOND{:>4} {:>3} {} {:>4}{}   {:>3} {} {:>4}{}",
                index + 1,
                name(&bond.first),
                bond.first.chain_id,
                bond.first.res_seq,
                bond.first.i_code_char(),
                name(&bond.second),
                bond.second.chain_id,
                bond.second.res_seq,
                bond.second.i_code_char()
            );
            self.line(text.trim_end())?;
        }
        Ok(())
    }

    fn write_sites(&mut self, sites: &[SiteResidue]) -> Result<(), Error> {
        let mut groups: Vec<(&str, Vec<&SiteResidue>)> = Vec::new();
        for site in sites {
            match groups.iter_mut().find(|(name, _)| *name == site.site) {
                Some((_, members)) => members.push(site),
                None => groups.push((&site.site, vec![site])),
            }
        }

        for (name, members) in groups {
            for (index, chunk) in members.chunks(4).enumerate() {
                let mut text = format!(
                    "SITE  {:>4} {:>3} {:>2} ",
                    index + 1,
                    truncate(name, 3),
                    members.len()
                );
                for member in chunk {
                    text.push_str(&format!(
                        "{:>3} {}{:>4}{} ",
                        truncate(&member.name, 3),
                        member.id.chain_id,
                        member.id.res_seq,
                        member.id.i_code_char()
                    ));
                }
                self.line(text.trim_end())?;
            }
        }
        Ok(())
    }

    fn write_atoms(&mut self, structure: &Structure) -> Result<(), Error> {
        for chain in structure.iter_chains() {
            for residue in chain.iter_residues() {
                let record_type = if residue.hetero { "HETATM" } else { "ATOM  " };
                for atom in residue.iter_atoms() {
                    let serial = self.current_serial;
                    self.write_atom_record(record_type, serial, atom, residue, chain.id)?;
                    self.current_serial += 1;
                }
            }

            if let Some(last_polymer) = chain
                .iter_residues()
                .rev()
                .find(|res| res.category.is_protein())
            {
                let serial = self.current_serial;
                self.write_ter_record(serial, last_polymer, chain.id)?;
                self.current_serial += 1;
            }
        }
        Ok(())
    }

    fn write_atom_record(
        &mut self,
        record_type: &str,
        serial: usize,
        atom: &Atom,
        residue: &Residue,
        chain_id: char,
    ) -> Result<(), Error> {
        let atom_name = if atom.name.len() >= 4 {
            format!("{:<4}", truncate(&atom.name, 4))
        } else {
            format!(" {:<3}", atom.name)
        };

        writeln!(
            self.writer,
            "{:6}{:5} {:4}{:1}{:>3} {:1}{:4}{:1}   {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}",
            record_type,
            serial % 100000,
            atom_name,
            ' ',
            truncate(&residue.name, 3),
            chain_id,
            residue.id % 10000,
            residue.insertion_code.unwrap_or(' '),
            atom.pos.x,
            atom.pos.y,
            atom.pos.z,
            atom.occupancy,
            atom.b_factor,
            atom.element.to_uppercase()
        )
        .map_err(|e| Error::from_io(e, None))
    }

    fn write_ter_record(
        &mut self,
        serial: usize,
        residue: &Residue,
        chain_id: char,
    ) -> Result<(), Error> {
        writeln!(
            self.writer,
            "TER   {:5}      {:>3} {:1}{:4}{:1}",
            serial % 100000,
            truncate(&residue.name, 3),
            chain_id,
            residue.id % 10000,
            residue.insertion_code.unwrap_or(' ')
        )
        .map_err(|e| Error::from_io(e, None))
    }
}

fn truncate(text: &str, width: usize) -> &str {
    text.get(..width).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::context::IoContext;
    use crate::io::pdb::reader::read;
    use crate::model::chain::Chain;
    use crate::model::records::DisulfideBond;
    use crate::model::types::{Point, ResidueCategory};
    use std::io::Cursor;

    fn id(chain: char, seq: i32) -> ResidueId {
        ResidueId::new(chain, seq, None)
    }

    fn annotated_structure() -> Structure {
        let mut chain = Chain::new('A');
        for (seq, name) in [(2, "CYS"), (3, "ALA"), (7, "CYS")] {
            let mut residue = Residue::new(seq, None, name, ResidueCategory::AminoAcid);
            residue.add_atom(Atom::new("CA", "C", Point::new(seq as f64, 0.0, 0.0)));
            chain.add_residue(residue);
        }
        let mut ligand = Residue::new(401, None, "LIG", ResidueCategory::Ligand);
        ligand.add_atom(Atom::new("C1", "C", Point::new(1.0, 2.0, 3.0)));
        chain.add_residue(ligand);

        let mut structure: Structure = std::iter::once(chain).collect();
        structure.missing_residues = vec![MissingResidue::new(
            ResidueId::new('A', 1, Some('B')),
            "MET",
        )];
        structure.missing_atoms = vec![MissingAtoms::new(
            id('A', 3),
            "ALA",
            vec!["CB".into(), "N".into()],
        )];
        structure.disulfide_bonds = vec![DisulfideBond::new(id('A', 2), id('A', 7))];
        structure.site_residues = (0..5)
            .map(|k| SiteResidue {
                site: "AC1".into(),
                id: id('A', 2 + k),
                name: "ALA".into(),
            })
            .collect();
        structure
    }

    fn write_to_string(structure: &Structure) -> String {
        let mut buffer = Vec::new();
        write_structure(&mut buffer, structure).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn written_annotations_read_back_unchanged() {
        let original = annotated_structure();
        let text = write_to_string(&original);
        let restored = read(Cursor::new(text.as_bytes()), &IoContext::new_default()).unwrap();

        assert_eq!(restored.missing_residues, original.missing_residues);
        assert_eq!(restored.missing_atoms, original.missing_atoms);
        assert_eq!(restored.disulfide_bonds, original.disulfide_bonds);
        assert_eq!(restored.site_residues, original.site_residues);
        assert_eq!(restored.residue_count(), 4);
    }

    #[test]
    fn site_records_wrap_after_four_residues() {
        let text = write_to_string(&annotated_structure());
        let site_lines: Vec<_> = text.lines().filter(|l| l.starts_with("SITE")).collect();

        assert_eq!(site_lines.len(), 2);
        assert!(site_lines[0].starts_with("SITE     1 AC1  5 "));
        assert!(site_lines[1].starts_with("SITE     2 AC1  5 "));
    }

    #[test]
    fn hetero_residues_use_hetatm_and_chains_end_with_ter() {
        let text = write_to_string(&annotated_structure());
        let lines: Vec<_> = text.lines().collect();

        let hetatm = lines.iter().find(|l| l.starts_with("HETATM")).unwrap();
        assert_eq!(&hetatm[17..20], "LIG");
        let ter = lines.iter().find(|l| l.starts_with("TER")).unwrap();
        assert_eq!(&ter[17..20], "CYS");
        assert_eq!(lines.last(), Some(&"END   "));
    }

    #[test]
    fn atom_records_use_fixed_columns() {
        let text = write_to_string(&annotated_structure());
        let atom = text.lines().find(|l| l.starts_with("ATOM")).unwrap();

        assert_eq!(&atom[12..16], " CA ");
        assert_eq!(&atom[21..22], "A");
        assert_eq!(atom[22..26].trim(), "2");
        assert_eq!(atom[30..38].trim(), "2.000");
        assert_eq!(atom[76..78].trim(), "C");
    }
}
