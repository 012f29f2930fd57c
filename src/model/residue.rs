use super::atom::Atom;
use super::identity::ResidueId;
use super::types::ResidueCategory;
use std::fmt;

/// Residue present in a structure, addressed by sequence number and insertion code
/// within its owning chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub id: i32,
    pub insertion_code: Option<char>,
    pub name: String,
    pub category: ResidueCategory,
    /// Whether the residue was read from `HETATM` records.
    pub hetero: bool,
    atoms: Vec<Atom>,
}

impl Residue {
    pub fn new(
        id: i32,
        insertion_code: Option<char>,
        name: &str,
        category: ResidueCategory,
    ) -> Self {
        Self {
            id,
            insertion_code,
            name: name.to_string(),
            category,
            hetero: !category.is_protein(),
            atoms: Vec::new(),
        }
    }

    /// Full identity of this residue inside the chain `chain_id`.
    pub fn identity(&self, chain_id: char) -> ResidueId {
        ResidueId::new(chain_id, self.id, self.insertion_code)
    }

    pub fn add_atom(&mut self, atom: Atom) {
        debug_assert!(
            self.atom(&atom.name).is_none(),
            "Attempted to add a duplicate atom name '{}' to residue '{}'",
            atom.name,
            self.name
        );
        self.atoms.push(atom);
    }

    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name == name)
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.atom(name).is_some()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn iter_atoms(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Residue {{ id: {}{}, name: \"{}\", category: {}, atoms: {} }}",
            self.id,
            self.insertion_code.map(String::from).unwrap_or_default(),
            self.name,
            self.category,
            self.atom_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Point;

    #[test]
    fn residue_new_marks_non_protein_as_hetero() {
        let ala = Residue::new(1, None, "ALA", ResidueCategory::AminoAcid);
        let hoh = Residue::new(2, None, "HOH", ResidueCategory::Water);
        assert!(!ala.hetero);
        assert!(hoh.hetero);
    }

    #[test]
    fn identity_combines_chain_with_numbering() {
        let residue = Residue::new(52, Some('B'), "GLY", ResidueCategory::AminoAcid);
        assert_eq!(residue.identity('C'), ResidueId::new('C', 52, Some('B')));
    }

    #[test]
    fn atoms_are_looked_up_by_name() {
        let mut residue = Residue::new(1, None, "GLY", ResidueCategory::AminoAcid);
        residue.add_atom(Atom::new("N", "N", Point::origin()));
        residue.add_atom(Atom::new("CA", "C", Point::new(1.4, 0.0, 0.0)));

        assert!(residue.has_atom("CA"));
        assert!(!residue.has_atom("C"));
        assert_eq!(residue.atom_count(), 2);
    }

    #[test]
    fn display_includes_insertion_code() {
        let residue = Residue::new(10, Some('A'), "SER", ResidueCategory::AminoAcid);
        assert_eq!(
            residue.to_string(),
            "Residue { id: 10A, name: \"SER\", category: amino_acid, atoms: 0 }"
        );
    }
}
