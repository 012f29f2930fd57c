use super::residue::Residue;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: char,
    residues: Vec<Residue>,
}

impl Chain {
    pub fn new(id: char) -> Self {
        Self {
            id,
            residues: Vec::new(),
        }
    }

    pub fn add_residue(&mut self, residue: Residue) {
        debug_assert!(
            self.residue(residue.id, residue.insertion_code).is_none(),
            "Attempted to add a duplicate residue ID '{}' to chain '{}'",
            residue.id,
            self.id
        );
        self.residues.push(residue);
    }

    pub fn residue(&self, id: i32, insertion_code: Option<char>) -> Option<&Residue> {
        self.residues
            .iter()
            .find(|r| r.id == id && r.insertion_code == insertion_code)
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn iter_residues(&self) -> std::slice::Iter<'_, Residue> {
        self.residues.iter()
    }

    pub fn iter_residues_mut(&mut self) -> std::slice::IterMut<'_, Residue> {
        self.residues.iter_mut()
    }

    pub fn retain_residues<F>(&mut self, mut f: F)
    where
        F: FnMut(&Residue) -> bool,
    {
        self.residues.retain(|r| f(r));
    }

    /// Orders residues by sequence number, blank insertion codes first.
    pub fn sort_residues(&mut self) {
        self.residues.sort_by_key(|r| (r.id, r.insertion_code));
    }

    pub fn iter_atoms(&self) -> impl Iterator<Item = &super::atom::Atom> {
        self.residues.iter().flat_map(|r| r.iter_atoms())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain {{ id: '{}', residues: {} }}",
            self.id,
            self.residue_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ResidueCategory;

    fn residue(id: i32, code: Option<char>) -> Residue {
        Residue::new(id, code, "ALA", ResidueCategory::AminoAcid)
    }

    #[test]
    fn residue_lookup_distinguishes_insertion_codes() {
        let mut chain = Chain::new('A');
        chain.add_residue(residue(10, None));
        chain.add_residue(residue(10, Some('A')));

        assert!(chain.residue(10, None).is_some());
        assert!(chain.residue(10, Some('A')).is_some());
        assert!(chain.residue(10, Some('B')).is_none());
    }

    #[test]
    fn sort_residues_orders_by_number_then_insertion_code() {
        let mut chain = Chain::new('A');
        chain.add_residue(residue(11, None));
        chain.add_residue(residue(10, Some('A')));
        chain.add_residue(residue(10, None));
        chain.sort_residues();

        let order: Vec<_> = chain
            .iter_residues()
            .map(|r| (r.id, r.insertion_code))
            .collect();
        assert_eq!(order, vec![(10, None), (10, Some('A')), (11, None)]);
    }

    #[test]
    fn retain_residues_drops_unmatched_entries() {
        let mut chain = Chain::new('B');
        chain.add_residue(residue(1, None));
        chain.add_residue(residue(2, None));
        chain.retain_residues(|r| r.id == 2);

        assert_eq!(chain.residue_count(), 1);
        assert_eq!(chain.to_string(), "Chain { id: 'B', residues: 1 }");
    }
}
