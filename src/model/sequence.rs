//! Reference sequences keyed by chain.

use std::collections::{BTreeMap, BTreeSet};

/// One-letter reference sequence of a single chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSequence {
    pub id: String,
    pub description: Option<String>,
    pub residues: Vec<u8>,
}

impl ChainSequence {
    pub fn new(id: &str, description: Option<&str>, residues: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            description: description.map(str::to_string),
            residues: residues.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.residues).unwrap_or_default()
    }
}

/// Per-chain reference sequences, iterated in chain order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceSet {
    chains: BTreeMap<char, ChainSequence>,
}

impl SequenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chain_id: char, sequence: ChainSequence) {
        self.chains.insert(chain_id, sequence);
    }

    pub fn get(&self, chain_id: char) -> Option<&ChainSequence> {
        self.chains.get(&chain_id)
    }

    pub fn get_mut(&mut self, chain_id: char) -> Option<&mut ChainSequence> {
        self.chains.get_mut(&chain_id)
    }

    pub fn chain_ids(&self) -> BTreeSet<char> {
        self.chains.keys().copied().collect()
    }

    /// Chains of `required` that have no reference sequence.
    pub fn uncovered(&self, required: &BTreeSet<char>) -> Vec<char> {
        required
            .iter()
            .filter(|c| !self.chains.contains_key(c))
            .copied()
            .collect()
    }

    pub fn retain_chains<F>(&mut self, mut f: F)
    where
        F: FnMut(char) -> bool,
    {
        self.chains.retain(|c, _| f(*c));
    }

    pub fn total_len(&self) -> usize {
        self.chains.values().map(ChainSequence::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &ChainSequence)> {
        self.chains.iter().map(|(c, s)| (*c, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncovered_lists_chains_without_sequences() {
        let mut set = SequenceSet::new();
        set.insert('A', ChainSequence::new("1ABC_A", None, b"MKV"));

        let required: BTreeSet<char> = ['A', 'B'].into_iter().collect();
        assert_eq!(set.uncovered(&required), vec!['B']);
        assert_eq!(set.total_len(), 3);
    }

    #[test]
    fn retain_chains_filters_by_identifier() {
        let mut set = SequenceSet::new();
        set.insert('A', ChainSequence::new("x_A", None, b"AA"));
        set.insert('B', ChainSequence::new("x_B", None, b"BB"));
        set.retain_chains(|c| c == 'B');

        assert_eq!(set.chain_ids().into_iter().collect::<Vec<_>>(), vec!['B']);
        assert_eq!(set.get('B').unwrap().as_str(), "BB");
    }
}
