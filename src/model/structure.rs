//! Structure inventory: residues grouped into chains plus the annotation lists derived from
//! the structure file (gaps, incomplete residues, modified residues, bridges, sites).
//!
//! The `Structure` is the single mutable handle every pipeline stage works through.
//! Selection helpers return residue identities, and purge/renumber operations keep the
//! annotation lists consistent with the residues that remain.

use super::chain::Chain;
use super::identity::ResidueId;
use super::records::{
    DisulfideBond, MissingAtoms, MissingResidue, ModifiedResidue, ResidueSlot, SiteResidue,
};
use super::residue::Residue;
use super::types::ResidueCategory;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// How [`Structure::purge`] interprets its residue set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeMode {
    /// Keep only the listed residues.
    Keep,
    /// Remove the listed residues.
    Discard,
}

/// Multi-chain structure with its annotation inventory.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    chains: Vec<Chain>,
    /// Raw `CRYST1` record, preserved verbatim for external engines.
    pub crystal: Option<String>,
    pub missing_residues: Vec<MissingResidue>,
    pub missing_atoms: Vec<MissingAtoms>,
    pub modified_residues: Vec<ModifiedResidue>,
    pub disulfide_bonds: Vec<DisulfideBond>,
    pub site_residues: Vec<SiteResidue>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chain(&mut self, chain: Chain) {
        debug_assert!(
            self.chain(chain.id).is_none(),
            "Attempted to add a duplicate chain ID '{}'",
            chain.id
        );
        self.chains.push(chain);
    }

    pub fn chain(&self, id: char) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn chain_mut(&mut self, id: char) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.id == id)
    }

    /// Returns the chain with `id`, appending an empty one when absent.
    pub fn chain_or_insert(&mut self, id: char) -> &mut Chain {
        let index = match self.chains.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => {
                self.chains.push(Chain::new(id));
                self.chains.len() - 1
            }
        };
        &mut self.chains[index]
    }

    pub fn find_residue(&self, id: &ResidueId) -> Option<&Residue> {
        self.chain(id.chain_id)
            .and_then(|c| c.residue(id.res_seq, id.i_code))
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(|c| c.residue_count()).sum()
    }

    pub fn atom_count(&self) -> usize {
        self.chains.iter().map(|c| c.iter_atoms().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter_chains(&self) -> std::slice::Iter<'_, Chain> {
        self.chains.iter()
    }

    /// Iterates over every residue together with its chain identifier.
    pub fn iter_residues(&self) -> impl Iterator<Item = (char, &Residue)> {
        self.chains
            .iter()
            .flat_map(|chain| chain.iter_residues().map(move |r| (chain.id, r)))
    }

    /// Returns the identities of all residues satisfying `predicate`, in file order.
    pub fn select<F>(&self, mut predicate: F) -> Vec<ResidueId>
    where
        F: FnMut(char, &Residue) -> bool,
    {
        self.iter_residues()
            .filter(|(chain_id, residue)| predicate(*chain_id, residue))
            .map(|(chain_id, residue)| residue.identity(chain_id))
            .collect()
    }

    /// Identities of residues belonging to `category`.
    pub fn select_category(&self, category: ResidueCategory) -> Vec<ResidueId> {
        self.select(|_, r| r.category == category)
    }

    /// Chains that carry polymer residues, either present or recorded as missing.
    pub fn polymer_chain_ids(&self) -> BTreeSet<char> {
        self.iter_residues()
            .filter(|(_, r)| r.category.is_protein())
            .map(|(chain_id, _)| chain_id)
            .chain(self.missing_residues.iter().map(|m| m.id.chain_id))
            .collect()
    }

    /// Merged list of present polymer residues and missing residues in identity order.
    pub fn polymer_slots(&self) -> Vec<ResidueSlot> {
        let mut slots: Vec<ResidueSlot> = self
            .iter_residues()
            .filter(|(_, r)| r.category.is_protein())
            .map(|(chain_id, r)| ResidueSlot {
                id: r.identity(chain_id),
                name: r.name.clone(),
                missing: false,
            })
            .chain(self.missing_residues.iter().map(|m| ResidueSlot {
                id: m.id,
                name: m.name.clone(),
                missing: true,
            }))
            .collect();
        slots.sort_by(|a, b| a.id.cmp(&b.id));
        slots
    }

    pub fn sort_missing_residues(&mut self) {
        self.missing_residues.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Keeps or discards the residues named in `ids`.
    ///
    /// Missing-residue records take part in the selection exactly like present residues.
    /// Annotation records that refer to residues no longer present are dropped, while
    /// site records are preserved because they describe the original deposition.
    pub fn purge(&mut self, ids: &HashSet<ResidueId>, mode: PurgeMode) {
        let wanted = |id: &ResidueId| match mode {
            PurgeMode::Keep => ids.contains(id),
            PurgeMode::Discard => !ids.contains(id),
        };

        for chain in &mut self.chains {
            let chain_id = chain.id;
            chain.retain_residues(|r| wanted(&r.identity(chain_id)));
        }
        self.chains.retain(|c| !c.is_empty());
        self.missing_residues.retain(|m| wanted(&m.id));

        let present: HashSet<ResidueId> = self
            .iter_residues()
            .map(|(chain_id, r)| r.identity(chain_id))
            .collect();
        self.missing_atoms.retain(|m| present.contains(&m.id));
        self.modified_residues.retain(|m| present.contains(&m.id));
        self.disulfide_bonds
            .retain(|b| present.contains(&b.first) && present.contains(&b.second));
    }

    /// Renumbers every chain contiguously from 1 and clears insertion codes.
    ///
    /// Missing residues take part in the numbering so the result stays aligned with the
    /// reference sequence; all annotation records are remapped to the new identities.
    pub fn renumber_residues(&mut self) {
        let mut mapping: HashMap<ResidueId, ResidueId> = HashMap::new();
        let mut per_chain: BTreeMap<char, BTreeSet<ResidueId>> = BTreeMap::new();

        for (chain_id, residue) in self.iter_residues() {
            per_chain
                .entry(chain_id)
                .or_default()
                .insert(residue.identity(chain_id));
        }
        for missing in &self.missing_residues {
            per_chain
                .entry(missing.id.chain_id)
                .or_default()
                .insert(missing.id);
        }

        for (chain_id, ids) in per_chain {
            for (index, id) in ids.into_iter().enumerate() {
                mapping.insert(id, ResidueId::new(chain_id, index as i32 + 1, None));
            }
        }

        let remap = |id: &mut ResidueId| {
            if let Some(new_id) = mapping.get(id) {
                *id = *new_id;
            }
        };

        for chain in &mut self.chains {
            let chain_id = chain.id;
            for residue in chain.iter_residues_mut() {
                let mut id = residue.identity(chain_id);
                remap(&mut id);
                residue.id = id.res_seq;
                residue.insertion_code = None;
            }
            chain.sort_residues();
        }
        self.missing_residues.iter_mut().for_each(|m| remap(&mut m.id));
        self.missing_atoms.iter_mut().for_each(|m| remap(&mut m.id));
        self.modified_residues.iter_mut().for_each(|m| remap(&mut m.id));
        self.site_residues.iter_mut().for_each(|s| remap(&mut s.id));
        for bond in &mut self.disulfide_bonds {
            remap(&mut bond.first);
            remap(&mut bond.second);
        }
    }

    /// Extracts each non-protein residue as a standalone single-residue structure.
    ///
    /// Groups are returned in discovery order (chain order, then residue order). The
    /// residues themselves are left in place.
    pub fn hetero_groups(&self) -> Vec<(ResidueCategory, Structure)> {
        self.iter_residues()
            .filter(|(_, r)| !r.category.is_protein())
            .map(|(chain_id, residue)| {
                let mut chain = Chain::new(chain_id);
                chain.add_residue(residue.clone());
                let group: Structure = std::iter::once(chain).collect();
                (residue.category, group)
            })
            .collect()
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Structure {{ chains: {}, residues: {}, atoms: {}, missing residues: {}, incomplete residues: {} }}",
            self.chain_count(),
            self.residue_count(),
            self.atom_count(),
            self.missing_residues.len(),
            self.missing_atoms.len()
        )
    }
}

impl FromIterator<Chain> for Structure {
    fn from_iter<T: IntoIterator<Item = Chain>>(iter: T) -> Self {
        Self {
            chains: iter.into_iter().collect(),
            ..Default::default()
        }
    }
}
