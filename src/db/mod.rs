//! Residue-name classification tables.
//!
//! A [`ResidueTable`] maps residue names to a [`ResidueCategory`]. The built-in table is
//! embedded as TOML and parsed once; callers can build their own from a TOML document with
//! the same layout to reclassify site-specific hetero groups.

mod schema;
mod store;

use crate::model::types::ResidueCategory;
use schema::ResidueTableFile;
use std::collections::HashMap;

/// Name-to-category lookup used when reading structures and classifying molecules.
#[derive(Debug, Clone, Default)]
pub struct ResidueTable {
    name: String,
    categories: HashMap<String, ResidueCategory>,
}

impl ResidueTable {
    /// Returns the built-in table shipped with the crate.
    pub fn builtin() -> &'static ResidueTable {
        store::get_store()
    }

    /// Parses a table from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the TOML deserialization error when the document does not follow the
    /// `[info]` / `[categories]` layout.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let schema: ResidueTableFile = toml::from_str(content)?;
        Ok(Self::from_schema(schema))
    }

    fn from_schema(schema: ResidueTableFile) -> Self {
        let lists = schema.categories;
        let mut categories = HashMap::new();

        let groups = [
            (ResidueCategory::AminoAcid, lists.amino_acid),
            (ResidueCategory::AminoAcidModified, lists.amino_acid_modified),
            (ResidueCategory::Water, lists.water),
            (ResidueCategory::Ligand, lists.ligand),
            (ResidueCategory::Cofactor, lists.cofactor),
            (ResidueCategory::SimpleAnion, lists.simple_anion),
            (ResidueCategory::ComplexAnion, lists.complex_anion),
            (ResidueCategory::SimpleCation, lists.simple_cation),
            (ResidueCategory::ComplexCation, lists.complex_cation),
        ];
        for (category, names) in groups {
            for name in names {
                categories.insert(normalize(&name), category);
            }
        }

        Self {
            name: schema.info.name,
            categories,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category of a residue name; names unknown to the table are ligands.
    pub fn category(&self, residue_name: &str) -> ResidueCategory {
        self.categories
            .get(&normalize(residue_name))
            .copied()
            .unwrap_or(ResidueCategory::Ligand)
    }

    /// Returns `true` when the name is listed explicitly.
    pub fn contains(&self, residue_name: &str) -> bool {
        self.categories.contains_key(&normalize(residue_name))
    }

    /// Adds or overrides individual entries.
    pub fn insert(&mut self, residue_name: &str, category: ResidueCategory) {
        self.categories.insert(normalize(residue_name), category);
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}
