use crate::db::ResidueTable;
use crate::model::types::ResidueCategory;

/// Shared parsing context carrying the residue classification table.
#[derive(Debug, Clone)]
pub struct IoContext {
    table: ResidueTable,
}

impl IoContext {
    pub fn new_default() -> Self {
        Self {
            table: ResidueTable::builtin().clone(),
        }
    }

    pub fn with_table(table: ResidueTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ResidueTable {
        &self.table
    }

    /// Classifies a residue name; `modified` marks residues declared by a `MODRES` record.
    pub fn classify_residue(&self, name: &str, modified: bool) -> ResidueCategory {
        if modified {
            ResidueCategory::AminoAcidModified
        } else {
            self.table.category(name)
        }
    }
}

impl Default for IoContext {
    fn default() -> Self {
        Self::new_default()
    }
}
