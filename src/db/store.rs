use super::ResidueTable;
use super::schema::ResidueTableFile;
use std::sync::OnceLock;

static STORE: OnceLock<ResidueTable> = OnceLock::new();

pub fn get_store() -> &'static ResidueTable {
    STORE.get_or_init(load_builtin_table)
}

fn load_builtin_table() -> ResidueTable {
    let content = include_str!("../../data/residue_types.toml");
    let schema: ResidueTableFile = toml::from_str(content)
        .unwrap_or_else(|e| panic!("Failed to parse built-in residue table: {}", e));
    ResidueTable::from_schema(schema)
}
