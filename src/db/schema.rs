use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResidueTableFile {
    pub info: TableInfo,
    pub categories: CategoryLists,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TableInfo {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct CategoryLists {
    #[serde(default)]
    pub amino_acid: Vec<String>,
    #[serde(default)]
    pub amino_acid_modified: Vec<String>,
    #[serde(default)]
    pub water: Vec<String>,
    #[serde(default)]
    pub ligand: Vec<String>,
    #[serde(default)]
    pub cofactor: Vec<String>,
    #[serde(default)]
    pub simple_anion: Vec<String>,
    #[serde(default)]
    pub complex_anion: Vec<String>,
    #[serde(default)]
    pub simple_cation: Vec<String>,
    #[serde(default)]
    pub complex_cation: Vec<String>,
}
