use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use holo_forge::ops::{
    AtomStrategy, ChainSelection, Error, FilterConfig, MANIFEST_FILE, Policy, PrepareRequest,
    ResidueStrategy, Warning,
};
use holo_forge::tools::{
    ParametriseRequest, Parametriser, StructureTool, ToolAction, ToolInput, ToolKind,
    ToolOptions, Toolbox,
};
use holo_forge::{
    ForceFieldParams, Fragment, LigandRef, MoleculeKind, Protein, ResidueCategory, ResidueId,
    WorkDir,
};

type Calls = Rc<RefCell<Vec<(ToolKind, ToolAction)>>>;

fn atom_line(serial: usize, record: &str, res: &str, chain: char, seq: i32, element: &str) -> String {
    let name = match (record, element) {
        ("ATOM  ", _) => " CA",
        (_, "O") => " O",
        _ => " C1",
    };
    format!(
        "{record}{serial:>5} {name:<4} {res:>3} {chain}{seq:>4}    {x:>8.3}{y:>8.3}{z:>8.3}{occ:>6.2}{temp:>6.2}          {element:>2}",
        x = seq as f64 * 3.8,
        y = 0.0,
        z = 0.0,
        occ = 1.0,
        temp = 0.0,
    )
}

/// Chain A numbered 1..=50 without `gap`, chain B numbered 1..=5, and one ligand on A.
fn complex_pdb(gap: &[i32]) -> String {
    let mut lines: Vec<String> = gap
        .iter()
        .map(|seq| format!("REMARK 465     ALA A {:>5}", seq))
        .collect();
    let mut serial = 1;
    for seq in (1..=50).filter(|s| !gap.contains(s)) {
        lines.push(atom_line(serial, "ATOM  ", "ALA", 'A', seq, "C"));
        serial += 1;
    }
    for seq in 1..=5 {
        lines.push(atom_line(serial, "ATOM  ", "GLY", 'B', seq, "C"));
        serial += 1;
    }
    lines.push(atom_line(serial, "HETATM", "LIG", 'A', 401, "C"));
    lines.push(atom_line(serial + 1, "HETATM", "HOH", 'B', 501, "O"));
    lines.push("END".to_string());
    lines.join("\n") + "\n"
}

/// Chain A residues 1..=50, as a residue-filling engine would return them.
fn filled_chain_a() -> String {
    let mut lines: Vec<String> = (1..=50)
        .map(|seq| atom_line(seq as usize, "ATOM  ", "ALA", 'A', seq, "C"))
        .collect();
    lines.push("END".to_string());
    lines.join("\n") + "\n"
}

struct MockTool {
    kind: ToolKind,
    available: bool,
    calls: Calls,
}

impl StructureTool for MockTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn apply(
        &self,
        input: &ToolInput<'_>,
        action: ToolAction,
        _options: &ToolOptions,
    ) -> Result<PathBuf, Error> {
        self.calls.borrow_mut().push((self.kind, action));
        let stem = input.structure.file_stem().unwrap().to_string_lossy();
        let ext = input.structure.extension().unwrap().to_string_lossy();
        let out = input
            .structure
            .with_file_name(format!("{}_{}.{}", stem, self.kind.name(), ext));
        match action {
            ToolAction::AddMissingResidues { .. } => fs::write(&out, filled_chain_a()).unwrap(),
            _ => {
                fs::copy(input.structure, &out).unwrap();
            }
        }
        Ok(out)
    }
}

fn toolbox(calls: &Calls, modeller: bool) -> Toolbox {
    let mut toolbox = Toolbox::new();
    for kind in ToolKind::ALL {
        toolbox.register(MockTool {
            kind,
            available: kind != ToolKind::Modeller || modeller,
            calls: calls.clone(),
        });
    }
    toolbox
}

struct MockParametriser;

impl Parametriser for MockParametriser {
    fn parametrise(&self, request: &ParametriseRequest<'_>) -> Result<Fragment, Error> {
        let stem = request.input.file_stem().unwrap().to_string_lossy();
        Ok(Fragment::new(
            request.kind,
            stem.clone(),
            vec![request.input.with_extension("prmtop")],
        ))
    }
}

struct Inputs {
    dir: tempfile::TempDir,
}

impl Inputs {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("input.pdb"), complex_pdb(&[10, 11, 12])).unwrap();
        fs::write(
            dir.path().join("input.fasta"),
            format!(">1ABC_A\n{}\n>1ABC_B\n{}\n", "A".repeat(50), "G".repeat(5)),
        )
        .unwrap();
        fs::write(dir.path().join("1ABC_LIG_A_401.sdf"), "LIG\n$$$$\n").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn work_dir(&self) -> PathBuf {
        self.path("1abc")
    }

    fn protein(&self, ligand_ref: LigandRef) -> Protein {
        Protein::builder()
            .code("1abc")
            .work_dir(self.work_dir())
            .structure_file(self.path("input.pdb"))
            .sequence_file(self.path("input.fasta"))
            .ligand_files([self.path("1ABC_LIG_A_401.sdf")])
            .ligand_ref(ligand_ref)
            .build()
            .unwrap()
    }
}

fn chain_ids(protein: &Protein) -> Vec<char> {
    protein.structure().iter_chains().map(|c| c.id).collect()
}

fn chain_a_only() -> FilterConfig {
    FilterConfig {
        chains: ChainSelection::only(['A']),
        ..FilterConfig::default()
    }
}

#[test]
fn chain_a_is_filtered_repaired_and_assembled_with_its_ligand() {
    let inputs = Inputs::new();
    let mut protein = inputs.protein(LigandRef::Disabled);
    let calls = Calls::default();

    protein.filter(&chain_a_only()).unwrap();
    assert_eq!(chain_ids(&protein), vec!['A']);
    assert_eq!(protein.structure().missing_residues.len(), 3);
    assert_eq!(
        protein.sequences().unwrap().chain_ids().into_iter().collect::<Vec<_>>(),
        vec!['A']
    );

    let request = PrepareRequest {
        add_missing_residues: ResidueStrategy::PdbFixer,
        add_missing_atoms: AtomStrategy::PdbFixer,
        ..PrepareRequest::default()
    };
    let report = protein.prepare(&request, &toolbox(&calls, true)).unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![
            (
                ToolKind::PdbFixer,
                ToolAction::AddMissingResidues { with_atoms: true }
            ),
            (ToolKind::Pdb2Pqr, ToolAction::Protonate),
            (ToolKind::Babel, ToolAction::Protonate),
        ]
    );
    assert!(report.warnings.is_empty());
    assert_eq!(protein.structure_path(), inputs.work_dir().join("1abc.pdb"));
    assert_eq!(protein.structure().residue_count(), 50);
    assert!(protein.structure().missing_residues.is_empty());
    assert!(protein.ligands()[0].is_protonated());

    let system = protein
        .parametrise(&MockParametriser, &ForceFieldParams::default(), false)
        .unwrap();

    let kinds: Vec<_> = system.fragments().iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![MoleculeKind::Protein, MoleculeKind::Ligand]);
    assert_eq!(system.fragments()[1].name, "1ABC_LIG_A_401");
    assert!(inputs.work_dir().join(MANIFEST_FILE).is_file());
    assert_eq!(chain_ids(&protein), vec!['A']);
    assert!(
        protein
            .structure()
            .iter_residues()
            .all(|(_, r)| r.category == ResidueCategory::AminoAcid)
    );
}

#[test]
fn unavailable_modeller_falls_back_to_charmm_gui_for_gaps() {
    let inputs = Inputs::new();
    let mut protein = inputs.protein(LigandRef::Auto);
    let calls = Calls::default();
    protein.filter(&chain_a_only()).unwrap();

    let request = PrepareRequest {
        add_missing_residues: ResidueStrategy::Modeller,
        ..PrepareRequest::default()
    };
    let report = protein.prepare(&request, &toolbox(&calls, false)).unwrap();

    assert_eq!(
        calls.borrow()[0],
        (
            ToolKind::CharmmGui,
            ToolAction::AddMissingResidues { with_atoms: false }
        )
    );
    assert!(
        report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::StrategySubstituted { used, .. } if used == "charmm-gui"))
    );
    assert!(protein.ligand_ref().unwrap().is_protonated());
}

#[test]
fn reference_ligand_cannot_be_reassigned() {
    let inputs = Inputs::new();
    let mut protein = inputs.protein(LigandRef::Identifier("401".into()));

    assert_eq!(protein.ligand_ref().unwrap().name(), "1ABC_LIG_A_401");
    assert!(protein.ligands().is_empty());

    let err = protein
        .set_ligand_ref(LigandRef::File(inputs.path("1ABC_LIG_A_401.sdf")))
        .unwrap_err();
    assert!(matches!(err, Error::ReferenceReassignment { .. }));
    assert_eq!(protein.ligand_ref().unwrap().name(), "1ABC_LIG_A_401");
}

#[test]
fn exclusion_wins_over_inclusion() {
    let inputs = Inputs::new();
    let mut protein = inputs.protein(LigandRef::Disabled);

    let config = FilterConfig {
        ligands: Policy::None,
        include_mols: vec!["401".into(), "A5".into()],
        exclude_mols: vec!["401".into(), "A5".into()],
        ..FilterConfig::default()
    };
    protein.filter(&config).unwrap();

    assert!(protein.ligands().is_empty());
    assert!(
        protein
            .structure()
            .find_residue(&ResidueId::new('A', 5, None))
            .is_none()
    );
    assert!(
        protein
            .structure()
            .find_residue(&ResidueId::new('A', 6, None))
            .is_some()
    );
}

#[test]
fn filtering_twice_changes_nothing_more() {
    let inputs = Inputs::new();
    let mut protein = inputs.protein(LigandRef::Disabled);
    let config = FilterConfig {
        waters: Policy::None,
        ..chain_a_only()
    };

    protein.filter(&config).unwrap();
    let residues = protein.structure().residue_count();
    let written = fs::read_to_string(protein.structure_path()).unwrap();

    let second = protein.filter(&config).unwrap();

    assert_eq!(second.removed_residues, 0);
    assert_eq!(protein.structure().residue_count(), residues);
    assert_eq!(protein.ligands().len(), 1);
    assert_eq!(fs::read_to_string(protein.structure_path()).unwrap(), written);
}

#[test]
fn trimming_without_sequences_is_refused() {
    let inputs = Inputs::new();
    let mut protein = Protein::builder()
        .code("1abc")
        .work_dir(inputs.work_dir())
        .structure_file(inputs.path("input.pdb"))
        .ligands(Vec::new())
        .build()
        .unwrap();

    let err = protein.filter(&FilterConfig::default()).unwrap_err();

    assert!(matches!(err, Error::MissingSequence { .. }));
    assert_eq!(chain_ids(&protein), vec!['A', 'B']);
    assert!(WorkDir::new(inputs.work_dir()).enter().is_ok());
}
