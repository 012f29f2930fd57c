use super::config::ParametriserConfig;
use super::process::{self, Placeholders};
use crate::model::records::DisulfideBond;
use crate::model::system::{ForceFieldParams, Fragment, MoleculeKind};
use crate::ops::Error;
use std::path::Path;

/// One molecule to parametrise.
#[derive(Debug, Clone, Copy)]
pub struct ParametriseRequest<'a> {
    pub input: &'a Path,
    pub kind: MoleculeKind,
    pub params: &'a ForceFieldParams,
    /// Disulfide bridges to declare; only meaningful for protein input.
    pub disulfide_bonds: &'a [DisulfideBond],
    /// Residue name used to look up cofactor parameters.
    pub id: Option<&'a str>,
}

/// Force-field engine turning one structure file into a [`Fragment`].
pub trait Parametriser {
    fn parametrise(&self, request: &ParametriseRequest<'_>) -> Result<Fragment, Error>;
}

/// [`Parametriser`] backed by an external program.
///
/// Disulfide bridges are passed as one `--disulfide=<first>:<second>` argument each, for
/// example `--disulfide=A2:A7`.
#[derive(Debug, Clone)]
pub struct CommandParametriser {
    config: ParametriserConfig,
}

impl CommandParametriser {
    pub fn new(config: ParametriserConfig) -> Self {
        Self { config }
    }
}

impl Parametriser for CommandParametriser {
    fn parametrise(&self, request: &ParametriseRequest<'_>) -> Result<Fragment, Error> {
        let command = self.config.command();
        let dir = process::working_dir(request.input);
        let stem = request
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.kind.name().to_string());

        let mut values = Placeholders::new();
        values.set("input", request.input.display().to_string());
        values.set("kind", request.kind.name().to_string());
        values.set("protein_ff", request.params.protein_ff.clone());
        values.set("ligand_ff", request.params.ligand_ff.clone());
        values.set("water_model", request.params.water_model.clone());
        values.set("output_dir", dir.display().to_string());
        values.set("stem", stem.clone());
        if let Some(id) = request.id {
            values.set("id", id.to_string());
        }

        let mut args = values.render(&command.args);
        args.extend(
            request
                .disulfide_bonds
                .iter()
                .map(|b| format!("--disulfide={}:{}", b.first, b.second)),
        );

        let files = values
            .render(&self.config.outputs)
            .into_iter()
            .map(|name| dir.join(name))
            .collect::<Vec<_>>();
        for file in files.iter().filter(|f| f.as_path() != request.input) {
            process::discard_stale(file)?;
        }

        log::info!("Parametrising {} '{}'", request.kind, stem);
        process::run(&command.program, &command, &args, dir)?;

        if let Some(missing) = files.iter().find(|f| !f.is_file()) {
            return Err(Error::tool_invocation(
                &command.program,
                format!("expected output '{}' was not written", missing.display()),
            ));
        }

        Ok(Fragment::new(request.kind, stem, files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::identity::ResidueId;
    use std::fs;

    #[cfg(unix)]
    #[test]
    fn command_parametriser_collects_declared_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("protein.pdb");
        fs::write(&input, "END\n").unwrap();

        let config: ParametriserConfig = toml::from_str(
            r#"
            program = "sh"
            args = ["-c", "touch \"$1.top\" \"$1.gro\"; echo \"$2 $3\" > args.txt; echo \"$4\" >> args.txt", "param", "{stem}", "{kind}", "{protein_ff}"]
            "#,
        )
        .unwrap();
        let bonds = [DisulfideBond::new(
            ResidueId::new('A', 2, None),
            ResidueId::new('A', 7, None),
        )];
        let params = ForceFieldParams::default();

        let fragment = CommandParametriser::new(config)
            .parametrise(&ParametriseRequest {
                input: &input,
                kind: MoleculeKind::Protein,
                params: &params,
                disulfide_bonds: &bonds,
                id: None,
            })
            .unwrap();

        assert_eq!(fragment.name, "protein");
        assert_eq!(
            fragment.files,
            vec![dir.path().join("protein.top"), dir.path().join("protein.gro")]
        );
        let recorded = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(recorded, "protein ff14SB\n--disulfide=A2:A7\n");
    }

    #[cfg(unix)]
    #[test]
    fn missing_outputs_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lig.sdf");
        fs::write(&input, "").unwrap();

        let config: ParametriserConfig = toml::from_str("program = \"true\"").unwrap();
        let params = ForceFieldParams::default();
        let result = CommandParametriser::new(config).parametrise(&ParametriseRequest {
            input: &input,
            kind: MoleculeKind::Ligand,
            params: &params,
            disulfide_bonds: &[],
            id: None,
        });

        assert!(matches!(result, Err(Error::ToolInvocation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn outputs_from_an_earlier_run_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("protein.pdb");
        fs::write(&input, "END\n").unwrap();
        fs::write(dir.path().join("protein.prmtop"), "stale").unwrap();
        fs::write(dir.path().join("protein.inpcrd"), "stale").unwrap();

        let config: ParametriserConfig = toml::from_str(
            r#"
            program = "true"
            outputs = ["{stem}.prmtop", "{stem}.inpcrd"]
            "#,
        )
        .unwrap();
        let params = ForceFieldParams::default();
        let result = CommandParametriser::new(config).parametrise(&ParametriseRequest {
            input: &input,
            kind: MoleculeKind::Protein,
            params: &params,
            disulfide_bonds: &[],
            id: None,
        });

        assert!(matches!(result, Err(Error::ToolInvocation { .. })));
        assert!(!dir.path().join("protein.prmtop").exists());
        assert!(input.is_file());
    }
}
