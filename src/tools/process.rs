use super::{StructureTool, ToolAction, ToolConfig, ToolInput, ToolKind, ToolOptions};
use crate::ops::Error;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_LINES: usize = 5;

/// Engine run as an external program, configured by a [`ToolConfig`].
///
/// The program runs in the directory of its input structure and must write its result to
/// the `{output}` path, named `<input stem>_<tool>.<input extension>`.
#[derive(Debug, Clone)]
pub struct CommandTool {
    kind: ToolKind,
    config: ToolConfig,
}

impl CommandTool {
    pub fn new(kind: ToolKind, config: ToolConfig) -> Self {
        Self { kind, config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "structure".to_string());
        let extension = input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pdb".to_string());
        let tag = self.kind.name().replace('-', "");
        input.with_file_name(format!("{}_{}.{}", stem, tag, extension))
    }
}

impl StructureTool for CommandTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.config
            .requires_env
            .iter()
            .all(|var| std::env::var_os(var).is_some())
    }

    fn apply(
        &self,
        input: &ToolInput<'_>,
        action: ToolAction,
        options: &ToolOptions,
    ) -> Result<PathBuf, Error> {
        let output = self.output_path(input.structure);

        let mut values = Placeholders::new();
        values.set("input", input.structure.display().to_string());
        values.set("output", output.display().to_string());
        if let Some(sequence) = input.sequence {
            values.set("sequence", sequence.display().to_string());
        }
        if let Some(code) = input.code {
            values.set("code", code.to_string());
        }

        let mut args = values.render(&self.config.args);
        if let Some(extra) = self.config.action_args.get(action.key()) {
            args.extend(values.render(extra));
        }
        args.extend(option_args(options));

        log::info!("Running {} ({})", self.kind, action);
        discard_stale(&output)?;
        run(self.kind.name(), &self.config, &args, working_dir(input.structure))?;

        if !output.is_file() {
            return Err(Error::tool_invocation(
                self.kind.name(),
                format!("expected output '{}' was not written", output.display()),
            ));
        }
        Ok(output)
    }
}

/// Placeholder values substituted into `{name}` markers of argument templates.
#[derive(Debug, Default)]
pub(crate) struct Placeholders(BTreeMap<&'static str, String>);

impl Placeholders {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, name: &'static str, value: String) {
        self.0.insert(name, value);
    }

    /// Renders every template, dropping those that reference an unset placeholder.
    pub(crate) fn render(&self, templates: &[String]) -> Vec<String> {
        templates.iter().filter_map(|t| self.render_one(t)).collect()
    }

    fn render_one(&self, template: &str) -> Option<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            rendered.push_str(&rest[..start]);
            rendered.push_str(self.0.get(name)?);
            rest = &rest[start + len + 1..];
        }
        rendered.push_str(rest);
        Some(rendered)
    }
}

pub(crate) fn option_args(options: &ToolOptions) -> impl Iterator<Item = String> + '_ {
    options.iter().map(|(k, v)| format!("--{}={}", k, v))
}

pub(crate) fn working_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Removes a result left by an earlier run, so only freshly written output passes the
/// check after the engine exits.
pub(crate) fn discard_stale(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::filesystem(e, path)),
    }
}

/// Runs the configured program, retrying transient failures with linear backoff.
///
/// Each attempt re-runs against the same arguments, so a retried engine reads the
/// current input file rather than any partial output of the failed attempt.
pub(crate) fn run(
    tool: &str,
    config: &ToolConfig,
    args: &[String],
    dir: &Path,
) -> Result<(), Error> {
    let mut attempt = 0;
    loop {
        match run_once(tool, config, args, dir) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < config.retries => {
                attempt += 1;
                log::warn!(
                    "{} (retrying, attempt {} of {})",
                    e,
                    attempt + 1,
                    config.retries + 1
                );
                thread::sleep(config.retry_backoff() * attempt);
            }
            Err(e) => return Err(e),
        }
    }
}

fn run_once(tool: &str, config: &ToolConfig, args: &[String], dir: &Path) -> Result<(), Error> {
    log::debug!("{} {} (in {})", config.program, args.join(" "), dir.display());

    let mut child = Command::new(&config.program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            Error::tool_invocation(tool, format!("failed to start '{}': {}", config.program, e))
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, config.timeout())
        .map_err(|e| Error::tool_invocation(tool, format!("failed to wait for process: {}", e)))?;

    // Grandchildren of a killed process may still hold the pipes open.
    let Some(status) = status else {
        return Err(Error::tool_timeout(tool, config.timeout()));
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    if !stdout.trim().is_empty() {
        log::debug!("{} stdout:\n{}", tool, stdout.trim_end());
    }

    if status.success() {
        Ok(())
    } else {
        Err(Error::tool_invocation(
            tool,
            format!("{}{}", status, stderr_tail(&stderr)),
        ))
    }
}

/// Polls `child` until it exits; returns `None` after killing it on timeout.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            text = String::from_utf8_lossy(&bytes).into_owned();
        }
        text
    })
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
    format!(": {}", tail.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders() -> Placeholders {
        let mut values = Placeholders::new();
        values.set("input", "in.pdb".into());
        values.set("output", "out.pdb".into());
        values
    }

    #[test]
    fn templates_are_rendered_and_unset_placeholders_dropped() {
        let rendered = placeholders().render(&[
            "{input}".to_string(),
            "--out={output}".to_string(),
            "--seq={sequence}".to_string(),
            "--keep-{".to_string(),
        ]);
        assert_eq!(rendered, vec!["in.pdb", "--out=out.pdb", "--keep-{"]);
    }

    #[test]
    fn options_render_as_long_flags_in_key_order() {
        let options: ToolOptions = [
            ("ph".to_string(), "7.4".to_string()),
            ("ff".to_string(), "AMBER".to_string()),
        ]
        .into();
        let args: Vec<_> = option_args(&options).collect();
        assert_eq!(args, vec!["--ff=AMBER", "--ph=7.4"]);
    }

    #[test]
    fn output_path_is_tagged_with_the_tool() {
        let tool = CommandTool::new(ToolKind::CharmmGui, ToolConfig::new("true"));
        assert_eq!(
            tool.output_path(Path::new("/work/1abc.pdb")),
            PathBuf::from("/work/1abc_charmmgui.pdb")
        );
    }

    #[test]
    fn availability_follows_required_environment() {
        let mut config = ToolConfig::new("mod_fill");
        config.requires_env = vec!["HOLO_FORGE_TEST_UNSET_LICENCE".into()];
        let tool = CommandTool::new(ToolKind::Modeller, config);
        assert!(!tool.is_available());
    }

    #[cfg(unix)]
    fn shell_tool(script: &str, retries: u32) -> CommandTool {
        let mut config = ToolConfig::new("sh");
        config.args = vec![
            "-c".into(),
            script.into(),
            "tool".into(),
            "{input}".into(),
            "{output}".into(),
        ];
        config.retries = retries;
        config.retry_backoff_ms = 0;
        config.timeout_secs = 5;
        CommandTool::new(ToolKind::PdbFixer, config)
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_returns_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.pdb");
        fs::write(&input, "END\n").unwrap();

        let tool = shell_tool(r#"cp "$1" "$2""#, 0);
        let output = tool
            .apply(
                &ToolInput::structure(&input),
                ToolAction::AddMissingAtoms,
                &ToolOptions::new(),
            )
            .unwrap();

        assert_eq!(output, dir.path().join("model_pdbfixer.pdb"));
        assert_eq!(fs::read_to_string(output).unwrap(), "END\n");
    }

    #[cfg(unix)]
    #[test]
    fn output_left_by_an_earlier_run_is_not_mistaken_for_a_result() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.pdb");
        fs::write(&input, "END\n").unwrap();
        let stale = dir.path().join("model_pdbfixer.pdb");
        fs::write(&stale, "STALE\n").unwrap();

        let tool = shell_tool("exit 0", 0);
        let err = tool
            .apply(
                &ToolInput::structure(&input),
                ToolAction::AddMissingAtoms,
                &ToolOptions::new(),
            )
            .unwrap_err();

        assert!(matches!(err, Error::ToolInvocation { .. }));
        assert!(!stale.exists());
        assert_eq!(fs::read_to_string(&input).unwrap(), "END\n");
    }

    #[cfg(unix)]
    #[test]
    fn failing_run_reports_exit_status_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.pdb");
        fs::write(&input, "END\n").unwrap();

        let tool = shell_tool("echo 'no template for XYZ' >&2; exit 3", 0);
        let err = tool
            .apply(
                &ToolInput::structure(&input),
                ToolAction::Protonate,
                &ToolOptions::new(),
            )
            .unwrap_err();

        assert!(matches!(err, Error::ToolInvocation { .. }));
        assert!(err.to_string().contains("no template for XYZ"));
    }

    #[cfg(unix)]
    #[test]
    fn transient_failures_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.pdb");
        fs::write(&input, "END\n").unwrap();

        let tool = shell_tool(
            r#"if [ -f attempted ]; then cp "$1" "$2"; else touch attempted; exit 1; fi"#,
            1,
        );
        let output = tool
            .apply(
                &ToolInput::structure(&input),
                ToolAction::AddMissingAtoms,
                &ToolOptions::new(),
            )
            .unwrap();
        assert!(output.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn hung_tools_are_killed_after_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.pdb");
        fs::write(&input, "END\n").unwrap();

        let mut tool = shell_tool("exec sleep 30", 0);
        tool.config.timeout_secs = 1;
        let started = Instant::now();
        let err = tool
            .apply(
                &ToolInput::structure(&input),
                ToolAction::AddMissingAtoms,
                &ToolOptions::new(),
            )
            .unwrap_err();

        assert!(matches!(err, Error::ToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
