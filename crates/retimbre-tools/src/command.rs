//! Subprocess-backed tools.
//!
//! A [`ToolCommand`] is a program plus an argument template. `{name}`
//! placeholders in the template are replaced with the paths an
//! [`Invocation`] binds; `{output}` is always bound.

use crate::error::{Error, Result};
use crate::tool::{ExternalTool, Invocation};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default timeout for external processes (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Program, argument template and timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// `fluidsynth -ni -F {output} {soundbank} {score}`
    pub fn synthesizer() -> Self {
        Self::new("fluidsynth", ["-ni", "-F", "{output}", "{soundbank}", "{score}"])
    }

    /// `ffmpeg -y -i {input} {output}`
    pub fn transcoder() -> Self {
        Self::new("ffmpeg", ["-y", "-i", "{input}", "{output}"])
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.program.trim().is_empty()
    }

    /// Placeholder names used by the argument template, in order of appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        for arg in &self.args {
            for segment in parse_template(arg) {
                if let Segment::Placeholder(name) = segment {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }

    /// Substitute every placeholder with its bound path.
    pub fn render_args(&self, invocation: &Invocation) -> Result<Vec<OsString>> {
        self.args
            .iter()
            .map(|arg| render_arg(arg, invocation))
            .collect()
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a template into literal text and `{name}` placeholders.
///
/// Braces that do not enclose a valid name are kept as literal text.
fn parse_template(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                if open > 0 {
                    segments.push(Segment::Literal(&rest[..open]));
                }
                segments.push(Segment::Placeholder(&after[..close]));
                rest = &after[close + 1..];
            }
            _ => {
                segments.push(Segment::Literal(&rest[..open + 1]));
                rest = after;
            }
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    segments
}

fn render_arg(template: &str, invocation: &Invocation) -> Result<OsString> {
    let segments = parse_template(template);

    let lookup = |name: &str| {
        invocation.get(name).ok_or_else(|| Error::UnboundPlaceholder {
            name: name.to_string(),
        })
    };

    // A bare placeholder passes the path through without lossy conversion
    if let [Segment::Placeholder(name)] = segments.as_slice() {
        return Ok(lookup(*name)?.as_os_str().to_os_string());
    }

    let mut rendered = OsString::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => rendered.push(text),
            Segment::Placeholder(name) => rendered.push(lookup(name)?.as_os_str()),
        }
    }
    Ok(rendered)
}

/// Runs a [`ToolCommand`] as a child process.
#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    command: ToolCommand,
    timeout: Duration,
}

impl CommandTool {
    pub fn new(name: impl Into<String>, command: ToolCommand) -> Self {
        let timeout = Duration::from_secs(command.timeout_secs);
        Self {
            name: name.into(),
            command,
            timeout,
        }
    }

    /// Override the timeout with sub-second precision.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &ToolCommand {
        &self.command
    }

    fn resolve_program(&self) -> Result<PathBuf> {
        if !self.command.is_configured() {
            return Err(Error::NotConfigured {
                tool: self.name.clone(),
            });
        }
        which::which(&self.command.program).map_err(|_| Error::ProgramNotFound {
            program: self.command.program.clone(),
        })
    }
}

impl ExternalTool for CommandTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, invocation: &Invocation) -> Result<PathBuf> {
        let args = self.command.render_args(invocation)?;
        let program = self.resolve_program()?;

        debug!("Running {}: {} {:?}", self.name, program.display(), args);

        // stdout is discarded; a full stdout pipe would stall the child
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::SpawnFailed {
                program: self.command.program.clone(),
                source,
            })?;

        let started = Instant::now();
        let (status, stderr) = wait_with_timeout(child, self.timeout).map_err(|e| match e {
            Error::Timeout { timeout_secs, .. } => Error::Timeout {
                program: self.command.program.clone(),
                timeout_secs,
            },
            other => other,
        })?;

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            warn!("{} exited with status {}", self.name, exit_code);
            return Err(Error::process_failed(
                self.command.program.clone(),
                exit_code,
                stderr.trim(),
            ));
        }

        let output = invocation.output();
        let produced = std::fs::metadata(output)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(Error::MissingArtifact {
                path: output.to_path_buf(),
            });
        }

        info!(
            "{} finished in {:.2}s -> {}",
            self.name,
            started.elapsed().as_secs_f64(),
            output.display()
        );
        Ok(output.to_path_buf())
    }
}

fn spawn_stderr_reader(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    }))
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<(ExitStatus, String)> {
    let reader = spawn_stderr_reader(&mut child);
    let start = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        program: String::new(),
                        timeout_secs: timeout.as_secs_f64(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(Error::Io(e)),
        }
    };

    let stderr = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    Ok((status, stderr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", ["-c", script, "{output}"])
    }

    #[test]
    fn test_default_templates() {
        assert_eq!(
            ToolCommand::synthesizer().placeholders(),
            vec!["output", "soundbank", "score"]
        );
        assert_eq!(ToolCommand::transcoder().placeholders(), vec!["input", "output"]);
        assert_eq!(ToolCommand::synthesizer().timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_render_args() {
        let command = ToolCommand::new("tool", ["--in={input}", "{output}", "{not a name}", "{}"]);
        let invocation = Invocation::new("/out/x.wav").input("input", "/in/y.mp3");

        let args = command.render_args(&invocation).unwrap();
        assert_eq!(
            args,
            vec![
                OsString::from("--in=/in/y.mp3"),
                OsString::from("/out/x.wav"),
                OsString::from("{not a name}"),
                OsString::from("{}"),
            ]
        );
    }

    #[test]
    fn test_unbound_placeholder() {
        let command = ToolCommand::synthesizer();
        let invocation = Invocation::new("/out.wav").input("score", "/s.mid");

        match command.render_args(&invocation) {
            Err(Error::UnboundPlaceholder { name }) => assert_eq!(name, "soundbank"),
            other => panic!("Expected UnboundPlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn test_unconfigured_program() {
        let tool = CommandTool::new("transcriber", ToolCommand::default());
        let result = tool.run(&Invocation::new("/tmp/never.mid"));
        assert!(matches!(result, Err(Error::NotConfigured { .. })));
    }

    #[test]
    fn test_program_not_found() {
        let tool = CommandTool::new(
            "synth",
            ToolCommand::new("retimbre-no-such-program", ["{output}"]),
        );
        let result = tool.run(&Invocation::new("/tmp/never.wav"));
        assert!(matches!(result, Err(Error::ProgramNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_returns_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.wav");
        let tool = CommandTool::new("fake", sh("printf data > \"$0\""));

        let produced = tool.run(&Invocation::new(&output)).unwrap();
        assert_eq!(produced, output);
        assert_eq!(std::fs::read(&output).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_captures_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CommandTool::new("fake", sh("echo 'bad sound bank' >&2; exit 3"));

        match tool.run(&Invocation::new(dir.path().join("out.wav"))) {
            Err(Error::ProcessFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "bad sound bank");
            }
            other => panic!("Expected ProcessFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_and_empty_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.wav");

        let tool = CommandTool::new("fake", sh("true"));
        assert!(matches!(
            tool.run(&Invocation::new(&output)),
            Err(Error::MissingArtifact { .. })
        ));

        let tool = CommandTool::new("fake", sh(": > \"$0\""));
        assert!(matches!(
            tool.run(&Invocation::new(&output)),
            Err(Error::MissingArtifact { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CommandTool::new("slow", sh("sleep 5")).timeout(Duration::from_millis(200));

        let started = Instant::now();
        match tool.run(&Invocation::new(dir.path().join("out.wav"))) {
            Err(Error::Timeout { program, .. }) => assert_eq!(program, "sh"),
            other => panic!("Expected Timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
