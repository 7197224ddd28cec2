//! Running external tools (download scripts, `genstrings`, `fastlane`).

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// A command line to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs commands and returns their standard output.
pub trait CommandRunner {
    /// A non-zero exit is an [`Error::Tool`].
    fn run(&self, command: &CommandSpec) -> Result<String>;
}

/// Runs commands as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<String> {
        info!(command = %spec, "running");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().map_err(|e| Error::Tool {
            command: spec.to_string(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match output.status.code() {
                Some(code) => format!("exit code {code}: {}", stderr.trim()),
                None => format!("terminated by signal: {}", stderr.trim()),
            };
            return Err(Error::Tool {
                command: spec.to_string(),
                message,
            });
        }

        debug!(command = %spec.program, bytes = stdout.len(), "command finished");
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_spaces() {
        let spec = CommandSpec::new("fastlane")
            .arg("deliver")
            .arg("--metadata_path")
            .arg("fastlane/jetpack metadata");
        assert_eq!(
            spec.to_string(),
            "fastlane deliver --metadata_path 'fastlane/jetpack metadata'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output_and_failure() {
        let out = SystemRunner
            .run(&CommandSpec::new("sh").args(["-c", "echo hello"]))
            .unwrap();
        assert_eq!(out.trim(), "hello");

        let err = SystemRunner
            .run(&CommandSpec::new("sh").args(["-c", "echo oops >&2; exit 3"]))
            .unwrap_err();
        assert!(matches!(err, Error::Tool { ref message, .. } if message.contains("exit code 3") && message.contains("oops")));
    }

    #[test]
    fn test_missing_program_is_tool_error() {
        let err = SystemRunner
            .run(&CommandSpec::new("glotpipe-definitely-missing-tool"))
            .unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }
}
