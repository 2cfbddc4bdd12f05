//! Shell command execution.
//!
//! Every subprocess a task starts goes through a [`CommandRunner`]. The
//! production [`ShellRunner`] is the single chokepoint that hands an argument
//! vector to the platform shell; [`MockRunner`] records commands and replays
//! canned results so task logic can be tested without a package manager.
//!
//! # Output pipes
//!
//! stdin, stdout and stderr are always piped. The runner drains both output
//! pipes before returning, but callers should still pass `--quiet` to chatty
//! subcommands (pip) so a child never stalls on a full pipe.

use std::collections::VecDeque;
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{InstallKitError, Result};

/// Output from a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given exit code and `stderr`.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
        }
    }

    /// Check if the command succeeded and return an error if not.
    pub fn ensure_success(&self, command: &[String]) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(InstallKitError::CommandFailed {
                command: render_command(command),
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Executes an argument vector and reports how it exited.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// Returns `Err` only when the process could not be started or waited
    /// on; a non-zero exit is reported through [`CommandOutput::success`].
    fn run(&self, command: &[String]) -> Result<CommandOutput>;
}

/// Run `command` and fail on a non-zero exit status.
pub fn start_command(runner: &dyn CommandRunner, command: &[String]) -> Result<CommandOutput> {
    let output = runner.run(command)?;
    output.ensure_success(command)?;
    Ok(output)
}

/// Join an argument vector into one shell line, quoting where needed.
pub fn render_command(command: &[String]) -> String {
    command
        .iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    // Command separators are passed through verbatim.
    if arg == "&&" {
        return arg.to_string();
    }
    if !arg.is_empty() && arg.chars().all(is_shell_safe) {
        return arg.to_string();
    }
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Characters passed to the shell unquoted
fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_./:=@%+,-".contains(c) || (cfg!(windows) && c == '\\')
}

/// Argument for `cmd /S /C`: the outer quote pair is the only one cmd strips.
#[cfg(any(windows, test))]
fn cmd_line(line: &str) -> String {
    format!("\"{line}\"")
}

/// Production runner: `cmd /S /C "<line>"` on Windows, `sh -c <line>` elsewhere.
///
/// The child inherits the parent's environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn shell(line: &str) -> Command {
        use std::os::windows::process::CommandExt;
        let mut cmd = Command::new("cmd");
        cmd.args(["/S", "/C"]).raw_arg(cmd_line(line));
        cmd
    }

    #[cfg(not(windows))]
    fn shell(line: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &[String]) -> Result<CommandOutput> {
        if command.is_empty() {
            return Err(InstallKitError::validation("cannot run an empty command"));
        }
        let line = render_command(command);
        debug!(command = %line, "running shell command");

        let child = Self::shell(&line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // wait_with_output closes stdin and drains both output pipes
        let output = child.wait_with_output()?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };

        if result.success {
            info!(command = %line, "command succeeded");
        } else {
            warn!(
                command = %line,
                exit_code = result.exit_code.unwrap_or(-1),
                "command failed"
            );
        }
        Ok(result)
    }
}

/// Test double that records commands and returns pre-configured results.
///
/// Queued responses are consumed in order; once the queue is empty every
/// command succeeds with empty output, unless it matches a failure rule
/// registered with [`MockRunner::fail_when_contains`].
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<VecDeque<CommandOutput>>,
    failures: Mutex<Vec<(String, CommandOutput)>>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<CommandOutput>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Fail every command with an argument containing `needle`.
    pub fn fail_when_contains(self, needle: impl Into<String>, exit_code: i32) -> Self {
        let needle = needle.into();
        let output = CommandOutput::failed(exit_code, format!("simulated failure for `{needle}`"));
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((needle, output));
        self
    }

    /// Every command run so far, in order.
    pub fn executed_commands(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of commands run so far.
    pub fn call_count(&self) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &[String]) -> Result<CommandOutput> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.to_vec());

        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, output)) = failures
            .iter()
            .find(|(needle, _)| command.iter().any(|arg| arg.contains(needle.as_str())))
        {
            return Ok(output.clone());
        }
        drop(failures);

        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(responses.pop_front().unwrap_or_else(|| CommandOutput::ok("")))
    }
}
