//! Shell command execution shared by command guards and the `execute` handler.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Output};

use tracing::trace;

/// Runs `command` through `sh -c`, discarding its output.
pub fn run_shell(command: &str) -> io::Result<ExitStatus> {
  run_shell_output(command, None).map(|out| out.status)
}

/// Runs `command` through `sh -c`, optionally from `cwd`, capturing
/// stdout/stderr.
pub fn run_shell_output(command: &str, cwd: Option<&Path>) -> io::Result<Output> {
  trace!(command = %command, cwd = ?cwd, "running shell command");
  let mut cmd = Command::new("sh");
  cmd.arg("-c").arg(command);
  if let Some(dir) = cwd {
    cmd.current_dir(dir);
  }
  cmd.output()
}
