//! Shell execution of accepted commands
//! - runs `<shell> -lc <command>` and captures stdout, stderr and exit code
//! - a nonzero exit is a normal result, not an error

use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{GenieError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command line in a shell
pub trait ShellExecutor {
    fn execute(&self, shell: &str, command: &str) -> Result<ExecOutput>;
}

/// Executes through the host OS
pub struct SystemShell;

impl ShellExecutor for SystemShell {
    fn execute(&self, shell: &str, command: &str) -> Result<ExecOutput> {
        tracing::info!(shell, command, "executing");

        let output = Command::new(shell)
            .arg("-lc")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| GenieError::Spawn {
                shell: shell.to_string(),
                source,
            })?;

        let exit_code = exit_code_of(output.status);
        tracing::info!(exit_code, "command finished");

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
        })
    }
}

/// Exit code of a finished process; signal deaths map to 128 + signal
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Executor that replays canned results and records what it was asked to run (for testing)
#[derive(Default)]
pub struct ScriptedShell {
    results: RefCell<VecDeque<ExecOutput>>,
    executed: RefCell<Vec<(String, String)>>,
}

impl ScriptedShell {
    pub fn new(results: impl IntoIterator<Item = ExecOutput>) -> Self {
        Self {
            results: RefCell::new(results.into_iter().collect()),
            executed: RefCell::new(Vec::new()),
        }
    }

    /// (shell, command) pairs executed so far
    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed.borrow().clone()
    }
}

impl ShellExecutor for ScriptedShell {
    fn execute(&self, shell: &str, command: &str) -> Result<ExecOutput> {
        self.executed
            .borrow_mut()
            .push((shell.to_string(), command.to_string()));
        Ok(self.results.borrow_mut().pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let out = SystemShell.execute("/bin/sh", "echo hello").unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "");
        assert!(out.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let out = SystemShell
            .execute("/bin/sh", "echo 'file not found' >&2; exit 4")
            .unwrap();
        assert_eq!(out.exit_code, 4);
        assert_eq!(out.stderr.trim(), "file not found");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_exit_code() {
        let out = SystemShell.execute("/bin/sh", "kill -9 $$").unwrap();
        assert_eq!(out.exit_code, 137);
    }

    #[test]
    fn test_missing_shell() {
        let err = SystemShell
            .execute("/nonexistent/shell", "true")
            .unwrap_err();
        assert!(matches!(err, GenieError::Spawn { .. }));
    }

    #[test]
    fn test_scripted_shell_records() {
        let shell = ScriptedShell::new([ExecOutput {
            stdout: "ok\n".into(),
            ..Default::default()
        }]);
        let out = shell.execute("/bin/zsh", "ls").unwrap();
        assert_eq!(out.stdout, "ok\n");
        assert_eq!(shell.executed(), vec![("/bin/zsh".to_string(), "ls".to_string())]);
    }
}
