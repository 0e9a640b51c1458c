//! External command runner used by the ICMP test

use crate::error::{AppError, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Runs one shell command line and returns its stdout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// A non-zero exit status is an error
    async fn run(&self, command_line: &str) -> Result<String>;
}

/// Runs command lines through `/bin/sh -c`
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
        }
    }

    /// Use another POSIX shell
    pub fn with_shell<S: Into<String>>(shell: S) -> Self {
        Self { shell: shell.into() }
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command_line: &str) -> Result<String> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .output()
            .await
            .map_err(|e| {
                AppError::command_execution(format!(
                    "command execution failed - {} due to the error - {}",
                    command_line, e
                ))
            })?;

        if !output.status.success() {
            return Err(AppError::command_execution(format!(
                "command execution failed - {} due to the error - {}",
                command_line, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = ShellCommandRunner::new();
        let out = runner.run("echo probe").await.unwrap();
        assert_eq!(out.trim(), "probe");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let runner = ShellCommandRunner::new();
        let err = runner.run("exit 3").await.unwrap_err();
        assert_eq!(err.category(), "COMMAND");
        assert!(err.to_string().contains("exit 3"));
    }

    #[tokio::test]
    async fn test_missing_shell_is_error() {
        let runner = ShellCommandRunner::with_shell("/nonexistent/sh");
        assert!(runner.run("true").await.is_err());
    }
}
