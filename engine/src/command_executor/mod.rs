use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Ceiling for a single child process when none is configured
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CommandExecutor runs allow-listed programs with a fixed argv.
///
/// # Security Features
/// - Allowlist-based program validation
/// - Shell programs refused even when allow-listed
/// - Shell metacharacter detection in every argument
/// - execve-style execution (no shell)
/// - stdin set to null, stdout/stderr piped
/// - Child killed when the timeout fires or the caller drops the future
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    allowlist: HashSet<String>,
    timeout: Duration,
}

/// Captured result of a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("Shell invocation attempt detected")]
    ShellInjectionAttempt,

    #[error("Shell metacharacters detected in argument: {0}")]
    ShellMetacharactersDetected(String),

    #[error("Argument may not start with '-': {0}")]
    OptionInjection(String),

    #[error("Argument is empty")]
    EmptyArgument,

    #[error("Command timed out after {0}s")]
    TimedOut(u64),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(#[from] std::io::Error),
}

impl CommandExecutor {
    /// Creates a CommandExecutor with a custom allowlist.
    pub fn with_allowlist(commands: Vec<String>) -> Self {
        Self {
            allowlist: commands.into_iter().collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the per-process timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowlist.contains(command)
    }

    /// Validates a command through all security gates without executing it.
    pub fn validate(&self, command: &str, args: &[String]) -> Result<(), CommandError> {
        // Gate 1: Validate command is in allowlist
        if !self.allowlist.contains(command) {
            return Err(CommandError::CommandNotAllowed(command.to_string()));
        }

        // Gate 2: Reject shell invocation patterns
        if matches!(command, "sh" | "bash" | "zsh" | "fish" | "dash") {
            return Err(CommandError::ShellInjectionAttempt);
        }

        // Gate 3: Check for shell metacharacters in arguments
        for arg in args {
            if has_shell_metacharacters(arg) {
                return Err(CommandError::ShellMetacharactersDetected(arg.clone()));
            }
        }

        Ok(())
    }

    /// Executes a command with security validation.
    ///
    /// A non-zero exit status is not an error here; it is reported through
    /// `CommandOutput::code` so the caller decides how to surface it.
    pub async fn execute(&self, command: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        self.validate(command, args)?;

        tracing::debug!("Spawning {} {:?}", command, args);

        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("{} timed out after {}s", command, self.timeout.as_secs());
                return Err(CommandError::TimedOut(self.timeout.as_secs()));
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        })
    }
}

/// Checks a value that will be substituted into a template argv slot.
///
/// Beyond the metacharacter gate, substituted values may not be empty and
/// may not start with `-` so they can never be read as an option.
pub fn check_substituted_value(value: &str) -> Result<(), CommandError> {
    if value.is_empty() {
        return Err(CommandError::EmptyArgument);
    }
    if value.starts_with('-') {
        return Err(CommandError::OptionInjection(value.to_string()));
    }
    if has_shell_metacharacters(value) {
        return Err(CommandError::ShellMetacharactersDetected(value.to_string()));
    }
    Ok(())
}

/// Checks if a string contains shell metacharacters.
///
/// Detects: | & ; ' " ` $ \n < >
fn has_shell_metacharacters(s: &str) -> bool {
    s.chars()
        .any(|c| matches!(c, '|' | '&' | ';' | '\'' | '"' | '`' | '$' | '\n' | '<' | '>'))
}
