// fridactl-core/src/process/shell.rs
//! The elevated execution channel: every privileged operation is a
//! `su -c "<command>"` invocation whose exit code and stderr are the only
//! feedback.
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use fridactl_common::config::Config;
use fridactl_common::error::{FridaError, Result};
use tokio::process::Command;
use tracing::{debug, error};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs shell command lines with superuser privileges.
pub trait ElevatedShell: Send + Sync + 'static {
    /// Runs `command` and waits for it, capturing stdout and stderr.
    fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput>>;

    /// Runs `command` with all standard streams closed and waits only for the
    /// elevated wrapper to exit. Used for `<binary> &` so a long-lived child
    /// never holds a pipe the caller would have to drain.
    fn run_detached(&self, command: &str) -> impl Future<Output = Result<CommandOutput>>;
}

/// `su -c` backed shell.
#[derive(Debug, Clone)]
pub struct SuShell {
    su_binary: String,
    timeout: Duration,
}

impl SuShell {
    pub fn new(su_binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            su_binary: su_binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.su_binary.clone(), config.command_timeout)
    }

    async fn execute(&self, command: &str, capture: bool) -> Result<CommandOutput> {
        debug!("Running elevated: {} -c {:?}", self.su_binary, command);
        let mut cmd = Command::new(&self.su_binary);
        cmd.arg("-c").arg(command);
        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::null());
        if capture {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Failed to execute {}: {}", self.su_binary, e);
                return Err(FridaError::Privilege(format!(
                    "Failed to execute `{} -c {}`: {}",
                    self.su_binary, command, e
                )));
            }
            Err(_) => {
                return Err(FridaError::Privilege(format!(
                    "`{} -c {}` timed out after {:?}",
                    self.su_binary, command, self.timeout
                )));
            }
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        if !result.success() {
            debug!("Elevated command failed with status: {}", output.status);
            if !result.stderr.trim().is_empty() {
                debug!("Stderr:\n{}", result.stderr.trim());
            }
        }
        Ok(result)
    }
}

impl ElevatedShell for SuShell {
    fn run(&self, command: &str) -> impl Future<Output = Result<CommandOutput>> {
        self.execute(command, true)
    }

    fn run_detached(&self, command: &str) -> impl Future<Output = Result<CommandOutput>> {
        self.execute(command, false)
    }
}

/// Runs `command` and turns a non-zero exit into a privilege error.
pub async fn run_checked<S: ElevatedShell>(shell: &S, command: &str) -> Result<CommandOutput> {
    let output = shell.run(command).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(FridaError::Privilege(describe_failure(command, &output)))
    }
}

pub(crate) fn describe_failure(command: &str, output: &CommandOutput) -> String {
    let code = output
        .exit_code
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        format!("`{command}` exited with {code}")
    } else {
        format!("`{command}` exited with {code}: {stderr}")
    }
}

/// Quotes `arg` for a POSIX shell when it contains anything beyond a
/// conservative set of path characters.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '+' | ':'));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
