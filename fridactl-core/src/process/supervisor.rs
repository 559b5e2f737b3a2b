// fridactl-core/src/process/supervisor.rs
//! Launching, finding and killing the server process through the elevated
//! shell. The only view of the process is the `ps` table.
use std::path::Path;
use std::time::Duration;

use fridactl_common::error::{FridaError, Result};
use tracing::{debug, instrument, warn};

use super::shell::{describe_failure, shell_quote, ElevatedShell};

/// The process this manager last launched. PIDs are best effort; `ps`
/// column layouts differ between toolbox and toybox builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisedProcess {
    pub pids: Vec<u32>,
    pub launch_command: String,
    pub process_name: String,
    pub confirmed: bool,
}

impl SupervisedProcess {
    pub fn new(launch_command: impl Into<String>, process_name: impl Into<String>) -> Self {
        Self {
            pids: Vec::new(),
            launch_command: launch_command.into(),
            process_name: process_name.into(),
            confirmed: false,
        }
    }

    /// Records the process-table lines that confirmed the launch.
    pub fn mark_confirmed(&mut self, lines: &[String]) {
        self.pids = parse_pids(lines);
        self.confirmed = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillOutcome {
    Killed,
    NonZero { exit_code: Option<i32>, stderr: String },
}

/// Starts `staged_path` in the background and returns the supervision
/// record. Only the wrapper's exit status is observed here.
#[instrument(skip(shell), fields(binary = %staged_path.display()))]
pub async fn launch<S: ElevatedShell>(
    shell: &S,
    staged_path: &Path,
    process_name: &str,
) -> Result<SupervisedProcess> {
    let command = format!("{} &", shell_quote(&staged_path.to_string_lossy()));
    let output = shell.run_detached(&command).await?;
    if !output.success() {
        return Err(FridaError::Privilege(describe_failure(&command, &output)));
    }
    debug!("Launch command accepted");
    Ok(SupervisedProcess::new(command, process_name))
}

/// One look at the process table. Returns the matching lines, empty when
/// nothing matches.
pub async fn query<S: ElevatedShell>(shell: &S, process_name: &str) -> Result<Vec<String>> {
    let command = format!("ps -A | grep {}", shell_quote(process_name));
    let output = shell.run(&command).await?;
    // grep exits 1 on no match; anything above that is a real failure.
    match output.exit_code {
        Some(0) | Some(1) => Ok(process_lines(&output.stdout)),
        _ => Err(FridaError::Privilege(describe_failure(&command, &output))),
    }
}

/// Polls the process table until `process_name` shows up, sleeping
/// `interval` between attempts. A failed attempt counts toward the limit.
#[instrument(skip(shell, interval))]
pub async fn confirm_running<S: ElevatedShell>(
    shell: &S,
    process_name: &str,
    max_attempts: u32,
    interval: Duration,
) -> Result<Vec<String>> {
    for attempt in 1..=max_attempts {
        match query(shell, process_name).await {
            Ok(lines) if !lines.is_empty() => {
                debug!("Found {} after {} attempt(s)", process_name, attempt);
                return Ok(lines);
            }
            Ok(_) => debug!("Attempt {}/{}: not running yet", attempt, max_attempts),
            Err(e) => warn!("Attempt {}/{}: process query failed: {}", attempt, max_attempts, e),
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(FridaError::ConfirmationTimeout {
        name: process_name.to_string(),
        attempts: max_attempts,
    })
}

/// Sends SIGKILL to every process named `process_name`.
#[instrument(skip(shell))]
pub async fn stop<S: ElevatedShell>(shell: &S, process_name: &str) -> Result<KillOutcome> {
    let command = format!("pkill -9 {}", shell_quote(process_name));
    let output = shell.run(&command).await?;
    if output.success() {
        Ok(KillOutcome::Killed)
    } else {
        debug!("{}", describe_failure(&command, &output));
        Ok(KillOutcome::NonZero {
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

// The grep itself can show up in the table it is filtering.
fn process_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| line.split_whitespace().last() != Some("grep"))
        .map(str::to_string)
        .collect()
}

/// PIDs from `ps -A` lines (`USER PID PPID ...`), skipping anything that
/// does not parse.
pub fn parse_pids(lines: &[String]) -> Vec<u32> {
    lines
        .iter()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|pid| pid.parse().ok())
        .collect()
}
