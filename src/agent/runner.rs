//! Single invocation of the tutor CLI

use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;

use super::output::{AgentOutput, parse_output};
use crate::config::AgentConfig;
use crate::{Error, Result};

/// How a turn relates to the conversation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Start a new session with this system prompt
    Fresh { system_prompt: String },
    /// Continue an existing session
    Resume { session_id: String },
}

/// Build the CLI argument list for one turn
///
/// Arguments go straight to the program, so the prompt needs no quoting.
#[must_use]
pub fn build_args(config: &AgentConfig, prompt: &str, mode: &SessionMode) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        prompt.to_string(),
        "--output-format".to_string(),
        "json".to_string(),
        "--model".to_string(),
        config.model.clone(),
        "--tools".to_string(),
        config.tools.join(","),
        "--allowedTools".to_string(),
    ];
    args.extend(config.tools.iter().cloned());

    match mode {
        SessionMode::Fresh { system_prompt } => {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }
        SessionMode::Resume { session_id } => {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }
    }

    args
}

/// Run the CLI once and interpret its output
///
/// The child is killed if it outlives `config.timeout`.
///
/// # Errors
///
/// Returns error if the process cannot be spawned, times out, exits
/// unsuccessfully, or reports an error result
pub async fn run_turn(config: &AgentConfig, args: Vec<String>) -> Result<AgentOutput> {
    let mut command = Command::new(&config.binary);
    command
        .args(args)
        .current_dir(&config.work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for var in &config.unset_env {
        command.env_remove(var);
    }

    let child = command
        .spawn()
        .map_err(|e| Error::AgentSpawn(e.to_string()))?;

    tracing::debug!(binary = %config.binary, pid = ?child.id(), "agent spawned");

    // Dropping the wait future on timeout drops the child, which kills it
    let output = timeout(config.timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            tracing::warn!(timeout = ?config.timeout, "agent timed out, killed");
            Error::AgentTimeout(config.timeout)
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() && !stdout.trim().is_empty() {
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %stderr.trim(), "agent stderr");
        }
        return parse_output(&stdout);
    }

    let stderr = stderr.trim();
    if stderr.is_empty() {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        Err(Error::Agent(format!("agent exited with code {code}")))
    } else {
        Err(Error::Agent(stderr.to_string()))
    }
}
