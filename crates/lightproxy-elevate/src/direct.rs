//! Plain child-process execution for platforms without a prompt layer.

use tokio::process::Command;

use crate::{command_failed, Elevate, ElevatedCommand, ElevationError, Invocation};

/// Keeps `certutil` and friends from flashing a console window.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs each step as a direct child process.
///
/// Assumes the current process already holds administrator rights or that
/// the OS grants them on launch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectElevator;

impl DirectElevator {
    pub fn new() -> Self {
        Self
    }
}

impl Elevate for DirectElevator {
    async fn run(&self, command: &ElevatedCommand) -> Result<String, ElevationError> {
        let mut stdout = String::new();
        for step in command.steps() {
            stdout.push_str(&run_step(step).await?);
        }
        Ok(stdout)
    }
}

async fn run_step(step: &Invocation) -> Result<String, ElevationError> {
    tracing::debug!(program = step.program(), "Running elevated command");

    let mut child = Command::new(step.program());
    child.args(step.arg_values());
    #[cfg(windows)]
    child.creation_flags(CREATE_NO_WINDOW);

    let output = child
        .output()
        .await
        .map_err(|source| ElevationError::Spawn {
            program: step.program().to_string(),
            source,
        })?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(program = step.program(), output = %stdout.trim(), "Command finished");
        Ok(stdout)
    } else {
        let err = command_failed(step.program(), &output);
        tracing::warn!(error = %err, "Elevated command failed");
        Err(err)
    }
}
