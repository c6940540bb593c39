//! macOS credential-dialog elevation via `osascript`.

use std::time::Duration;

use tokio::process::Command;

use crate::{bounded, command_failed, Elevate, ElevatedCommand, ElevationError};

const OSASCRIPT: &str = "osascript";

/// AppleScript error number for "User canceled."
const USER_CANCELED: &str = "-128";

/// Runs commands through the graphical administrator prompt.
///
/// The whole [`ElevatedCommand`] becomes one `do shell script` call, so the
/// user answers a single dialog titled after `app_name`.
#[derive(Debug, Clone)]
pub struct PromptElevator {
    app_name: String,
    timeout: Option<Duration>,
}

impl PromptElevator {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            timeout: None,
        }
    }

    /// Give up on the dialog after `timeout`. `None` (the default) waits for
    /// the user indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The AppleScript handed to `osascript -e`.
    pub fn script_for(&self, command: &ElevatedCommand) -> String {
        format!(
            "do shell script \"{}\" with administrator privileges with prompt \"{}\"",
            applescript_escape(&command.to_shell_line()),
            applescript_escape(&format!("{} wants to make changes.", self.app_name)),
        )
    }
}

impl Elevate for PromptElevator {
    async fn run(&self, command: &ElevatedCommand) -> Result<String, ElevationError> {
        let script = self.script_for(command);
        tracing::debug!(app = %self.app_name, command = %command, "Requesting administrator privileges");

        let mut child = Command::new(OSASCRIPT);
        child.arg("-e").arg(&script).kill_on_drop(true);

        let output = bounded(self.timeout, child.output())
            .await?
            .map_err(|source| ElevationError::Spawn {
                program: OSASCRIPT.to_string(),
                source,
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_user_cancel(&stderr) {
            tracing::warn!(app = %self.app_name, "Administrator prompt declined");
            return Err(ElevationError::Declined);
        }
        Err(command_failed(command.program(), &output))
    }
}

fn is_user_cancel(stderr: &str) -> bool {
    stderr.contains(USER_CANCELED) || stderr.contains("User canceled")
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Invocation;

    #[test]
    fn script_wraps_shell_line_and_names_app() {
        let elevator = PromptElevator::new("LightProxy");
        let cmd = ElevatedCommand::new(Invocation::new("chmod").arg("a+rx+s").quoted_arg("/h"));
        assert_eq!(
            elevator.script_for(&cmd),
            r#"do shell script "chmod a+rx+s \"/h\"" with administrator privileges with prompt "LightProxy wants to make changes.""#
        );
    }

    #[test]
    fn backslashes_survive_both_layers() {
        assert_eq!(applescript_escape(r#"a\"b"#), r#"a\\\"b"#);
    }

    #[test]
    fn cancel_is_recognised() {
        assert!(is_user_cancel("execution error: User canceled. (-128)"));
        assert!(!is_user_cancel("execution error: security: SecTrustSettingsSetTrustSettings (-60007)"));
    }

    #[test]
    fn timeout_defaults_to_unbounded() {
        let elevator = PromptElevator::new("LightProxy");
        assert!(elevator.timeout.is_none());
        let bounded = elevator.with_timeout(Some(Duration::from_secs(30)));
        assert_eq!(bounded.timeout, Some(Duration::from_secs(30)));
    }
}
