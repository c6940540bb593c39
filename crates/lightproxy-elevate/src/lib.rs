//! Privilege-escalated command execution.
//!
//! Two elevators cover the supported platforms:
//! - **macOS**: [`PromptElevator`] runs the command line through
//!   `osascript ... with administrator privileges`, which shows the system
//!   credential dialog under the application's name.
//! - **Everything else**: [`DirectElevator`] spawns the programs as plain
//!   child processes and relies on the caller already holding (or being
//!   granted) elevation.
//!
//! The prompt is an external suspension point: without a configured timeout
//! a user who never answers the dialog blocks the caller indefinitely.

mod direct;
mod prompt;

use std::fmt;
use std::future::Future;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

pub use direct::DirectElevator;
pub use prompt::PromptElevator;

#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    #[error("administrator privilege prompt was declined")]
    Declined,
    #[error("administrator privilege prompt timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with code {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },
}

/// Runs commands with administrator rights.
pub trait Elevate: Send + Sync {
    /// Runs every step of `command` in order, stopping at the first failure.
    /// Resolves to the collected stdout.
    fn run(
        &self,
        command: &ElevatedCommand,
    ) -> impl Future<Output = Result<String, ElevationError>> + Send;
}

impl<E: Elevate> Elevate for Arc<E> {
    fn run(
        &self,
        command: &ElevatedCommand,
    ) -> impl Future<Output = Result<String, ElevationError>> + Send {
        (**self).run(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    Quoted(String),
}

impl Arg {
    fn value(&self) -> &str {
        match self {
            Arg::Plain(v) | Arg::Quoted(v) => v,
        }
    }
}

/// One program invocation inside an [`ElevatedCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<Arg>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument. Rendered bare in a shell line unless it contains
    /// characters the shell would interpret.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// Appends an argument that is always double-quoted in a shell line.
    pub fn quoted_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Quoted(arg.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument values as passed to the process, without shell quoting.
    pub fn arg_values(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(Arg::value)
    }

    fn to_shell(&self) -> String {
        let mut line = shell_word(&self.program);
        for arg in &self.args {
            line.push(' ');
            match arg {
                Arg::Plain(v) => line.push_str(&shell_word(v)),
                Arg::Quoted(v) => line.push_str(&double_quote(v)),
            }
        }
        line
    }
}

/// A sequence of invocations that must all succeed, in order.
///
/// Rendered as a single `a && b` shell line for the prompt elevator so the
/// user is asked for credentials once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatedCommand {
    steps: Vec<Invocation>,
}

impl ElevatedCommand {
    pub fn new(first: Invocation) -> Self {
        Self { steps: vec![first] }
    }

    pub fn and_then(mut self, next: Invocation) -> Self {
        self.steps.push(next);
        self
    }

    pub fn steps(&self) -> &[Invocation] {
        &self.steps
    }

    /// Program of the first step; names the command in errors.
    pub fn program(&self) -> &str {
        self.steps.first().map(Invocation::program).unwrap_or_default()
    }

    pub fn to_shell_line(&self) -> String {
        self.steps
            .iter()
            .map(Invocation::to_shell)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

impl fmt::Display for ElevatedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_line())
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '+' | '=' | ',' | '@')
}

fn shell_word(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        value.to_string()
    } else {
        double_quote(value)
    }
}

/// POSIX double-quoting: only `"`, `\`, `$` and backtick stay special.
fn double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Awaits `fut`, failing with [`ElevationError::TimedOut`] once `limit`
/// elapses. `None` waits forever.
pub(crate) async fn bounded<F, T>(limit: Option<Duration>, fut: F) -> Result<T, ElevationError>
where
    F: Future<Output = T>,
{
    match limit {
        None => Ok(fut.await),
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ElevationError::TimedOut(limit)),
    }
}

pub(crate) fn command_failed(program: &str, output: &Output) -> ElevationError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    ElevationError::CommandFailed {
        program: program.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: stderr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_args_render_bare() {
        let cmd = ElevatedCommand::new(Invocation::new("chmod").args(["a+rx+s", "/usr/bin/x"]));
        assert_eq!(cmd.to_shell_line(), "chmod a+rx+s /usr/bin/x");
    }

    #[test]
    fn quoted_args_always_quote() {
        let cmd = ElevatedCommand::new(
            Invocation::new("certutil")
                .args(["-enterprise", "-f", "-v", "-AddStore"])
                .quoted_arg("Root")
                .quoted_arg("/tmp/cert.pem"),
        );
        assert_eq!(
            cmd.to_shell_line(),
            r#"certutil -enterprise -f -v -AddStore "Root" "/tmp/cert.pem""#
        );
    }

    #[test]
    fn unsafe_characters_are_escaped() {
        let inv = Invocation::new("echo").arg("a b").quoted_arg(r#"x"$`\y"#);
        assert_eq!(inv.to_shell(), r#"echo "a b" "x\"\$\`\\y""#);
    }

    #[test]
    fn steps_join_with_and() {
        let cmd = ElevatedCommand::new(Invocation::new("chown").arg("root:admin").quoted_arg("/h"))
            .and_then(Invocation::new("chmod").arg("a+rx+s").quoted_arg("/h"));
        assert_eq!(
            cmd.to_string(),
            r#"chown root:admin "/h" && chmod a+rx+s "/h""#
        );
        assert_eq!(cmd.program(), "chown");
        assert_eq!(cmd.steps().len(), 2);
    }

    #[test]
    fn arg_values_are_unquoted() {
        let inv = Invocation::new("security").arg("-d").quoted_arg("/a b/c.pem");
        let values: Vec<&str> = inv.arg_values().collect();
        assert_eq!(values, vec!["-d", "/a b/c.pem"]);
    }

    #[tokio::test]
    async fn bounded_times_out() {
        let limit = Duration::from_millis(20);
        let result = bounded(Some(limit), tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(ElevationError::TimedOut(d)) if d == limit));
    }

    #[tokio::test]
    async fn bounded_without_limit_waits() {
        let result = bounded(None, async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
