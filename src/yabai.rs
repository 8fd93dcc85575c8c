//! [`Executor`] implementation backed by the yabai command-line interface,
//! plus the argument vocabulary for every query and mutation the engine
//! issues.
//!
//! State queries use `yabai -m query ... ` and print JSON on stdout;
//! mutations use `yabai -m window ...` / `yabai -m space ...`.  A non-zero
//! exit code is the hard-failure signal; advisory text on stderr with a zero
//! exit is passed through as a soft warning.
//!
//! No other module spawns processes.

use crate::traits::{CommandOutput, Executor};
use std::path::PathBuf;
use std::process::Command as Process;

/// Errors from invoking the daemon CLI.
#[derive(Debug, thiserror::Error)]
pub enum YabaiError {
    /// The program could not be started at all.
    #[error("failed to invoke {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The program ran but exited non-zero.
    #[error("{program} exited with status {status}: {diagnostic}")]
    Failed {
        program: String,
        status: i32,
        /// Raw stderr (or stdout when stderr is empty).
        diagnostic: String,
    },
}

/// Runs the yabai binary synchronously and captures its output.
pub struct YabaiExecutor {
    program: PathBuf,
}

impl YabaiExecutor {
    /// Create an executor for the given binary, typically `"yabai"`
    /// resolved through `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for YabaiExecutor {
    fn default() -> Self {
        Self::new("yabai")
    }
}

impl Executor for YabaiExecutor {
    type Error = YabaiError;

    fn run(&self, args: &[String]) -> Result<CommandOutput, YabaiError> {
        let program = self.program.display().to_string();
        let output = Process::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| YabaiError::Spawn { program: program.clone(), source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(YabaiError::Failed {
                program,
                status: output.status.code().unwrap_or(-1),
                diagnostic: diagnostic.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Argument lists for the daemon's query subcommands.
pub mod query {
    /// `-m query --windows`
    pub fn windows() -> Vec<String> {
        args(&["-m", "query", "--windows"])
    }

    /// `-m query --spaces [--display <n>]`
    pub fn spaces(display: Option<u32>) -> Vec<String> {
        let mut v = args(&["-m", "query", "--spaces"]);
        if let Some(d) = display {
            v.push("--display".into());
            v.push(d.to_string());
        }
        v
    }

    /// `-m query --displays`
    pub fn displays() -> Vec<String> {
        args(&["-m", "query", "--displays"])
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }
}

/// Argument lists for the daemon's mutating subcommands.
pub mod action {
    /// `-m window --focus <id>`
    pub fn focus_window(id: u32) -> Vec<String> {
        vec!["-m".into(), "window".into(), "--focus".into(), id.to_string()]
    }

    /// `-m window <id> --close`
    pub fn close_window(id: u32) -> Vec<String> {
        vec!["-m".into(), "window".into(), id.to_string(), "--close".into()]
    }

    /// `-m window <id> --space <index>`
    pub fn move_window(id: u32, space: u32) -> Vec<String> {
        vec![
            "-m".into(),
            "window".into(),
            id.to_string(),
            "--space".into(),
            space.to_string(),
        ]
    }

    /// `-m space --focus <index>`
    pub fn focus_space(index: u32) -> Vec<String> {
        vec!["-m".into(), "space".into(), "--focus".into(), index.to_string()]
    }

    /// `-m space --create`
    pub fn create_space() -> Vec<String> {
        vec!["-m".into(), "space".into(), "--create".into()]
    }

    /// `-m space <index> --destroy`
    pub fn destroy_space(index: u32) -> Vec<String> {
        vec!["-m".into(), "space".into(), index.to_string(), "--destroy".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_args() {
        assert_eq!(query::windows(), ["-m", "query", "--windows"]);
        assert_eq!(query::spaces(None), ["-m", "query", "--spaces"]);
        assert_eq!(
            query::spaces(Some(2)),
            ["-m", "query", "--spaces", "--display", "2"]
        );
        assert_eq!(query::displays(), ["-m", "query", "--displays"]);
    }

    #[test]
    fn action_args() {
        assert_eq!(action::focus_window(118), ["-m", "window", "--focus", "118"]);
        assert_eq!(action::close_window(118), ["-m", "window", "118", "--close"]);
        assert_eq!(
            action::move_window(118, 3),
            ["-m", "window", "118", "--space", "3"]
        );
        assert_eq!(action::focus_space(1), ["-m", "space", "--focus", "1"]);
        assert_eq!(action::create_space(), ["-m", "space", "--create"]);
        assert_eq!(action::destroy_space(4), ["-m", "space", "4", "--destroy"]);
    }

    #[test]
    fn captures_stdout_of_a_real_process() {
        let exec = YabaiExecutor::new("echo");
        let out = exec.run(&["hello".to_string()]).expect("echo should run");
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.warning().is_none());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let exec = YabaiExecutor::new("/nonexistent/definitely-not-a-binary");
        let err = exec.run(&[]).unwrap_err();
        assert!(matches!(err, YabaiError::Spawn { .. }));
    }

    #[test]
    fn nonzero_exit_is_a_hard_failure() {
        let exec = YabaiExecutor::new("false");
        let err = exec.run(&[]).unwrap_err();
        match err {
            YabaiError::Failed { status, .. } => assert_ne!(status, 0),
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
