//! Core traits that decouple yabswitch from the concrete daemon binary and
//! from any transport mechanism.
//!
//! Every concrete backend (the yabai CLI, a Unix-socket listener, a test
//! harness, ...) implements one of these traits.  The
//! [`WindowSwitcher`](crate::switcher::WindowSwitcher) only depends on these
//! abstractions.

use crate::command::Command;
use std::sync::mpsc;

/// Captured output of one external-command invocation that did not hard-fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Advisory text the command printed on stderr despite exiting zero.
    ///
    /// Several daemon operations print such text on success; it is surfaced
    /// to the user but never treated as failure.
    pub fn warning(&self) -> Option<&str> {
        let trimmed = self.stderr.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }
}

/// Abstraction over running one external command and capturing its output.
///
/// An implementation might spawn the daemon's CLI, or it might replay
/// scripted output in tests.
///
/// # Contract
///
/// * `Err` is returned only when the program cannot be invoked or exits
///   non-zero; the error carries the raw diagnostic text.
/// * A zero exit with non-empty stderr is a *soft warning*: it comes back
///   as `Ok` with [`CommandOutput::warning`] set.
pub trait Executor {
    /// The error type produced by this executor.
    type Error: std::error::Error + Send + 'static;

    /// Run the external program with `args` and wait for it to exit.
    fn run(&self, args: &[String]) -> Result<CommandOutput, Self::Error>;
}

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, an in-memory
/// channel, ...) and forward parsed commands into the provided
/// [`mpsc::Sender`].  The engine does not know or care where commands come
/// from.
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
