//! Commands and types used throughout yabswitch.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every action the engine accepts from the
//! interactive surface, [`UiEvent`] / [`ActionReport`] describe everything
//! the engine emits back, and [`RankingPolicy`] selects how search results
//! are ordered.
//!
//! Front ends forward raw arguments; the daemon parses policy strings
//! (e.g. "usage", "recency-pair") case-insensitively.

use crate::model::{Application, Window};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How filtered search results are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RankingPolicy {
    /// Descending by last-focused timestamp; never-focused windows keep
    /// their filtered order at the end.
    Usage,
    /// The most recently focused window first, the one before that second,
    /// everything else alphabetically by application name.
    RecencyPair,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        RankingPolicy::Usage
    }
}

impl fmt::Display for RankingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingPolicy::Usage => write!(f, "usage"),
            RankingPolicy::RecencyPair => write!(f, "recency-pair"),
        }
    }
}

/// Parse a policy string (case-insensitive; accepts "usage", "recency-pair",
/// "RecencyPair", etc.).
fn parse_policy(s: &str) -> Option<RankingPolicy> {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect();
    match normalized.as_str() {
        "usage" => Some(RankingPolicy::Usage),
        "recencypair" | "recency" => Some(RankingPolicy::RecencyPair),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for RankingPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_policy(&s).ok_or_else(|| DeError::custom(format!("invalid ranking policy: {:?}", s)))
    }
}

/// Every action the engine can perform.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by the
/// [`WindowSwitcher`](crate::switcher::WindowSwitcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Filter and rank windows and applications against a free-text query.
    ///
    /// An empty query yields the full inventory.  A burst of search
    /// commands is collapsed to the newest one before any work happens.
    Search { query: String },

    /// Focus the window with the given daemon id and record a usage
    /// timestamp for it.
    FocusWindow(u32),

    /// Close the window with the given daemon id.
    CloseWindow(u32),

    /// Consolidate every window of the triggering window's application into
    /// a single space, creating an empty space if none exists.
    Aggregate(u32),

    /// Spread the given display's windows one-per-space across existing and
    /// newly created spaces.
    Disperse(u32),

    /// Destroy every space that currently holds no windows.
    Reclaim,

    /// Re-query the daemon and the application directories, then persist
    /// the fresh snapshot.  Duplicate queued refreshes collapse into one.
    Refresh,

    /// Select the ranking policy used for subsequent searches.
    SetPolicy(RankingPolicy),
}

/// One entry of a ranked result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RankedItem {
    Window(Window),
    Application(Application),
}

/// What happened to a dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionOutcome {
    /// Every step ran.
    Completed { steps: usize },
    /// There was nothing to do.  Distinct from failure.
    NoOp { reason: String },
    /// A step failed; later steps were not attempted and earlier ones are
    /// not rolled back.
    Aborted {
        /// Zero-based index of the failing step.
        step: usize,
        /// Human-readable description of the failing step.
        step_desc: String,
        /// Raw diagnostic text from the daemon.
        diagnostic: String,
    },
}

/// Outcome of one user-visible action, suitable for a transient
/// notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    /// Name of the action ("disperse", "aggregate", ...).
    pub action: String,
    pub outcome: ActionOutcome,
    /// Advisory daemon output from steps that succeeded (zero exit,
    /// non-empty stderr).
    pub warnings: Vec<String>,
}

impl ActionReport {
    pub fn no_op(action: &str, reason: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            outcome: ActionOutcome::NoOp { reason: reason.into() },
            warnings: Vec::new(),
        }
    }

    /// Whether the action ran to completion.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Completed { .. })
    }
}

/// Events sent from the engine to the interactive surface over an
/// [`mpsc`](std::sync::mpsc) channel.
///
/// The switcher holds an `Option<mpsc::Sender<UiEvent>>`.  Any listener can
/// receive these events without being owned by the switcher; the binary
/// forwards them as newline-delimited JSON on stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UiEvent {
    /// A fresh ranked result set for the most recent query.
    Ranked(Vec<RankedItem>),
    /// The outcome of an action, for a transient notification.
    Report(ActionReport),
}
