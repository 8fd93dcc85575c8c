//! Typed snapshots of window-manager state.
//!
//! Everything the engine knows about the outside world lives in a
//! [`Snapshot`]: windows, spaces (virtual desktops), displays, and the
//! installed applications discovered by scanning the filesystem.
//!
//! The window/space/display types deserialize directly from the JSON the
//! daemon prints on `query` subcommands.  Identity is always the id or index
//! assigned by the daemon; the engine never invents one.  A window that a
//! previous snapshot contained may be gone in the next one, and space
//! indices are reassigned whenever a space is destroyed, so nothing in here
//! should be trusted across a mutation without a fresh query.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A window rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// One window as reported by the daemon.
///
/// Unknown JSON keys are ignored so the daemon may evolve its output without
/// breaking the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Opaque handle assigned by the daemon.
    pub id: u32,
    /// Process id of the owning application.
    #[serde(default)]
    pub pid: i32,
    /// Application name (e.g. `"Safari"`).
    pub app: String,
    /// Window title.
    #[serde(default)]
    pub title: String,
    /// Index of the space this window is on.
    #[serde(default)]
    pub space: u32,
    /// Index of the display this window is on.
    #[serde(default)]
    pub display: u32,
    #[serde(default)]
    pub frame: Frame,
    #[serde(default, rename = "has-focus")]
    pub has_focus: bool,
    /// Windows in native fullscreen cannot be relocated between spaces.
    #[serde(default, rename = "is-native-fullscreen")]
    pub is_native_fullscreen: bool,
}

/// One space (virtual desktop) as reported by the daemon.
///
/// `index` is 1-based and dense; the daemon reassigns indices when a space
/// is destroyed, so a captured index is stale after any destroy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub index: u32,
    /// Window ids on this space, in the daemon's order.
    #[serde(default)]
    pub windows: Vec<u32>,
    /// Index of the display hosting this space.
    #[serde(default)]
    pub display: u32,
}

/// One physical display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub id: u32,
    pub index: u32,
    #[serde(default)]
    pub frame: Frame,
    /// Indices of the spaces hosted on this display.
    #[serde(default)]
    pub spaces: Vec<u32>,
}

/// An installed application found by scanning application directories.
///
/// Unrelated to whether the application currently has any open windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub path: PathBuf,
}

/// The engine's current view of the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub windows: Vec<Window>,
    pub spaces: Vec<Space>,
    pub displays: Vec<Display>,
    pub applications: Vec<Application>,
}

impl Snapshot {
    /// Windows on the given display, in snapshot order.
    pub fn windows_on_display(&self, display: u32) -> impl Iterator<Item = &Window> {
        self.windows.iter().filter(move |w| w.display == display)
    }

    /// Spaces on the given display, ordered by index.
    pub fn spaces_on_display(&self, display: u32) -> Vec<&Space> {
        let mut spaces: Vec<&Space> =
            self.spaces.iter().filter(|s| s.display == display).collect();
        spaces.sort_by_key(|s| s.index);
        spaces
    }

    pub fn window_by_id(&self, id: u32) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn space_by_index(&self, index: u32) -> Option<&Space> {
        self.spaces.iter().find(|s| s.index == index)
    }
}
