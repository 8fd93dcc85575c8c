//! Daemon state snapshots and the persisted local cache.
//!
//! Each `refresh_*` operation runs one query through the [`Executor`] and
//! parses its stdout into the typed [`Snapshot`].  A parse failure (or a
//! failed invocation) degrades the affected collection to empty and logs a
//! diagnostic; a transient daemon hiccup must not take down the whole
//! ranked view.
//!
//! The cache file holds the last window and application snapshots together
//! with the usage record and the chosen ranking policy, so a fresh start
//! can show results instantly while a real refresh runs.  Its age drives
//! the staleness check on activation.

use crate::command::RankingPolicy;
use crate::model::{Application, Snapshot, Space, Window};
use crate::rank::UsageRecord;
use crate::traits::Executor;
use crate::yabai::query;
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Errors from reading or writing the cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    pub saved_at_ms: u64,
    pub windows: Vec<Window>,
    pub applications: Vec<Application>,
    #[serde(default)]
    pub usage: UsageRecord,
    #[serde(default)]
    pub policy: RankingPolicy,
}

/// One "refresh in flight" flag per snapshot kind; a request arriving while
/// the same kind is already refreshing is dropped, the in-flight result
/// serves both.
#[derive(Debug, Default)]
struct InFlight {
    windows: Cell<bool>,
    spaces: Cell<bool>,
    displays: Cell<bool>,
    applications: Cell<bool>,
}

/// Typed snapshots of daemon and filesystem state, plus the persisted
/// cache.
pub struct StateRepository<E: Executor> {
    exec: E,
    pub snapshot: Snapshot,
    cache_path: PathBuf,
    app_dirs: Vec<PathBuf>,
    in_flight: InFlight,
}

impl<E: Executor> StateRepository<E> {
    pub fn new(exec: E, cache_path: PathBuf, app_dirs: Vec<PathBuf>) -> Self {
        Self {
            exec,
            snapshot: Snapshot::default(),
            cache_path,
            app_dirs,
            in_flight: InFlight::default(),
        }
    }

    /// The executor, shared with the dispatcher so plan steps and queries
    /// go through the same seam.
    pub fn executor(&self) -> &E {
        &self.exec
    }

    /// Location of the persisted cache file.
    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    /// Pre-populate the snapshot from a cached state for instant display.
    pub fn seed(&mut self, cached: &CachedState) {
        self.snapshot.windows = cached.windows.clone();
        self.snapshot.applications = cached.applications.clone();
    }

    pub fn refresh_windows(&mut self) {
        if self.in_flight.windows.replace(true) {
            debug!("window refresh already in flight");
            return;
        }
        self.snapshot.windows = self.query_collection("windows", query::windows());
        self.in_flight.windows.set(false);
    }

    /// Refresh spaces, optionally restricted to one display.  A filtered
    /// refresh replaces only that display's spaces in the snapshot.
    pub fn refresh_spaces(&mut self, display: Option<u32>) {
        if self.in_flight.spaces.replace(true) {
            debug!("space refresh already in flight");
            return;
        }
        let fresh: Vec<Space> = self.query_collection("spaces", query::spaces(display));
        match display {
            Some(d) => {
                self.snapshot.spaces.retain(|s| s.display != d);
                self.snapshot.spaces.extend(fresh);
                self.snapshot.spaces.sort_by_key(|s| s.index);
            }
            None => self.snapshot.spaces = fresh,
        }
        self.in_flight.spaces.set(false);
    }

    pub fn refresh_displays(&mut self) {
        if self.in_flight.displays.replace(true) {
            debug!("display refresh already in flight");
            return;
        }
        self.snapshot.displays = self.query_collection("displays", query::displays());
        self.in_flight.displays.set(false);
    }

    /// Re-scan the application directories.
    ///
    /// Independent of daemon state; an application is listed whether or not
    /// it has open windows.  Unreadable directories are skipped with a
    /// diagnostic.
    pub fn refresh_applications(&mut self) {
        if self.in_flight.applications.replace(true) {
            debug!("application refresh already in flight");
            return;
        }
        let mut apps: Vec<Application> = Vec::new();
        for dir in &self.app_dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("skipping application directory {}: {}", dir.display(), e);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let is_bundle = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("app"))
                    .unwrap_or(false);
                if !is_bundle {
                    continue;
                }
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    apps.push(Application { name: name.to_string(), path });
                }
            }
        }
        apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        info!("scanned {} applications", apps.len());
        self.snapshot.applications = apps;
        self.in_flight.applications.set(false);
    }

    /// Refresh every snapshot kind.
    pub fn refresh_all(&mut self) {
        self.refresh_windows();
        self.refresh_spaces(None);
        self.refresh_displays();
        self.refresh_applications();
    }

    /// Write the current snapshot plus usage and policy to the cache file.
    pub fn persist(&self, usage: &UsageRecord, policy: RankingPolicy) -> Result<(), CacheError> {
        let state = CachedState {
            saved_at_ms: now_ms(),
            windows: self.snapshot.windows.clone(),
            applications: self.snapshot.applications.clone(),
            usage: usage.clone(),
            policy,
        };
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&state)?;
        std::fs::write(&self.cache_path, json)?;
        debug!("persisted cache to {}", self.cache_path.display());
        Ok(())
    }

    /// Load the last persisted state and how old it is.
    ///
    /// `None` when there is no usable cache; the caller then starts from an
    /// empty snapshot and refreshes immediately.
    pub fn load_cache(&self) -> Option<(CachedState, Duration)> {
        let contents = match std::fs::read_to_string(&self.cache_path) {
            Ok(c) => c,
            Err(e) => {
                info!("no cache at {} ({})", self.cache_path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<CachedState>(&contents) {
            Ok(state) => {
                let age = Duration::from_millis(now_ms().saturating_sub(state.saved_at_ms));
                Some((state, age))
            }
            Err(e) => {
                error!("discarding unreadable cache {}: {}", self.cache_path.display(), e);
                None
            }
        }
    }

    /// Run one query and parse its output, degrading to an empty collection
    /// on any failure.
    fn query_collection<T: DeserializeOwned>(&self, what: &str, args: Vec<String>) -> Vec<T> {
        let out = match self.exec.run(&args) {
            Ok(out) => out,
            Err(e) => {
                error!("{} query failed: {}", what, e);
                return Vec::new();
            }
        };
        if let Some(w) = out.warning() {
            debug!("{} query warning: {}", what, w);
        }
        match serde_json::from_str(&out.stdout) {
            Ok(v) => v,
            Err(e) => {
                error!("failed to parse {} query output: {}", what, e);
                Vec::new()
            }
        }
    }
}

//  Tests
