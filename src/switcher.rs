//! The main orchestrator that ties the state repository, the allocation
//! planner, the dispatcher, and the ranking engine together.
//!
//! [`WindowSwitcher`] reacts to [`Command`]s by computing plans over the
//! current snapshot, executing them through the shared [`Executor`], and
//! emitting [`UiEvent`]s for the interactive surface: a ranked result set
//! after anything that could change it, and an [`ActionReport`] after every
//! action.
//!
//! Command processing is strictly sequential; the only concurrency in the
//! system is the transport threads feeding the command channel.

use crate::command::{ActionOutcome, ActionReport, Command, RankingPolicy, UiEvent};
use crate::dispatch::Dispatcher;
use crate::plan::{self, Plan};
use crate::rank::{self, UsageRecord};
use crate::repo::{now_ms, StateRepository};
use crate::traits::Executor;
use log::{debug, info, warn};
use std::sync::mpsc;
use std::time::Duration;

/// Possible errors from the switcher.
#[derive(Debug, thiserror::Error)]
pub enum SwitcherError {
    /// The persisted cache could not be written.  The in-memory state is
    /// still consistent; the next successful persist heals it.
    #[error("cache error: {0}")]
    Cache(String),
}

/// Orchestrates searches and space/window actions.
///
/// The switcher is generic over any [`Executor`] implementation, making it
/// independent of the concrete daemon binary.
///
/// # Typical usage
///
/// ```ignore
/// let repo = StateRepository::new(YabaiExecutor::default(), cache_path, app_dirs);
/// let mut switcher = WindowSwitcher::new(repo, RankingPolicy::Usage, staleness);
/// switcher.activate()?;
/// switcher.handle(Command::Search { query: "saf".into() })?;
/// ```
pub struct WindowSwitcher<E: Executor> {
    repo: StateRepository<E>,
    usage: UsageRecord,
    policy: RankingPolicy,
    staleness: Duration,
    ui_tx: Option<mpsc::Sender<UiEvent>>,
    last_query: String,
}

impl<E: Executor> WindowSwitcher<E> {
    pub fn new(repo: StateRepository<E>, policy: RankingPolicy, staleness: Duration) -> Self {
        Self {
            repo,
            usage: UsageRecord::default(),
            policy,
            staleness,
            ui_tx: None,
            last_query: String::new(),
        }
    }

    /// Attach the UI event channel.
    ///
    /// The receiver end can be owned by any independent listener; the
    /// binary forwards events to stdout as newline-delimited JSON.
    pub fn set_ui(&mut self, tx: mpsc::Sender<UiEvent>) {
        self.ui_tx = Some(tx);
    }

    /// Warm start: serve the persisted cache immediately, then refresh when
    /// it is stale or missing.
    ///
    /// The cached ranking policy wins over the configured default; it is
    /// the user's last explicit choice.
    pub fn activate(&mut self) -> Result<(), SwitcherError> {
        let stale = match self.repo.load_cache() {
            Some((state, age)) => {
                info!(
                    "cache: {} windows, {} applications, {}s old",
                    state.windows.len(),
                    state.applications.len(),
                    age.as_secs()
                );
                self.usage = state.usage.clone();
                self.policy = state.policy;
                self.repo.seed(&state);
                self.emit_ranked();
                age > self.staleness
            }
            None => true,
        };

        if stale {
            debug!("cache stale or missing, refreshing");
            self.repo.refresh_all();
            self.emit_ranked();
            self.persist()?;
        }
        Ok(())
    }

    /// Process a single [`Command`].
    ///
    /// Action failures are not errors: they surface as an
    /// [`ActionReport`] on the UI channel.  `Err` only means the cache
    /// could not be persisted afterwards.
    pub fn handle(&mut self, cmd: Command) -> Result<(), SwitcherError> {
        match cmd {
            Command::Search { query } => {
                debug!("search {:?}", query);
                self.last_query = query;
                self.emit_ranked();
                Ok(())
            }

            Command::FocusWindow(id) => {
                info!("switch to window {}", id);
                let plan = plan::focus_window(id);
                let report = Dispatcher::new(self.repo.executor()).execute(&plan);
                if report.succeeded() {
                    self.usage.record(id, now_ms());
                }
                self.finish_action(report)
            }

            Command::CloseWindow(id) => {
                info!("close window {}", id);
                let plan = plan::close_window(id);
                let report = Dispatcher::new(self.repo.executor()).execute(&plan);
                self.finish_action(report)
            }

            Command::Aggregate(id) => {
                info!("aggregate around window {}", id);
                let plan = plan::aggregate(&self.repo.snapshot, id);
                if plan.is_empty() {
                    let reason = if self.repo.snapshot.window_by_id(id).is_none() {
                        "window no longer exists"
                    } else {
                        "space holds fewer than two windows"
                    };
                    return self.finish_action(ActionReport::no_op("aggregate", reason));
                }
                self.execute(plan)
            }

            Command::Disperse(display) => {
                info!("disperse display {}", display);
                let plan = plan::disperse(&self.repo.snapshot, display);
                if plan.is_empty() {
                    let known = self.repo.snapshot.displays.is_empty()
                        || self.repo.snapshot.displays.iter().any(|d| d.index == display);
                    let reason =
                        if known { "no windows to disperse" } else { "no such display" };
                    return self.finish_action(ActionReport::no_op("disperse", reason));
                }
                self.execute(plan)
            }

            Command::Reclaim => {
                info!("reclaim empty spaces");
                let plan = plan::reclaim(&self.repo.snapshot);
                if plan.is_empty() {
                    return self.finish_action(ActionReport::no_op("reclaim", "no empty spaces"));
                }
                self.execute(plan)
            }

            Command::Refresh => {
                debug!("refresh");
                self.repo.refresh_all();
                self.emit_ranked();
                self.persist()
            }

            Command::SetPolicy(policy) => {
                info!("ranking policy: {}", policy);
                self.policy = policy;
                self.emit_ranked();
                self.persist()
            }
        }
    }

    /// Current ranked result set for the most recent query.
    pub fn ranked(&self) -> Vec<crate::command::RankedItem> {
        rank::search(&self.repo.snapshot, &self.last_query, self.policy, &self.usage)
    }

    fn execute(&mut self, plan: Plan) -> Result<(), SwitcherError> {
        let report = Dispatcher::new(self.repo.executor()).execute(&plan);
        self.finish_action(report)
    }

    /// Common tail of every action: refresh after applied steps, emit the
    /// report and the (possibly changed) ranked set, persist.
    fn finish_action(&mut self, report: ActionReport) -> Result<(), SwitcherError> {
        let applied = !matches!(report.outcome, ActionOutcome::NoOp { .. });
        if !report.succeeded() {
            warn!("{}: {:?}", report.action, report.outcome);
        }
        if applied {
            // The daemon's state changed (possibly partially); trust only a
            // fresh query.
            self.repo.refresh_all();
        }
        self.emit(UiEvent::Report(report));
        self.emit_ranked();
        if applied {
            self.persist()?;
        }
        Ok(())
    }

    fn emit_ranked(&self) {
        self.emit(UiEvent::Ranked(self.ranked()));
    }

    fn emit(&self, event: UiEvent) {
        if let Some(tx) = &self.ui_tx {
            let _ = tx.send(event);
        }
    }

    fn persist(&self) -> Result<(), SwitcherError> {
        self.repo
            .persist(&self.usage, self.policy)
            .map_err(|e| SwitcherError::Cache(e.to_string()))
    }
}

//  Tests
