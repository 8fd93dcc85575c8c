//! Step-by-step execution of a [`Plan`] against the daemon.
//!
//! Steps run strictly in order.  The daemon is not transactional and other
//! actors may mutate its state at any time, so the dispatcher's only
//! discipline is to re-query before trusting an index that an earlier step
//! may have invalidated: after every `create space` it re-reads the space
//! list to learn the new space's index, and between chained `destroy space`
//! steps it verifies the next target is still empty.
//!
//! A hard failure aborts the remaining steps and is reported together with
//! the failing step and the daemon's raw diagnostic.  Already-applied steps
//! are never rolled back; partial application is a visible outcome.

use crate::command::{ActionOutcome, ActionReport};
use crate::model::Space;
use crate::plan::{Plan, SpaceTarget, Step};
use crate::traits::Executor;
use crate::yabai::{action, query};
use log::{debug, warn};

/// Executes plans through an [`Executor`].
pub struct Dispatcher<'a, E: Executor> {
    exec: &'a E,
}

impl<'a, E: Executor> Dispatcher<'a, E> {
    pub fn new(exec: &'a E) -> Self {
        Self { exec }
    }

    /// Apply every step of `plan` in order and report the outcome.
    pub fn execute(&self, plan: &Plan) -> ActionReport {
        if plan.is_empty() {
            return ActionReport::no_op(plan.action, "nothing to do");
        }

        let mut warnings = Vec::new();
        // Indices of spaces created by this plan, in creation order.
        let mut created: Vec<u32> = Vec::new();
        let mut destroyed_any = false;

        for (i, step) in plan.steps.iter().enumerate() {
            debug!("{}: step {}/{}: {}", plan.action, i + 1, plan.steps.len(), step);
            if let Err(diagnostic) =
                self.apply(step, &mut created, &mut destroyed_any, &mut warnings)
            {
                warn!("{}: step {} failed: {}", plan.action, step, diagnostic);
                return ActionReport {
                    action: plan.action.to_string(),
                    outcome: ActionOutcome::Aborted {
                        step: i,
                        step_desc: step.to_string(),
                        diagnostic,
                    },
                    warnings,
                };
            }
        }

        ActionReport {
            action: plan.action.to_string(),
            outcome: ActionOutcome::Completed { steps: plan.steps.len() },
            warnings,
        }
    }

    fn apply(
        &self,
        step: &Step,
        created: &mut Vec<u32>,
        destroyed_any: &mut bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), String> {
        match step {
            Step::MoveWindow { window, to } => {
                let index = resolve(*to, created)?;
                self.run(action::move_window(*window, index), warnings)
            }
            Step::FocusSpace(to) => {
                let index = resolve(*to, created)?;
                self.run(action::focus_space(index), warnings)
            }
            Step::FocusWindow(id) => self.run(action::focus_window(*id), warnings),
            Step::CloseWindow(id) => self.run(action::close_window(*id), warnings),
            Step::CreateSpace => {
                self.run(action::create_space(), warnings)?;
                let index = self.discover_created(created)?;
                debug!("created space resolved to index {}", index);
                created.push(index);
                Ok(())
            }
            Step::DestroySpace { index } => {
                let target = if *destroyed_any {
                    // Earlier destroys renumbered the space list; check the
                    // captured index against a fresh query.
                    self.reconfirm_empty(*index)?
                } else {
                    Some(*index)
                };
                match target {
                    Some(index) => {
                        self.run(action::destroy_space(index), warnings)?;
                        *destroyed_any = true;
                        Ok(())
                    }
                    None => {
                        warn!("destroy space {}: no longer empty, skipping", index);
                        warnings.push(format!("space {} was no longer empty; skipped", index));
                        Ok(())
                    }
                }
            }
        }
    }

    /// Run one daemon command, collecting advisory stderr as a warning.
    fn run(&self, args: Vec<String>, warnings: &mut Vec<String>) -> Result<(), String> {
        match self.exec.run(&args) {
            Ok(out) => {
                if let Some(w) = out.warning() {
                    warnings.push(w.to_string());
                }
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    fn query_spaces(&self) -> Result<Vec<Space>, String> {
        let out = self.exec.run(&query::spaces(None)).map_err(|e| e.to_string())?;
        serde_json::from_str(&out.stdout).map_err(|e| format!("unreadable space list: {}", e))
    }

    /// Find the space a `create space` step just produced: the
    /// highest-indexed empty space no earlier creation claimed.
    fn discover_created(&self, created: &[u32]) -> Result<u32, String> {
        let spaces = self.query_spaces()?;
        spaces
            .iter()
            .filter(|s| s.windows.is_empty() && !created.contains(&s.index))
            .map(|s| s.index)
            .max()
            .ok_or_else(|| "created space did not appear in a fresh query".to_string())
    }

    /// Re-check a destroy target after earlier destructions.  Returns the
    /// index to destroy, a substitute (the current highest-indexed empty
    /// space that is not its display's only space), or `None` when no
    /// empty space remains.
    fn reconfirm_empty(&self, index: u32) -> Result<Option<u32>, String> {
        let spaces = self.query_spaces()?;
        if spaces.iter().any(|s| s.index == index && s.windows.is_empty()) {
            return Ok(Some(index));
        }
        let substitute = spaces
            .iter()
            .filter(|s| {
                s.windows.is_empty()
                    && spaces.iter().filter(|o| o.display == s.display).count() > 1
            })
            .map(|s| s.index)
            .max();
        Ok(substitute)
    }
}

fn resolve(target: SpaceTarget, created: &[u32]) -> Result<u32, String> {
    match target {
        SpaceTarget::Index(n) => Ok(n),
        SpaceTarget::Created(slot) => created
            .get(slot)
            .copied()
            .ok_or_else(|| format!("step depends on created space #{} which never resolved", slot + 1)),
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CommandOutput;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct ScriptErr(String);

    /// Replays a scripted sequence of results and records every argument
    /// list it was invoked with.
    #[derive(Default)]
    struct ScriptedExec {
        script: RefCell<VecDeque<Result<CommandOutput, String>>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedExec {
        fn push_ok(&mut self, stdout: &str, stderr: &str) {
            self.script.borrow_mut().push_back(Ok(CommandOutput {
                stdout: stdout.into(),
                stderr: stderr.into(),
            }));
        }

        fn push_err(&mut self, diagnostic: &str) {
            self.script.borrow_mut().push_back(Err(diagnostic.into()));
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl Executor for ScriptedExec {
        type Error = ScriptErr;

        fn run(&self, args: &[String]) -> Result<CommandOutput, ScriptErr> {
            self.calls.borrow_mut().push(args.to_vec());
            match self.script.borrow_mut().pop_front() {
                Some(Ok(out)) => Ok(out),
                Some(Err(diag)) => Err(ScriptErr(diag)),
                None => Ok(CommandOutput::default()),
            }
        }
    }

    fn spaces_json(spaces: &[(u32, &[u32], u32)]) -> String {
        let entries: Vec<String> = spaces
            .iter()
            .map(|(index, windows, display)| {
                format!(
                    r#"{{"index":{},"windows":{:?},"display":{}}}"#,
                    index, windows, display
                )
            })
            .collect();
        format!("[{}]", entries.join(","))
    }

    #[test]
    fn empty_plan_reports_no_op() {
        let exec = ScriptedExec::default();
        let report = Dispatcher::new(&exec).execute(&Plan::empty("reclaim"));
        assert_eq!(
            report.outcome,
            ActionOutcome::NoOp { reason: "nothing to do".into() }
        );
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn single_step_plan_completes() {
        let exec = ScriptedExec::default();
        let report = Dispatcher::new(&exec).execute(&crate::plan::focus_window(118));
        assert_eq!(report.outcome, ActionOutcome::Completed { steps: 1 });
        assert_eq!(exec.calls(), vec![action::focus_window(118)]);
    }

    #[test]
    fn advisory_stderr_is_collected_not_fatal() {
        let mut exec = ScriptedExec::default();
        exec.push_ok("", "acting on the newest instance\n");
        let report = Dispatcher::new(&exec).execute(&crate::plan::focus_window(7));
        assert!(report.succeeded());
        assert_eq!(report.warnings, vec!["acting on the newest instance"]);
    }

    #[test]
    fn hard_failure_aborts_remaining_steps() {
        let mut exec = ScriptedExec::default();
        exec.push_err("could not locate window");
        let plan = Plan::new(
            "aggregate",
            vec![
                Step::MoveWindow { window: 1, to: SpaceTarget::Index(3) },
                Step::MoveWindow { window: 2, to: SpaceTarget::Index(3) },
                Step::FocusSpace(SpaceTarget::Index(3)),
            ],
        );
        let report = Dispatcher::new(&exec).execute(&plan);
        match report.outcome {
            ActionOutcome::Aborted { step, ref step_desc, ref diagnostic } => {
                assert_eq!(step, 0);
                assert_eq!(step_desc, "move window 1 to space 3");
                assert_eq!(diagnostic, "could not locate window");
            }
            ref other => panic!("expected Aborted, got {:?}", other),
        }
        assert_eq!(exec.calls().len(), 1, "later steps must not run");
    }

    #[test]
    fn create_space_resolves_against_a_fresh_query() {
        let mut exec = ScriptedExec::default();
        exec.push_ok("", ""); // create space
        exec.push_ok(&spaces_json(&[(1, &[10, 11], 1), (2, &[12], 1), (3, &[], 1)]), "");
        exec.push_ok("", ""); // move
        exec.push_ok("", ""); // focus space
        let plan = Plan::new(
            "aggregate",
            vec![
                Step::CreateSpace,
                Step::MoveWindow { window: 10, to: SpaceTarget::Created(0) },
                Step::FocusSpace(SpaceTarget::Created(0)),
            ],
        );
        let report = Dispatcher::new(&exec).execute(&plan);
        assert!(report.succeeded());
        let calls = exec.calls();
        assert_eq!(calls[0], action::create_space());
        assert_eq!(calls[1], query::spaces(None));
        assert_eq!(calls[2], action::move_window(10, 3));
        assert_eq!(calls[3], action::focus_space(3));
    }

    #[test]
    fn two_creations_resolve_to_distinct_spaces() {
        let mut exec = ScriptedExec::default();
        exec.push_ok("", ""); // create #1
        exec.push_ok(&spaces_json(&[(1, &[10], 1), (2, &[], 1)]), "");
        exec.push_ok("", ""); // create #2
        exec.push_ok(&spaces_json(&[(1, &[10], 1), (2, &[], 1), (3, &[], 1)]), "");
        exec.push_ok("", ""); // move to created #1
        exec.push_ok("", ""); // move to created #2
        let plan = Plan::new(
            "disperse",
            vec![
                Step::CreateSpace,
                Step::CreateSpace,
                Step::MoveWindow { window: 20, to: SpaceTarget::Created(0) },
                Step::MoveWindow { window: 21, to: SpaceTarget::Created(1) },
            ],
        );
        let report = Dispatcher::new(&exec).execute(&plan);
        assert!(report.succeeded());
        let calls = exec.calls();
        assert_eq!(calls[4], action::move_window(20, 2));
        assert_eq!(calls[5], action::move_window(21, 3));
    }

    #[test]
    fn unresolved_created_space_fails_the_dependent_step() {
        let exec = ScriptedExec::default();
        // A move referencing a creation slot the plan never contained.
        let plan = Plan::new(
            "aggregate",
            vec![Step::MoveWindow { window: 1, to: SpaceTarget::Created(0) }],
        );
        let report = Dispatcher::new(&exec).execute(&plan);
        assert!(matches!(report.outcome, ActionOutcome::Aborted { step: 0, .. }));
        assert!(exec.calls().is_empty(), "the move must not reach the daemon");
    }

    #[test]
    fn chained_destroys_requery_between_steps() {
        let mut exec = ScriptedExec::default();
        exec.push_ok("", ""); // destroy 4
        exec.push_ok(&spaces_json(&[(1, &[], 1), (2, &[9], 1)]), "");
        exec.push_ok("", ""); // destroy 1
        let plan = Plan::new(
            "reclaim",
            vec![Step::DestroySpace { index: 4 }, Step::DestroySpace { index: 1 }],
        );
        let report = Dispatcher::new(&exec).execute(&plan);
        assert!(report.succeeded());
        let calls = exec.calls();
        assert_eq!(calls[0], action::destroy_space(4));
        assert_eq!(calls[1], query::spaces(None));
        assert_eq!(calls[2], action::destroy_space(1));
    }

    #[test]
    fn stale_destroy_target_is_resolved_or_skipped() {
        // Space 1 gained a window between planning and execution; the only
        // other empty space is index 3, so it is destroyed instead.
        let mut exec = ScriptedExec::default();
        exec.push_ok("", ""); // destroy 4
        exec.push_ok(&spaces_json(&[(1, &[9], 1), (2, &[8], 1), (3, &[], 1)]), "");
        exec.push_ok("", ""); // destroy substitute
        let plan = Plan::new(
            "reclaim",
            vec![Step::DestroySpace { index: 4 }, Step::DestroySpace { index: 1 }],
        );
        let report = Dispatcher::new(&exec).execute(&plan);
        assert!(report.succeeded());
        assert_eq!(exec.calls()[2], action::destroy_space(3));

        // Same shape, but nothing is empty anymore: the step is skipped
        // with a warning rather than failed.
        let mut exec = ScriptedExec::default();
        exec.push_ok("", "");
        exec.push_ok(&spaces_json(&[(1, &[9], 1), (2, &[8], 1)]), "");
        let report = Dispatcher::new(&exec).execute(&plan);
        assert!(report.succeeded());
        assert_eq!(exec.calls().len(), 2, "no destroy issued for the stale target");
        assert_eq!(report.warnings.len(), 1);
    }
}
