//! Plan computation over a state snapshot.
//!
//! Everything in here is a pure function `(snapshot) -> Plan`: no I/O, no
//! clocks, no daemon.  A [`Plan`] is an ordered list of primitive [`Step`]s
//! that the [`Dispatcher`](crate::dispatch::Dispatcher) later applies one by
//! one.
//!
//! Space indices captured in a plan are only trustworthy until the daemon
//! creates or destroys a space.  A step whose target space does not exist
//! yet carries [`SpaceTarget::Created`] naming an earlier `CreateSpace`
//! step, which forces the dispatcher to re-query instead of reusing a stale
//! index.

use crate::model::Snapshot;
use std::fmt;

/// A space a step acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceTarget {
    /// A space index captured from the snapshot.
    Index(u32),
    /// The space produced by the slot-th `CreateSpace` step of the same
    /// plan (zero-based).  Its index is unknown until the dispatcher
    /// re-queries after that creation.
    Created(usize),
}

impl fmt::Display for SpaceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceTarget::Index(n) => write!(f, "space {}", n),
            SpaceTarget::Created(slot) => write!(f, "created space #{}", slot + 1),
        }
    }
}

/// One primitive daemon operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    MoveWindow { window: u32, to: SpaceTarget },
    FocusSpace(SpaceTarget),
    FocusWindow(u32),
    CloseWindow(u32),
    CreateSpace,
    /// Destroying a space renumbers every higher-indexed space.
    DestroySpace { index: u32 },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::MoveWindow { window, to } => write!(f, "move window {} to {}", window, to),
            Step::FocusSpace(to) => write!(f, "focus {}", to),
            Step::FocusWindow(id) => write!(f, "focus window {}", id),
            Step::CloseWindow(id) => write!(f, "close window {}", id),
            Step::CreateSpace => write!(f, "create space"),
            Step::DestroySpace { index } => write!(f, "destroy space {}", index),
        }
    }
}

/// An ordered list of steps computed once from a snapshot.
///
/// Plans are not re-validated mid-execution; the dispatcher re-queries only
/// where a step declares a dependency on a created space or chains
/// destructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Action name used in reports ("switch", "disperse", ...).
    pub action: &'static str,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(action: &'static str, steps: Vec<Step>) -> Self {
        Self { action, steps }
    }

    pub fn empty(action: &'static str) -> Self {
        Self { action, steps: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Focus a single window.
pub fn focus_window(id: u32) -> Plan {
    Plan::new("switch", vec![Step::FocusWindow(id)])
}

/// Close a single window.
pub fn close_window(id: u32) -> Plan {
    Plan::new("close", vec![Step::CloseWindow(id)])
}

/// Spread a display's windows one-per-space across existing and newly
/// created spaces.
///
/// Native-fullscreen windows are excluded up front; the daemon cannot
/// relocate them between spaces.  With W movable windows and S existing
/// spaces the plan creates `max(0, W - S - 1)` spaces and moves the first
/// `W - 1` windows; the final window keeps its place and one space is left
/// as a landing area.  The terminal step returns focus to space 1.
pub fn disperse(snapshot: &Snapshot, display: u32) -> Plan {
    let windows: Vec<u32> = snapshot
        .windows_on_display(display)
        .filter(|w| !w.is_native_fullscreen)
        .map(|w| w.id)
        .collect();

    if windows.is_empty() {
        return Plan::empty("disperse");
    }

    let spaces: Vec<u32> = snapshot
        .spaces_on_display(display)
        .iter()
        .map(|s| s.index)
        .collect();

    let needed = windows.len().saturating_sub(spaces.len() + 1);

    let mut steps: Vec<Step> = Vec::with_capacity(needed + windows.len());
    for _ in 0..needed {
        steps.push(Step::CreateSpace);
    }

    for (i, window) in windows.iter().enumerate().take(windows.len() - 1) {
        let to = match spaces.get(i) {
            Some(&index) => SpaceTarget::Index(index),
            None => SpaceTarget::Created(i - spaces.len()),
        };
        steps.push(Step::MoveWindow { window: *window, to });
    }

    steps.push(Step::FocusSpace(SpaceTarget::Index(1)));
    Plan::new("disperse", steps)
}

/// Consolidate every window of the trigger's application into one space.
///
/// Empty when the trigger's space holds fewer than two windows.  The target
/// is the first space with zero windows; when none exists a `CreateSpace`
/// step is prepended and the moves resolve against it.  Matching is
/// case-insensitive on the application name and covers all spaces in index
/// order, preserving each space's window order.
pub fn aggregate(snapshot: &Snapshot, window_id: u32) -> Plan {
    let trigger = match snapshot.window_by_id(window_id) {
        Some(w) => w,
        None => return Plan::empty("aggregate"),
    };
    let trigger_space = match snapshot.space_by_index(trigger.space) {
        Some(s) => s,
        None => return Plan::empty("aggregate"),
    };
    if trigger_space.windows.len() < 2 {
        return Plan::empty("aggregate");
    }

    let mut spaces: Vec<&crate::model::Space> = snapshot.spaces.iter().collect();
    spaces.sort_by_key(|s| s.index);

    let mut steps = Vec::new();
    let target = match spaces.iter().find(|s| s.windows.is_empty()) {
        Some(s) => SpaceTarget::Index(s.index),
        None => {
            steps.push(Step::CreateSpace);
            SpaceTarget::Created(0)
        }
    };

    let app = trigger.app.to_lowercase();
    let mut matched: Vec<u32> = Vec::new();
    for space in &spaces {
        for id in &space.windows {
            if let Some(w) = snapshot.window_by_id(*id) {
                if w.app.to_lowercase() == app {
                    matched.push(w.id);
                }
            }
        }
    }

    for id in &matched {
        steps.push(Step::MoveWindow { window: *id, to: target });
    }
    steps.push(Step::FocusSpace(target));
    if let Some(first) = matched.first() {
        steps.push(Step::FocusWindow(*first));
    }

    Plan::new("aggregate", steps)
}

/// Destroy every space that currently holds no windows.
///
/// Destructions are ordered highest index first so the indices of the
/// remaining targets stay valid as earlier steps renumber the space list.
/// A display's only space is never a target; the daemon refuses to destroy
/// it.  When a display's spaces are all empty, its lowest-indexed one
/// survives.
pub fn reclaim(snapshot: &Snapshot) -> Plan {
    let mut targets: Vec<u32> = Vec::new();

    let mut displays: Vec<u32> = snapshot.spaces.iter().map(|s| s.display).collect();
    displays.sort_unstable();
    displays.dedup();

    for display in displays {
        let spaces = snapshot.spaces_on_display(display);
        let empties: Vec<u32> = spaces
            .iter()
            .filter(|s| s.windows.is_empty())
            .map(|s| s.index)
            .collect();
        if empties.len() == spaces.len() {
            // Everything on this display is empty; spare the first space.
            targets.extend(empties.into_iter().skip(1));
        } else {
            targets.extend(empties);
        }
    }

    targets.sort_unstable_by(|a, b| b.cmp(a));

    let steps = targets
        .into_iter()
        .map(|index| Step::DestroySpace { index })
        .collect();
    Plan::new("reclaim", steps)
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Frame, Space, Window};

    fn window(id: u32, app: &str, space: u32, display: u32) -> Window {
        Window {
            id,
            pid: id as i32,
            app: app.into(),
            title: format!("{} window {}", app, id),
            space,
            display,
            frame: Frame::default(),
            has_focus: false,
            is_native_fullscreen: false,
        }
    }

    fn space(index: u32, windows: Vec<u32>, display: u32) -> Space {
        Space { index, windows, display }
    }

    fn moves(plan: &Plan) -> Vec<(u32, SpaceTarget)> {
        plan.steps
            .iter()
            .filter_map(|s| match s {
                Step::MoveWindow { window, to } => Some((*window, *to)),
                _ => None,
            })
            .collect()
    }

    fn creates(plan: &Plan) -> usize {
        plan.steps.iter().filter(|s| matches!(s, Step::CreateSpace)).count()
    }

    //  Dispersal

    #[test]
    fn disperse_counts_match_the_reserved_slot_rule() {
        // 4 windows, 2 spaces: max(0, 4 - 2 - 1) = 1 create, 3 moves.
        let snap = Snapshot {
            windows: (1..=4).map(|i| window(i, "App", 1, 1)).collect(),
            spaces: vec![space(1, vec![1, 2, 3, 4], 1), space(2, vec![], 1)],
            ..Default::default()
        };
        let plan = disperse(&snap, 1);
        assert_eq!(creates(&plan), 1);
        assert_eq!(moves(&plan).len(), 3, "last window never receives a move");
    }

    #[test]
    fn disperse_pairs_windows_with_spaces_in_snapshot_order() {
        let snap = Snapshot {
            windows: vec![window(10, "A", 1, 1), window(11, "B", 1, 1), window(12, "C", 1, 1)],
            spaces: vec![space(1, vec![10, 11, 12], 1), space(2, vec![], 1)],
            ..Default::default()
        };
        let plan = disperse(&snap, 1);
        assert_eq!(
            moves(&plan),
            vec![
                (10, SpaceTarget::Index(1)),
                (11, SpaceTarget::Index(2)),
            ]
        );
        assert_eq!(plan.steps.last(), Some(&Step::FocusSpace(SpaceTarget::Index(1))));
    }

    #[test]
    fn disperse_targets_created_spaces_beyond_the_existing_ones() {
        // 5 windows, 1 space: 3 creates; moves 2..4 land on created slots.
        let snap = Snapshot {
            windows: (1..=5).map(|i| window(i, "App", 1, 1)).collect(),
            spaces: vec![space(1, (1..=5).collect(), 1)],
            ..Default::default()
        };
        let plan = disperse(&snap, 1);
        assert_eq!(creates(&plan), 3);
        assert_eq!(
            moves(&plan),
            vec![
                (1, SpaceTarget::Index(1)),
                (2, SpaceTarget::Created(0)),
                (3, SpaceTarget::Created(1)),
                (4, SpaceTarget::Created(2)),
            ]
        );
        // Creations come before any move that depends on them.
        let first_move = plan.steps.iter().position(|s| matches!(s, Step::MoveWindow { .. }));
        let last_create = plan.steps.iter().rposition(|s| matches!(s, Step::CreateSpace));
        assert!(last_create < first_move);
    }

    #[test]
    fn disperse_excludes_native_fullscreen_windows() {
        let mut fullscreen = window(2, "Film", 1, 1);
        fullscreen.is_native_fullscreen = true;
        let snap = Snapshot {
            windows: vec![window(1, "A", 1, 1), fullscreen, window(3, "B", 1, 1)],
            spaces: vec![space(1, vec![1, 2, 3], 1), space(2, vec![], 1), space(3, vec![], 1)],
            ..Default::default()
        };
        let plan = disperse(&snap, 1);
        assert_eq!(creates(&plan), 0);
        assert_eq!(moves(&plan), vec![(1, SpaceTarget::Index(1))]);
    }

    #[test]
    fn disperse_ignores_other_displays() {
        let snap = Snapshot {
            windows: vec![window(1, "A", 1, 1), window(2, "B", 3, 2)],
            spaces: vec![space(1, vec![1], 1), space(3, vec![2], 2)],
            ..Default::default()
        };
        let plan = disperse(&snap, 1);
        assert!(moves(&plan).is_empty(), "a single window stays put");
        assert_eq!(plan.steps, vec![Step::FocusSpace(SpaceTarget::Index(1))]);
    }

    #[test]
    fn disperse_with_no_windows_is_empty() {
        let snap = Snapshot {
            spaces: vec![space(1, vec![], 1)],
            ..Default::default()
        };
        assert!(disperse(&snap, 1).is_empty());
    }

    //  Aggregation

    fn aggregation_snapshot() -> Snapshot {
        Snapshot {
            windows: vec![
                window(1, "Safari", 1, 1),
                window(2, "Mail", 1, 1),
                window(3, "safari", 2, 1),
                window(4, "Notes", 2, 1),
            ],
            spaces: vec![
                space(1, vec![1, 2], 1),
                space(2, vec![3, 4], 1),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn aggregate_is_a_no_op_below_two_windows() {
        let snap = Snapshot {
            windows: vec![window(1, "Safari", 1, 1)],
            spaces: vec![space(1, vec![1], 1), space(2, vec![], 1)],
            ..Default::default()
        };
        assert!(aggregate(&snap, 1).is_empty());
    }

    #[test]
    fn aggregate_is_empty_for_an_unknown_window() {
        assert!(aggregate(&aggregation_snapshot(), 99).is_empty());
    }

    #[test]
    fn aggregate_creates_a_space_when_none_is_empty() {
        let snap = aggregation_snapshot();
        let plan = aggregate(&snap, 1);
        assert_eq!(plan.steps.first(), Some(&Step::CreateSpace));
        assert_eq!(
            moves(&plan),
            vec![
                (1, SpaceTarget::Created(0)),
                (3, SpaceTarget::Created(0)),
            ],
            "matches are case-insensitive and cover all spaces"
        );
        assert_eq!(
            &plan.steps[plan.steps.len() - 2..],
            &[
                Step::FocusSpace(SpaceTarget::Created(0)),
                Step::FocusWindow(1),
            ]
        );
    }

    #[test]
    fn aggregate_reuses_an_existing_empty_space() {
        let mut snap = aggregation_snapshot();
        snap.spaces.push(space(3, vec![], 1));
        let plan = aggregate(&snap, 1);
        assert_eq!(creates(&plan), 0);
        assert_eq!(
            moves(&plan),
            vec![
                (1, SpaceTarget::Index(3)),
                (3, SpaceTarget::Index(3)),
            ]
        );
        assert_eq!(
            &plan.steps[plan.steps.len() - 2..],
            &[
                Step::FocusSpace(SpaceTarget::Index(3)),
                Step::FocusWindow(1),
            ]
        );
    }

    #[test]
    fn aggregate_preserves_encounter_order_across_spaces() {
        // Trigger sits on the later space; encounter order still follows
        // space index order.
        let snap = aggregation_snapshot();
        let plan = aggregate(&snap, 3);
        let m = moves(&plan);
        assert_eq!(m.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(plan.steps.last(), Some(&Step::FocusWindow(1)));
    }

    //  Reclaim

    #[test]
    fn reclaim_with_no_empty_spaces_is_empty() {
        let snap = Snapshot {
            windows: vec![window(1, "A", 1, 1), window(2, "B", 2, 1)],
            spaces: vec![space(1, vec![1], 1), space(2, vec![2], 1)],
            ..Default::default()
        };
        assert!(reclaim(&snap).is_empty());
    }

    #[test]
    fn reclaim_destroys_highest_index_first() {
        let snap = Snapshot {
            windows: vec![window(1, "A", 2, 1)],
            spaces: vec![
                space(1, vec![], 1),
                space(2, vec![1], 1),
                space(3, vec![], 1),
                space(4, vec![], 1),
            ],
            ..Default::default()
        };
        let plan = reclaim(&snap);
        assert_eq!(
            plan.steps,
            vec![
                Step::DestroySpace { index: 4 },
                Step::DestroySpace { index: 3 },
                Step::DestroySpace { index: 1 },
            ]
        );
    }

    #[test]
    fn reclaim_spares_a_displays_only_space() {
        let snap = Snapshot {
            spaces: vec![space(1, vec![], 1)],
            ..Default::default()
        };
        assert!(reclaim(&snap).is_empty());
    }

    #[test]
    fn reclaim_keeps_one_space_when_a_display_is_all_empty() {
        let snap = Snapshot {
            windows: vec![window(1, "A", 1, 1)],
            spaces: vec![
                space(1, vec![1], 1),
                // Second display, fully empty.
                space(2, vec![], 2),
                space(3, vec![], 2),
            ],
            ..Default::default()
        };
        let plan = reclaim(&snap);
        assert_eq!(plan.steps, vec![Step::DestroySpace { index: 3 }]);
    }

    #[test]
    fn step_descriptions_read_naturally() {
        assert_eq!(
            Step::MoveWindow { window: 7, to: SpaceTarget::Index(3) }.to_string(),
            "move window 7 to space 3"
        );
        assert_eq!(
            Step::MoveWindow { window: 7, to: SpaceTarget::Created(0) }.to_string(),
            "move window 7 to created space #1"
        );
        assert_eq!(Step::DestroySpace { index: 4 }.to_string(), "destroy space 4");
    }
}
