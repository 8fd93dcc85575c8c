//! Filtering and ranking of windows and applications.
//!
//! Filtering prefers exact case-insensitive substring matches: when any
//! exist, fuzzy matching never runs.  The fuzzy fallback scores bigram
//! overlap (Dice coefficient); windows weight the title twice as heavily as
//! the application name, and applications use a stricter threshold because
//! false positives are more confusing among many similarly named apps.
//!
//! Ordering is a separate, selectable concern ([`RankingPolicy`]) driven by
//! the persisted [`UsageRecord`] of last-focused timestamps.

use crate::command::{RankedItem, RankingPolicy};
use crate::model::{Application, Snapshot, Window};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Minimum per-field similarity for a window to survive fuzzy filtering.
pub const WINDOW_SIMILARITY_THRESHOLD: f64 = 0.4;
/// Minimum name similarity for an application to survive fuzzy filtering.
pub const APPLICATION_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Persisted mapping from window id to last-focused unix time (ms).
///
/// Purely additive: a new focus overwrites the previous timestamp for that
/// id, and entries for windows that no longer exist are harmless and never
/// pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageRecord {
    entries: HashMap<u32, u64>,
}

impl UsageRecord {
    pub fn record(&mut self, window: u32, timestamp_ms: u64) {
        self.entries.insert(window, timestamp_ms);
    }

    pub fn last_focused(&self, window: u32) -> Option<u64> {
        self.entries.get(&window).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bigram (Dice) similarity of two strings, case-insensitive, in `[0, 1]`.
///
/// Inputs shorter than two characters degrade to substring containment.
fn similarity(query: &str, text: &str) -> f64 {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }
    if query.chars().count() < 2 || text.chars().count() < 2 {
        return if text.contains(&query) || query.contains(&text) { 1.0 } else { 0.0 };
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::new();
    let mut total_a = 0usize;
    let a: Vec<char> = query.chars().collect();
    for pair in a.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
        total_a += 1;
    }

    let b: Vec<char> = text.chars().collect();
    let mut total_b = 0usize;
    let mut overlap = 0usize;
    for pair in b.windows(2) {
        total_b += 1;
        if let Some(n) = counts.get_mut(&(pair[0], pair[1])) {
            if *n > 0 {
                *n -= 1;
                overlap += 1;
            }
        }
    }

    2.0 * overlap as f64 / (total_a + total_b) as f64
}

/// A fuzzy hit with its weighted score and the length of the field that
/// produced it (shorter fields win ties as the more precise match).
struct Scored<T> {
    score: f64,
    matched_len: usize,
    item: T,
}

fn sort_scored<T>(mut scored: Vec<Scored<T>>) -> Vec<T> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.matched_len.cmp(&b.matched_len))
    });
    scored.into_iter().map(|s| s.item).collect()
}

/// Filter windows against a free-text query.
///
/// Exact case-insensitive substring matches on title or application name
/// short-circuit the fuzzy path entirely and keep snapshot order.
pub fn filter_windows<'a>(windows: &'a [Window], query: &str) -> Vec<&'a Window> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return windows.iter().collect();
    }

    let exact: Vec<&Window> = windows
        .iter()
        .filter(|w| w.title.to_lowercase().contains(&q) || w.app.to_lowercase().contains(&q))
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let mut scored = Vec::new();
    for w in windows {
        let title = similarity(&q, &w.title);
        let app = similarity(&q, &w.app);
        if title < WINDOW_SIMILARITY_THRESHOLD && app < WINDOW_SIMILARITY_THRESHOLD {
            continue;
        }
        // The title counts double; whichever field wins supplies the
        // tie-break length.
        let (score, matched_len) = if title * 2.0 >= app {
            (title * 2.0, w.title.chars().count())
        } else {
            (app, w.app.chars().count())
        };
        scored.push(Scored { score, matched_len, item: w });
    }
    sort_scored(scored)
}

/// Filter applications against a free-text query (name only).
pub fn filter_applications<'a>(apps: &'a [Application], query: &str) -> Vec<&'a Application> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return apps.iter().collect();
    }

    let exact: Vec<&Application> =
        apps.iter().filter(|a| a.name.to_lowercase().contains(&q)).collect();
    if !exact.is_empty() {
        return exact;
    }

    let mut scored = Vec::new();
    for a in apps {
        let score = similarity(&q, &a.name);
        if score >= APPLICATION_SIMILARITY_THRESHOLD {
            scored.push(Scored { score, matched_len: a.name.chars().count(), item: a });
        }
    }
    sort_scored(scored)
}

/// Reorder filtered windows according to the selected policy.
pub fn order_windows<'a>(
    mut windows: Vec<&'a Window>,
    policy: RankingPolicy,
    usage: &UsageRecord,
) -> Vec<&'a Window> {
    match policy {
        RankingPolicy::Usage => {
            // Stable: never-focused windows keep their filtered order at
            // the end.
            windows.sort_by(|a, b| {
                match (usage.last_focused(a.id), usage.last_focused(b.id)) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
            windows
        }
        RankingPolicy::RecencyPair => {
            let mut stamped: Vec<(u64, u32)> = windows
                .iter()
                .filter_map(|w| usage.last_focused(w.id).map(|t| (t, w.id)))
                .collect();
            stamped.sort_by(|a, b| b.cmp(a));
            let first = stamped.first().map(|&(_, id)| id);
            let second = stamped.get(1).map(|&(_, id)| id);

            let mut pinned = Vec::with_capacity(windows.len());
            let mut rest = Vec::with_capacity(windows.len());
            for w in windows {
                if Some(w.id) == first || Some(w.id) == second {
                    pinned.push(w);
                } else {
                    rest.push(w);
                }
            }
            pinned.sort_by_key(|w| if Some(w.id) == first { 0 } else { 1 });
            rest.sort_by(|a, b| {
                a.app
                    .to_lowercase()
                    .cmp(&b.app.to_lowercase())
                    .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
                    .then(a.id.cmp(&b.id))
            });
            pinned.extend(rest);
            pinned
        }
    }
}

/// Produce the full ranked result set for a query: windows first (filtered,
/// then policy-ordered), applications after.
pub fn search(
    snapshot: &Snapshot,
    query: &str,
    policy: RankingPolicy,
    usage: &UsageRecord,
) -> Vec<RankedItem> {
    let windows = order_windows(filter_windows(&snapshot.windows, query), policy, usage);
    let apps = filter_applications(&snapshot.applications, query);

    let mut items: Vec<RankedItem> = Vec::with_capacity(windows.len() + apps.len());
    items.extend(windows.into_iter().cloned().map(RankedItem::Window));
    items.extend(apps.into_iter().cloned().map(RankedItem::Application));
    items
}

//  Tests
