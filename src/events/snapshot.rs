//! Authoritative event snapshot
//!
//! Per event id: ACTIVE -> REMOVED, where REMOVED is terminal until the id
//! shows up in the feed again. Entries are never deleted, only tombstoned, so
//! the map only grows. The read view filters tombstones on every call.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::info;

use crate::models::{ScoreMap, SportEvent, REMOVED_STATUS};

pub type EventMap = BTreeMap<String, SportEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub event_id: String,
    pub event_name: String,
    pub old_status: String,
    pub new_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreChange {
    pub event_id: String,
    pub event_name: String,
    pub old_scores: ScoreMap,
    pub new_scores: ScoreMap,
}

/// What one `update_state` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub status_changes: Vec<StatusChange>,
    pub score_changes: Vec<ScoreChange>,
}

/// Owner of the snapshot. `update_state` is the only write path.
pub struct SnapshotReconciler {
    state: Arc<RwLock<EventMap>>,
}

impl Default for SnapshotReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotReconciler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(EventMap::new())),
        }
    }

    /// Read-only handle for consumers such as the HTTP layer
    pub fn view(&self) -> SnapshotView {
        SnapshotView {
            state: Arc::clone(&self.state),
        }
    }

    /// Merge one cycle's accepted events into the snapshot
    pub fn update_state(&self, events: Vec<SportEvent>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut state = self.state.write();
        let mut seen: HashSet<String> = HashSet::with_capacity(events.len());

        for event in events {
            seen.insert(event.id.clone());

            match state.get(&event.id) {
                Some(previous) => {
                    // Diagnostics only, the write below always happens
                    detect_changes(previous, &event, &mut report);
                    report.updated.push(event.id.clone());
                }
                None => report.added.push(event.id.clone()),
            }

            state.insert(event.id.clone(), event);
        }

        for (event_id, event) in state.iter_mut() {
            if seen.contains(event_id) || event.is_removed() {
                continue;
            }

            let change = StatusChange {
                event_id: event_id.clone(),
                event_name: event.display_name(),
                old_status: event.status.clone(),
                new_status: REMOVED_STATUS.to_string(),
            };
            log_status_change(&change);

            *event = event.tombstoned();
            report.removed.push(event_id.clone());
            report.status_changes.push(change);
        }

        report
    }
}

fn detect_changes(old: &SportEvent, new: &SportEvent, report: &mut ReconcileReport) {
    let event_name = new.display_name();

    if old.status != new.status {
        let change = StatusChange {
            event_id: new.id.clone(),
            event_name: event_name.clone(),
            old_status: old.status.clone(),
            new_status: new.status.clone(),
        };
        log_status_change(&change);
        report.status_changes.push(change);
    }

    if old.scores != new.scores {
        let change = ScoreChange {
            event_id: new.id.clone(),
            event_name,
            old_scores: old.scores.clone(),
            new_scores: new.scores.clone(),
        };
        info!(
            event_id = %change.event_id,
            event = %change.event_name,
            old_score = %scores_json(&change.old_scores),
            new_score = %scores_json(&change.new_scores),
            "[SCORE CHANGE]"
        );
        report.score_changes.push(change);
    }
}

fn log_status_change(change: &StatusChange) {
    info!(
        event_id = %change.event_id,
        event = %change.event_name,
        old_status = %change.old_status,
        new_status = %change.new_status,
        "[STATUS CHANGE]"
    );
}

fn scores_json(scores: &ScoreMap) -> String {
    serde_json::to_string(scores).unwrap_or_default()
}

/// Read side of the snapshot. Cheap to clone, cannot mutate.
#[derive(Clone)]
pub struct SnapshotView {
    state: Arc<RwLock<EventMap>>,
}

impl SnapshotView {
    /// Active events only; recomputed on every call
    pub fn client_state(&self) -> EventMap {
        self.state
            .read()
            .iter()
            .filter(|(_, event)| !event.is_removed())
            .map(|(id, event)| (id.clone(), event.clone()))
            .collect()
    }

    pub fn get(&self, event_id: &str) -> Option<SportEvent> {
        self.state.read().get(event_id).cloned()
    }

    /// (active, removed) entry counts
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.read();
        let removed = state.values().filter(|e| e.is_removed()).count();
        (state.len() - removed, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Competitor, Competitors, ScoreEntry};

    fn event(id: &str, status: &str) -> SportEvent {
        SportEvent {
            id: id.to_string(),
            status: status.to_string(),
            scores: ScoreMap::new(),
            start_time: "2025-06-29T12:00:00.000Z".to_string(),
            sport: "FOOTBALL".to_string(),
            competitors: Competitors {
                home: Competitor::home("Real Madrid"),
                away: Competitor::away("Barcelona"),
            },
            competition: "UEFA Champions League".to_string(),
        }
    }

    fn with_score(mut event: SportEvent, home: &str, away: &str) -> SportEvent {
        event.scores.insert(
            "CURRENT".to_string(),
            ScoreEntry {
                period: "CURRENT".to_string(),
                home: home.to_string(),
                away: away.to_string(),
            },
        );
        event
    }

    #[test]
    fn test_empty_snapshot() {
        let reconciler = SnapshotReconciler::new();
        assert!(reconciler.view().client_state().is_empty());
    }

    #[test]
    fn test_adds_event() {
        let reconciler = SnapshotReconciler::new();
        let report = reconciler.update_state(vec![event("e1", "PRE")]);

        assert_eq!(report.added, vec!["e1".to_string()]);
        let state = reconciler.view().client_state();
        assert_eq!(state.len(), 1);
        assert_eq!(state["e1"], event("e1", "PRE"));
    }

    #[test]
    fn test_status_update_fires_one_change() {
        let reconciler = SnapshotReconciler::new();
        reconciler.update_state(vec![event("e1", "PRE")]);
        let report = reconciler.update_state(vec![event("e1", "LIVE")]);

        assert_eq!(reconciler.view().client_state()["e1"].status, "LIVE");
        assert_eq!(
            report.status_changes,
            vec![StatusChange {
                event_id: "e1".to_string(),
                event_name: "Real Madrid vs Barcelona".to_string(),
                old_status: "PRE".to_string(),
                new_status: "LIVE".to_string(),
            }]
        );
        assert!(report.score_changes.is_empty());
        assert_eq!(report.updated, vec!["e1".to_string()]);
    }

    #[test]
    fn test_score_update_detected() {
        let reconciler = SnapshotReconciler::new();
        reconciler.update_state(vec![with_score(event("e1", "LIVE"), "0", "0")]);
        let report = reconciler.update_state(vec![with_score(event("e1", "LIVE"), "1", "0")]);

        assert!(report.status_changes.is_empty());
        assert_eq!(report.score_changes.len(), 1);
        assert_eq!(report.score_changes[0].old_scores["CURRENT"].home, "0");
        assert_eq!(report.score_changes[0].new_scores["CURRENT"].home, "1");
    }

    #[test]
    fn test_unchanged_event_fires_nothing() {
        let reconciler = SnapshotReconciler::new();
        reconciler.update_state(vec![event("e1", "LIVE")]);
        let report = reconciler.update_state(vec![event("e1", "LIVE")]);

        assert!(report.status_changes.is_empty());
        assert!(report.score_changes.is_empty());
    }

    #[test]
    fn test_missing_event_is_tombstoned_once() {
        let reconciler = SnapshotReconciler::new();
        reconciler.update_state(vec![event("e1", "LIVE")]);

        let report = reconciler.update_state(vec![]);
        assert!(reconciler.view().client_state().is_empty());
        assert_eq!(report.removed, vec!["e1".to_string()]);
        assert_eq!(report.status_changes.len(), 1);
        assert_eq!(report.status_changes[0].old_status, "LIVE");
        assert_eq!(report.status_changes[0].new_status, REMOVED_STATUS);

        // Retained, not deleted
        let stored = reconciler.view().get("e1").unwrap();
        assert_eq!(stored.status, REMOVED_STATUS);
        assert_eq!(stored.sport, "FOOTBALL");

        let again = reconciler.update_state(vec![]);
        assert!(again.removed.is_empty());
        assert!(again.status_changes.is_empty());
        assert_eq!(reconciler.view().counts(), (0, 1));
    }

    #[test]
    fn test_reappearing_event_becomes_active() {
        let reconciler = SnapshotReconciler::new();
        reconciler.update_state(vec![event("e1", "LIVE")]);
        reconciler.update_state(vec![]);

        let report = reconciler.update_state(vec![event("e1", "LIVE")]);

        assert_eq!(report.status_changes[0].old_status, REMOVED_STATUS);
        assert_eq!(reconciler.view().client_state().len(), 1);
    }

    #[test]
    fn test_counts_and_mixed_cycle() {
        let reconciler = SnapshotReconciler::new();
        reconciler.update_state(vec![event("e1", "LIVE"), event("e2", "PRE")]);
        let report = reconciler.update_state(vec![event("e2", "LIVE"), event("e3", "PRE")]);

        assert_eq!(report.added, vec!["e3".to_string()]);
        assert_eq!(report.updated, vec!["e2".to_string()]);
        assert_eq!(report.removed, vec!["e1".to_string()]);
        assert_eq!(reconciler.view().counts(), (2, 1));

        let ids: Vec<String> = reconciler.view().client_state().into_keys().collect();
        assert_eq!(ids, vec!["e2".to_string(), "e3".to_string()]);
    }
}
