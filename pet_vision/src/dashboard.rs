// THEORY:
// The `dashboard` module is the consumer end of the broadcast hub. It keeps the
// latest `{current, history}` snapshot it was sent and derives two views from it:
// per-subject descriptive statistics, and a timeline that keeps only transitions
// (the first entry of every run of identical activity for the same pet).

use crate::core_modules::activity::{Activity, ActivityEvent, ActivitySnapshot};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A monitored pet as the dashboard knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub name: String,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub total: usize,
    pub activities: BTreeMap<Activity, usize>,
    /// Mean confidence as a percentage, one decimal.
    pub avg_confidence: f64,
    /// Mean movement in pixels per frame, one decimal.
    pub avg_movement: f64,
    /// Local time of the last event, `HH:MM:SS`.
    pub last_update: Option<String>,
}

/// Descriptive statistics for every subject, zeroed for subjects without events.
pub fn compute_statistics(history: &[ActivityEvent], subjects: &[Subject]) -> BTreeMap<String, SubjectStats> {
    subjects
        .iter()
        .map(|subject| (subject.name.clone(), stats_for(history, &subject.name)))
        .collect()
}

fn stats_for(history: &[ActivityEvent], name: &str) -> SubjectStats {
    let events: Vec<&ActivityEvent> = history.iter().filter(|e| e.pet_name() == name).collect();
    let Some(last) = events.last() else {
        return SubjectStats::default();
    };

    let mut activities = BTreeMap::new();
    let mut confidence_sum = 0.0;
    let mut movement_sum = 0.0;
    for event in &events {
        *activities.entry(event.activity()).or_insert(0) += 1;
        confidence_sum += event.report.confidence;
        movement_sum += event.report.movement;
    }

    let total = events.len();
    SubjectStats {
        total,
        activities,
        avg_confidence: round1(confidence_sum / total as f64 * 100.0),
        avg_movement: round1(movement_sum / total as f64),
        last_update: format_time(last.report.timestamp),
    }
}

/// Collapses consecutive entries that share both activity and pet name.
pub fn dedup_timeline(history: &[ActivityEvent]) -> Vec<ActivityEvent> {
    let mut timeline: Vec<ActivityEvent> = Vec::new();
    for event in history {
        let repeats = timeline
            .last()
            .is_some_and(|prev| prev.activity() == event.activity() && prev.pet_name() == event.pet_name());
        if !repeats {
            timeline.push(event.clone());
        }
    }
    timeline
}

fn format_time(timestamp_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Dashboard state fed by `pet-activities-update` snapshots.
#[derive(Debug, Default)]
pub struct Dashboard {
    snapshot: ActivitySnapshot,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the view with the hub's latest snapshot.
    pub fn apply(&mut self, snapshot: ActivitySnapshot) {
        self.snapshot = snapshot;
    }

    pub fn current(&self) -> &[ActivityEvent] {
        &self.snapshot.current
    }

    /// One subject per distinct pet name currently reported, in name order.
    pub fn subjects(&self) -> Vec<Subject> {
        self.snapshot
            .current
            .iter()
            .map(|e| e.pet_name().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(Subject::new)
            .collect()
    }

    pub fn statistics(&self) -> BTreeMap<String, SubjectStats> {
        compute_statistics(&self.snapshot.history, &self.subjects())
    }

    pub fn timeline(&self) -> Vec<ActivityEvent> {
        dedup_timeline(&self.snapshot.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::activity::ActivityReport;

    fn event(source: u64, pet: &str, activity: Activity, confidence: f64, movement: f64) -> ActivityEvent {
        ActivityEvent::new(
            source,
            ActivityReport {
                pet_name: pet.into(),
                activity,
                confidence,
                movement,
                timestamp: 1_700_000_000_000,
                position: None,
            },
        )
    }

    #[test]
    fn dedup_keeps_transitions_only() {
        let a = || event(1, "Rex", Activity::Walking, 0.5, 12.0);
        let b = || event(1, "Rex", Activity::Resting, 0.85, 3.0);
        let history = vec![a(), a(), b(), b(), b(), a()];
        let activities: Vec<Activity> = dedup_timeline(&history).iter().map(|e| e.activity()).collect();
        assert_eq!(activities, vec![Activity::Walking, Activity::Resting, Activity::Walking]);
    }

    #[test]
    fn dedup_separates_pets_with_same_activity() {
        let history = vec![
            event(1, "Rex", Activity::Eating, 0.8, 0.0),
            event(2, "Milo", Activity::Eating, 0.8, 0.0),
            event(1, "Rex", Activity::Eating, 0.8, 0.0),
        ];
        assert_eq!(dedup_timeline(&history).len(), 3);
    }

    #[test]
    fn statistics_per_subject() {
        let history = vec![
            event(1, "Rex", Activity::Walking, 0.5, 10.0),
            event(1, "Rex", Activity::Walking, 0.6, 20.0),
            event(2, "Milo", Activity::Sleeping, 0.9, 0.0),
            event(1, "Rex", Activity::Resting, 0.85, 4.0),
        ];
        let stats = compute_statistics(&history, &[Subject::new("Rex"), Subject::new("Ghost")]);

        let rex = &stats["Rex"];
        assert_eq!(rex.total, 3);
        assert_eq!(rex.activities[&Activity::Walking], 2);
        assert_eq!(rex.activities[&Activity::Resting], 1);
        assert_eq!(rex.avg_confidence, 65.0);
        assert_eq!(rex.avg_movement, 11.3);
        assert_eq!(rex.last_update.as_deref().map(str::len), Some(8));

        assert_eq!(stats["Ghost"], SubjectStats::default());
        assert!(!stats.contains_key("Milo"));
    }

    #[test]
    fn dashboard_derives_subjects_from_current() {
        let mut dashboard = Dashboard::new();
        dashboard.apply(ActivitySnapshot {
            current: vec![
                event(2, "Milo", Activity::Sleeping, 0.9, 0.0),
                event(1, "Rex", Activity::Walking, 0.5, 15.0),
            ],
            history: vec![
                event(1, "Rex", Activity::Walking, 0.5, 15.0),
                event(2, "Milo", Activity::Sleeping, 0.9, 0.0),
            ],
        });
        let names: Vec<String> = dashboard.subjects().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Milo".to_string(), "Rex".to_string()]);
        assert_eq!(dashboard.statistics()["Milo"].total, 1);
        assert_eq!(dashboard.timeline().len(), 2);
    }
}
