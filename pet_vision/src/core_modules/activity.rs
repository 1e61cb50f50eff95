// THEORY:
// The `activity` module defines the discrete behavioral vocabulary of the system
// and the records that carry it between layers.
//
// 1.  `Activity` is a closed set shared by the classifier output and the manual
//     override. Its wire strings are fixed.
// 2.  `ActivityReport` is what a detection session produces for a frame in which
//     a subject was seen. It does not know which connection it will travel over.
// 3.  `ActivityEvent` is a report after the hub has stamped it with the identity
//     of the source that sent it. It is immutable from then on.
// 4.  `ActivitySnapshot` is the `{current, history}` view the hub hands to
//     dashboards.

use crate::core_modules::detection::Centroid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Connection identity of a detection source.
pub type SourceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Activity {
    Sleeping,
    #[serde(rename = "Sleeping/Lying")]
    SleepingLying,
    Resting,
    Eating,
    Drinking,
    #[serde(rename = "Standing/Sitting")]
    StandingSitting,
    Walking,
    #[serde(rename = "Running/Playing")]
    RunningPlaying,
    Unknown,
}

impl Activity {
    pub const ALL: [Activity; 9] = [
        Activity::Sleeping,
        Activity::SleepingLying,
        Activity::Resting,
        Activity::Eating,
        Activity::Drinking,
        Activity::StandingSitting,
        Activity::Walking,
        Activity::RunningPlaying,
        Activity::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sleeping => "Sleeping",
            Self::SleepingLying => "Sleeping/Lying",
            Self::Resting => "Resting",
            Self::Eating => "Eating",
            Self::Drinking => "Drinking",
            Self::StandingSitting => "Standing/Sitting",
            Self::Walking => "Walking",
            Self::RunningPlaying => "Running/Playing",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Activity::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown activity `{s}`"))
    }
}

/// Output of the classifier (or of a manual override) for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub activity: Activity,
    pub confidence: f64,
}

impl Classification {
    pub fn new(activity: Activity, confidence: f64) -> Self {
        Self { activity, confidence }
    }
}

/// The `pet-activity` payload a detection client sends for every frame with a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    pub pet_name: String,
    pub activity: Activity,
    pub confidence: f64,
    pub movement: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub position: Option<Centroid>,
}

impl ActivityReport {
    /// Checks `confidence ∈ [0, 1]` and `movement ≥ 0`, both finite.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err("confidence must be within [0, 1]");
        }
        if !self.movement.is_finite() || self.movement < 0.0 {
            return Err("movement must be a non-negative number");
        }
        Ok(())
    }
}

/// A report stamped with the source that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub source_id: SourceId,
    #[serde(flatten)]
    pub report: ActivityReport,
}

impl ActivityEvent {
    pub fn new(source_id: SourceId, report: ActivityReport) -> Self {
        Self { source_id, report }
    }

    pub fn pet_name(&self) -> &str {
        &self.report.pet_name
    }

    pub fn activity(&self) -> Activity {
        self.report.activity
    }
}

/// The `pet-activities-update` payload: latest event per source plus recent history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub current: Vec<ActivityEvent>,
    pub history: Vec<ActivityEvent>,
}
