// THEORY:
// This file is the main entry point for the `pet_vision` library crate.
//
// The primary goal is to export the `DetectionSession` and its associated data
// structures (`Config`, `DetectionUpdate`, `ActivityReport`, etc.) as the
// high-level interface of the activity engine. The building blocks live in
// `core_modules`: zones, detections, the classifier, the frame tracker and the
// bounded history. `dashboard` is the read side that turns broadcast snapshots
// into statistics.

pub mod config;
pub mod core_modules;
pub mod dashboard;
pub mod error;
pub mod pipeline;

pub use config::{Config, SessionConfig};
pub use core_modules::activity::{
    Activity, ActivityEvent, ActivityReport, ActivitySnapshot, Classification, SourceId,
};
pub use core_modules::classifier::{AncillaryPolicy, ClassifierConfig, classify};
pub use core_modules::detection::{BoundingBox, Centroid, Detection};
pub use core_modules::history::BoundedHistory;
pub use core_modules::zone::{Zone, ZoneKind, ZoneRegistry};
pub use error::{ConfigError, VisionError};
pub use pipeline::{
    DetectionSession, DetectionUpdate, Frame, ManualOverride, ObjectDetector, OverrideSource,
    SessionBus, TickOutcome, VideoSource,
};
