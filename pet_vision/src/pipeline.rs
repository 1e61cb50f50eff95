// THEORY:
// The `pipeline` module is the top-level API of the activity engine. A
// `DetectionSession` owns one live camera, one detector and all of the state a
// session accumulates, and turns each displayed frame into a `DetectionUpdate`.
//
// Per frame:
// 1.  Skip the frame if the detector or the video surface is not ready yet.
// 2.  Match the canvas to the video's native resolution.
// 3.  Run one inference pass. A failing pass is logged and treated as empty.
// 4.  Pick the subject (first tracked class in model order).
// 5.  Measure its movement against the tracked centroid.
// 6.  Resolve the activity: manual override if set, the classifier otherwise.
// 7.  Publish the update; log only when the label changes.
// 8.  Publish the FPS count once per second. Only processed frames count;
//     `NotReady` and `Skipped` ticks leave the last published value in place.
// 9.  Publish an `ActivityReport` for forwarding and keep it in the local buffer.
//
// Outputs leave through a typed `SessionBus`. The session itself never touches a
// socket or a UI.

use crate::config::{Config, SessionConfig};
use crate::core_modules::activity::{Activity, ActivityReport, Classification};
use crate::core_modules::classifier::{ClassifierConfig, classify};
use crate::core_modules::detection::{Centroid, Detection, select_subject};
use crate::core_modules::history::BoundedHistory;
use crate::core_modules::tracker::FrameTracker;
use crate::core_modules::zone::{Zone, ZoneKind, ZoneRegistry};
use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Confidence reported for a manually overridden activity.
pub const OVERRIDE_CONFIDENCE: f64 = 1.0;

/// One video frame at the camera's native resolution.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

/// A black-box object detector.
pub trait ObjectDetector {
    /// False while the model is still loading.
    fn is_ready(&self) -> bool {
        true
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;
}

/// A camera or video file providing frames.
pub trait VideoSource {
    fn open(&mut self) -> Result<(), VisionError>;

    /// `Ok(None)` when no frame is available yet.
    fn read_frame(&mut self) -> Result<Option<Frame>, VisionError>;

    /// Releases the underlying device. Must be safe to call more than once.
    fn release(&mut self);
}

/// Operator-supplied activity that bypasses the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub enabled: bool,
    pub label: Option<Activity>,
}

impl ManualOverride {
    pub fn label(activity: Activity) -> Self {
        Self {
            enabled: true,
            label: Some(activity),
        }
    }

    /// The label to use, if override mode is on and a label is set.
    pub fn resolve(&self) -> Option<Activity> {
        if self.enabled { self.label } else { None }
    }
}

pub trait OverrideSource {
    fn current(&self) -> ManualOverride;
}

impl OverrideSource for ManualOverride {
    fn current(&self) -> ManualOverride {
        *self
    }
}

impl OverrideSource for watch::Receiver<ManualOverride> {
    fn current(&self) -> ManualOverride {
        *self.borrow()
    }
}

/// Result of one frame, handed to every update subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionUpdate {
    pub subject_detected: bool,
    pub activity: Activity,
    pub confidence: f64,
    /// Rounded to one decimal.
    pub movement: f64,
    pub predictions: Vec<Detection>,
    pub position: Option<Centroid>,
}

impl DetectionUpdate {
    fn empty(predictions: Vec<Detection>) -> Self {
        Self {
            subject_detected: false,
            activity: Activity::Unknown,
            confidence: 0.0,
            movement: 0.0,
            predictions,
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Detector or video surface not ready; nothing was processed.
    NotReady,
    /// Dropped to catch up after a frame overran its budget.
    Skipped,
    Processed(DetectionUpdate),
}

/// Channels a session publishes on. Subscribe before calling `run`.
pub struct SessionBus {
    pub updates_tx: broadcast::Sender<DetectionUpdate>,
    pub activity_tx: broadcast::Sender<ActivityReport>,
    /// Processed frames per second.
    pub fps_tx: watch::Sender<u32>,
}

impl SessionBus {
    pub fn new(capacity: usize) -> Self {
        let (updates_tx, _) = broadcast::channel(capacity.max(1));
        let (activity_tx, _) = broadcast::channel(capacity.max(1));
        let (fps_tx, _) = watch::channel(0);
        Self {
            updates_tx,
            activity_tx,
            fps_tx,
        }
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<DetectionUpdate> {
        self.updates_tx.subscribe()
    }

    pub fn subscribe_activity(&self) -> broadcast::Receiver<ActivityReport> {
        self.activity_tx.subscribe()
    }

    pub fn subscribe_fps(&self) -> watch::Receiver<u32> {
        self.fps_tx.subscribe()
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub deadline_misses: u64,
    pub activities_reported: u64,
}

/// Owns an opened video source and releases it when dropped.
struct CaptureGuard<S: VideoSource> {
    source: S,
}

impl<S: VideoSource> CaptureGuard<S> {
    fn acquire(mut source: S) -> Result<Self, VisionError> {
        if let Err(e) = source.open() {
            source.release();
            return Err(e);
        }
        Ok(Self { source })
    }
}

impl<S: VideoSource> Drop for CaptureGuard<S> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// A live detection session. Dropping it releases the camera.
pub struct DetectionSession<S: VideoSource, D: ObjectDetector, O: OverrideSource> {
    capture: CaptureGuard<S>,
    detector: D,
    overrides: O,
    zones: ZoneRegistry,
    classifier: ClassifierConfig,
    config: SessionConfig,
    tracker: FrameTracker,
    history: BoundedHistory<ActivityReport>,
    bus: SessionBus,
    canvas: (u32, u32),
    skip_next: bool,
    summary: SessionSummary,
}

impl<S: VideoSource, D: ObjectDetector, O: OverrideSource> DetectionSession<S, D, O> {
    /// Opens the video source. On failure the session never starts.
    pub fn start(source: S, detector: D, overrides: O, config: &Config) -> Result<Self, VisionError> {
        let capture = CaptureGuard::acquire(source)?;
        info!(pet = %config.session.pet_name, "detection session started");
        Ok(Self {
            capture,
            detector,
            overrides,
            zones: config.zones.clone(),
            classifier: config.classifier.clone(),
            config: config.session.clone(),
            tracker: FrameTracker::new(Instant::now()),
            history: BoundedHistory::new(config.session.history_capacity),
            bus: SessionBus::new(config.session.bus_capacity),
            canvas: (0, 0),
            skip_next: false,
            summary: SessionSummary::default(),
        })
    }

    pub fn bus(&self) -> &SessionBus {
        &self.bus
    }

    /// Places (or re-places) a zone.
    pub fn set_zone(&mut self, kind: ZoneKind, zone: Zone) {
        info!(zone = %kind, x = zone.x, y = zone.y, "zone placed");
        self.zones.set(kind, zone);
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    /// Drawing surface size, kept equal to the last frame's native resolution.
    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas
    }

    /// Client-local buffer of the reports this session produced.
    pub fn history(&self) -> &BoundedHistory<ActivityReport> {
        &self.history
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Processes one displayed frame.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.detector.is_ready() {
            return TickOutcome::NotReady;
        }
        let frame = match self.capture.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::NotReady,
            Err(e) => {
                warn!(error = %e, "failed to read frame");
                return TickOutcome::NotReady;
            }
        };

        if self.skip_next {
            self.skip_next = false;
            self.summary.frames_skipped += 1;
            return TickOutcome::Skipped;
        }

        self.canvas = (frame.width, frame.height);

        let started = Instant::now();
        let predictions = match self.detector.detect(&frame) {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(error = %e, "inference failed, treating frame as empty");
                Vec::new()
            }
        };
        let elapsed = started.elapsed();
        if elapsed > self.config.frame_budget() {
            self.summary.deadline_misses += 1;
            self.skip_next = true;
            debug!(elapsed_ms = elapsed.as_millis() as u64, "inference overran frame budget");
        }

        TickOutcome::Processed(self.process_predictions(predictions, Instant::now()))
    }

    /// Steps 4 to 9 of the frame: everything after inference.
    pub fn process_predictions(&mut self, predictions: Vec<Detection>, now: Instant) -> DetectionUpdate {
        self.summary.frames_processed += 1;

        let update = match select_subject(&predictions).cloned() {
            Some(subject) => {
                let centroid = subject.bbox.centroid();
                let movement = self.tracker.track(centroid);
                let classification = match self.overrides.current().resolve() {
                    Some(activity) => Classification::new(activity, OVERRIDE_CONFIDENCE),
                    None => classify(&subject, &predictions, movement, &self.zones, &self.classifier),
                };

                if self.tracker.should_log(classification.activity) {
                    info!(
                        pet = %self.config.pet_name,
                        activity = %classification.activity,
                        confidence = classification.confidence,
                        movement = round1(movement),
                        "activity changed"
                    );
                }

                self.report(classification, movement, centroid);

                DetectionUpdate {
                    subject_detected: true,
                    activity: classification.activity,
                    confidence: classification.confidence,
                    movement: round1(movement),
                    predictions,
                    position: Some(centroid),
                }
            }
            None => DetectionUpdate::empty(predictions),
        };

        let _ = self.bus.updates_tx.send(update.clone());

        if let Some(fps) = self.tracker.fps.frame(now) {
            debug!(fps, "frames per second");
            self.bus.fps_tx.send_replace(fps);
        }

        update
    }

    fn report(&mut self, classification: Classification, movement: f64, centroid: Centroid) {
        let report = ActivityReport {
            pet_name: self.config.pet_name.clone(),
            activity: classification.activity,
            confidence: classification.confidence,
            movement,
            timestamp: chrono::Utc::now().timestamp_millis(),
            position: Some(centroid),
        };
        self.history.push(report.clone());
        self.summary.activities_reported += 1;
        // No subscriber is fine: delivery is at-most-once.
        let _ = self.bus.activity_tx.send(report);
    }

    /// Ticks once per displayed frame until `stop` turns true or its sender is
    /// dropped, then releases the camera.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> SessionSummary {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }

        self.stop()
    }

    /// Ends the session and releases the camera.
    pub fn stop(self) -> SessionSummary {
        let summary = self.summary;
        info!(
            frames = summary.frames_processed,
            skipped = summary.frames_skipped,
            deadline_misses = summary.deadline_misses,
            "detection session stopped"
        );
        summary
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
