// THEORY:
// The `tracker` module gives a detection session its memory. The detector sees
// every frame in isolation; the tracker remembers where the subject was last
// frame so that its displacement ("movement") can be measured, counts frames for
// the FPS readout, and remembers the last activity it logged so logs only fire on
// label changes.
//
// Key architectural principles:
// 1.  **Session Ownership**: a `FrameTracker` belongs to exactly one detection
//     session and is mutated only by it. Nothing is shared across sessions.
// 2.  **Object Persistence, Simplified**: there is a single subject per session,
//     so the data association problem reduces to "the previous centroid".
// 3.  **Non-negative Movement**: movement is a Euclidean distance and is exactly
//     zero on the first frame a subject is seen.

use crate::core_modules::activity::Activity;
use crate::core_modules::detection::Centroid;
use std::time::{Duration, Instant};

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Holds the per-session tracking state threaded through the detection loop.
#[derive(Debug)]
pub struct FrameTracker {
    /// The subject's centroid in the last frame it was seen.
    last_centroid: Option<Centroid>,
    /// The last activity label that was written to the log.
    last_logged: Option<Activity>,
    /// Frames processed since the last FPS emission.
    pub fps: FpsCounter,
}

impl FrameTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            last_centroid: None,
            last_logged: None,
            fps: FpsCounter::new(now),
        }
    }

    /// Records the subject's new centroid and returns its displacement from the
    /// previous one, or `0.0` when there was none.
    pub fn track(&mut self, centroid: Centroid) -> f64 {
        let movement = self
            .last_centroid
            .map(|previous| previous.distance_to(&centroid))
            .unwrap_or(0.0);
        self.last_centroid = Some(centroid);
        movement
    }

    pub fn last_centroid(&self) -> Option<Centroid> {
        self.last_centroid
    }

    /// Returns true when `activity` differs from the last logged label, and
    /// records it as logged.
    pub fn should_log(&mut self, activity: Activity) -> bool {
        if self.last_logged == Some(activity) {
            return false;
        }
        self.last_logged = Some(activity);
        true
    }
}

/// Counts frames and yields the count once per elapsed second of wall time.
///
/// The session feeds it processed frames only, so the rate reflects inference
/// throughput rather than the display tick rate.
#[derive(Debug)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
        }
    }

    /// Counts one frame. Returns the accumulated count when a full second has
    /// passed since the last emission, resetting the counter.
    pub fn frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) < FPS_WINDOW {
            return None;
        }
        let fps = self.frames;
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_zero_movement() {
        let mut tracker = FrameTracker::new(Instant::now());
        assert_eq!(tracker.track(Centroid::new(10.0, 10.0)), 0.0);
        assert_eq!(tracker.last_centroid(), Some(Centroid::new(10.0, 10.0)));
    }

    #[test]
    fn movement_is_distance_to_previous_centroid() {
        let mut tracker = FrameTracker::new(Instant::now());
        tracker.track(Centroid::new(0.0, 0.0));
        let movement = tracker.track(Centroid::new(3.0, 4.0));
        assert!((movement - 5.0).abs() < 1e-9);
        assert!(tracker.track(Centroid::new(3.0, 4.0)) >= 0.0);
    }

    #[test]
    fn logs_only_on_label_change() {
        let mut tracker = FrameTracker::new(Instant::now());
        assert!(tracker.should_log(Activity::Walking));
        assert!(!tracker.should_log(Activity::Walking));
        assert!(tracker.should_log(Activity::Resting));
        assert!(tracker.should_log(Activity::Walking));
    }

    #[test]
    fn fps_emitted_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        for i in 1..30 {
            assert_eq!(fps.frame(start + Duration::from_millis(i * 30)), None);
        }
        assert_eq!(fps.frame(start + Duration::from_millis(1000)), Some(30));
        assert_eq!(fps.frame(start + Duration::from_millis(1100)), None);
        assert_eq!(fps.frame(start + Duration::from_millis(2000)), Some(2));
    }
}
