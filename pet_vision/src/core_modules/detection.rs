// THEORY:
// The `detection` module holds the raw vocabulary handed to us by the object
// detector. Like `SmartBlob`, a `Detection` is a "dumb" data container: a class
// label, a score and a box, valid for exactly one frame. Nothing here remembers
// the past; that is the job of the `tracker`.
//
// Key architectural principles:
// 1.  **Wire Fidelity**: the bounding box travels as a `[x, y, width, height]`
//     array, which is the shape detectors and dashboards already speak.
// 2.  **Subject Selection**: the first prediction whose class is one of the
//     tracked animal classes becomes "the subject". Model output order decides;
//     there is no tie-break by score.

use serde::{Deserialize, Serialize};

/// Classes that can be tracked as the subject of a session.
pub const SUBJECT_CLASSES: [&str; 4] = ["dog", "cat", "bird", "person"];

/// Classes that hint at eating or drinking when found next to the subject.
pub const BOWL_CLASS: &str = "bowl";
pub const DRINK_CLASSES: [&str; 2] = ["cup", "bottle"];

/// A point in image-pixel coordinates, usually the center of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Centroid {
    pub center_x: f64,
    pub center_y: f64,
}

impl Centroid {
    pub fn new(center_x: f64, center_y: f64) -> Self {
        Self { center_x, center_y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: &Centroid) -> f64 {
        ((self.center_x - other.center_x).powi(2) + (self.center_y - other.center_y).powi(2)).sqrt()
    }
}

/// Axis-aligned box, top-left corner plus extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn centroid(&self) -> Centroid {
        Centroid::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One labeled, scored box produced by a single inference pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub score: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class: impl Into<String>, score: f64, bbox: BoundingBox) -> Self {
        Self {
            class: class.into(),
            score,
            bbox,
        }
    }

    pub fn is_subject(&self) -> bool {
        SUBJECT_CLASSES.contains(&self.class.as_str())
    }
}

/// Returns the first prediction that can be tracked as the subject.
pub fn select_subject(predictions: &[Detection]) -> Option<&Detection> {
    predictions.iter().find(|p| p.is_subject())
}
