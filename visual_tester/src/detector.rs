// THEORY:
// `YoloDetector` is the black-box model behind the `ObjectDetector` seam. It
// runs a YOLOv8 ONNX export through OpenCV's dnn module and turns the raw
// `[1, 84, N]` tensor into `Detection`s in frame pixels.
//
// Post-processing is a plain function over `&[f32]`:
// 1.  For every anchor, take the best of the 80 class scores.
// 2.  Drop anchors below the score threshold.
// 3.  Rescale the center/size box from model input space to the frame.
// 4.  Greedy per-class non-maximum suppression, highest score first.

use opencv::{
    core::{self, Mat, Scalar, Size},
    dnn,
    prelude::*,
};
use pet_vision::{BoundingBox, Detection, Frame, ObjectDetector, VisionError};

/// Model input edge, in pixels.
pub const INPUT_SIZE: i32 = 640;
pub const SCORE_THRESHOLD: f32 = 0.5;
pub const IOU_THRESHOLD: f64 = 0.45;
pub const MAX_DETECTIONS: usize = 20;

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Values per anchor: 4 box terms plus one score per class.
const ROW_LEN: usize = 4 + COCO_CLASSES.len();

pub struct YoloDetector {
    net: dnn::Net,
}

impl YoloDetector {
    pub fn load(model_path: &str) -> Result<Self, VisionError> {
        let net = dnn::read_net_from_onnx(model_path).map_err(inference_err)?;
        if net.empty().map_err(inference_err)? {
            return Err(VisionError::Inference(format!("model {model_path} is empty")));
        }
        tracing::info!(model = model_path, "object detector loaded");
        Ok(Self { net })
    }
}

fn inference_err(e: opencv::Error) -> VisionError {
    VisionError::Inference(e.to_string())
}

impl ObjectDetector for YoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        // --- 1. Rebuild the BGR image from the frame bytes ---
        let flat = Mat::from_slice(&frame.data[..]).map_err(inference_err)?;
        let image = flat
            .reshape(3, frame.height as i32)
            .map_err(inference_err)?
            .try_clone()
            .map_err(inference_err)?;

        // --- 2. Forward pass ---
        let blob = dnn::blob_from_image(
            &image,
            1.0 / 255.0,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            Scalar::default(),
            true,
            false,
            core::CV_32F,
        )
        .map_err(inference_err)?;
        self.net
            .set_input(&blob, "", 1.0, Scalar::default())
            .map_err(inference_err)?;
        let output = self.net.forward_single("").map_err(inference_err)?;

        // --- 3. Decode ---
        let values = output.data_typed::<f32>().map_err(inference_err)?;
        let scale = (
            frame.width as f64 / INPUT_SIZE as f64,
            frame.height as f64 / INPUT_SIZE as f64,
        );
        Ok(decode_output(values, scale))
    }
}

/// Decodes a channel-major `[84, N]` YOLOv8 output.
pub fn decode_output(values: &[f32], scale: (f64, f64)) -> Vec<Detection> {
    let anchors = values.len() / ROW_LEN;
    let at = |row: usize, anchor: usize| values[row * anchors + anchor];

    let mut candidates: Vec<(usize, f32, BoundingBox)> = Vec::new();
    for anchor in 0..anchors {
        let Some((class, score)) = (0..COCO_CLASSES.len())
            .map(|c| (c, at(4 + c, anchor)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        if score < SCORE_THRESHOLD {
            continue;
        }
        let (cx, cy, w, h) = (
            at(0, anchor) as f64,
            at(1, anchor) as f64,
            at(2, anchor) as f64,
            at(3, anchor) as f64,
        );
        let bbox = BoundingBox::new(
            (cx - w / 2.0) * scale.0,
            (cy - h / 2.0) * scale.1,
            w * scale.0,
            h * scale.1,
        );
        candidates.push((class, score, bbox));
    }

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut kept: Vec<(usize, f32, BoundingBox)> = Vec::new();
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.0 == candidate.0 && iou(&k.2, &candidate.2) > IOU_THRESHOLD);
        if !overlaps {
            kept.push(candidate);
        }
        if kept.len() == MAX_DETECTIONS {
            break;
        }
    }

    kept.into_iter()
        .map(|(class, score, bbox)| Detection::new(COCO_CLASSES[class], score as f64, bbox))
        .collect()
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = (a.x + a.width).min(b.x + b.width);
    let bottom = (a.y + a.height).min(b.y + b.height);
    let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;
    if union <= 0.0 { 0.0 } else { intersection / union }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_index(name: &str) -> usize {
        COCO_CLASSES.iter().position(|c| *c == name).unwrap()
    }

    /// Builds a channel-major tensor from `(cx, cy, w, h, class, score)` anchors.
    fn tensor(anchors: &[(f32, f32, f32, f32, &str, f32)]) -> Vec<f32> {
        let n = anchors.len();
        let mut values = vec![0.0; ROW_LEN * n];
        for (i, (cx, cy, w, h, class, score)) in anchors.iter().enumerate() {
            values[i] = *cx;
            values[n + i] = *cy;
            values[2 * n + i] = *w;
            values[3 * n + i] = *h;
            values[(4 + class_index(class)) * n + i] = *score;
        }
        values
    }

    #[test]
    fn decodes_and_rescales_boxes() {
        let values = tensor(&[(320.0, 320.0, 100.0, 50.0, "dog", 0.9)]);
        let detections = decode_output(&values, (2.0, 1.0));
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, "dog");
        assert_eq!(detections[0].bbox, BoundingBox::new(540.0, 295.0, 200.0, 50.0));
    }

    #[test]
    fn drops_low_scores() {
        let values = tensor(&[(10.0, 10.0, 5.0, 5.0, "cup", 0.3)]);
        assert!(decode_output(&values, (1.0, 1.0)).is_empty());
    }

    #[test]
    fn suppresses_overlapping_boxes_of_the_same_class() {
        let values = tensor(&[
            (100.0, 100.0, 50.0, 50.0, "dog", 0.7),
            (102.0, 101.0, 50.0, 50.0, "dog", 0.9),
            (101.0, 100.0, 50.0, 50.0, "bowl", 0.6),
        ]);
        let detections = decode_output(&values, (1.0, 1.0));
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class, "dog");
        assert!((detections[0].score - 0.9).abs() < 1e-6);
        assert_eq!(detections[1].class, "bowl");
    }
}
