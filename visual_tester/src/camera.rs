use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use pet_vision::{Frame, VideoSource, VisionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Where frames come from: a camera index or a video file.
#[derive(Debug, Clone)]
pub enum Input {
    Camera(i32),
    File(String),
}

impl Input {
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<i32>() {
            Ok(index) => Input::Camera(index),
            Err(_) => Input::File(arg.to_string()),
        }
    }
}

/// Latest BGR frame, shared with the drawing loop.
pub type FrameTap = Arc<Mutex<Option<Mat>>>;

/// `VideoSource` backed by an OpenCV `VideoCapture`.
pub struct OpenCvCamera {
    input: Input,
    capture: Option<VideoCapture>,
    tap: FrameTap,
    finished: Arc<AtomicBool>,
}

impl OpenCvCamera {
    pub fn new(input: Input) -> Self {
        Self {
            input,
            capture: None,
            tap: Arc::new(Mutex::new(None)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tap(&self) -> FrameTap {
        self.tap.clone()
    }

    /// Set once a video file runs out of frames.
    pub fn finished(&self) -> Arc<AtomicBool> {
        self.finished.clone()
    }
}

fn capture_err(e: opencv::Error) -> VisionError {
    VisionError::Capture(e.to_string())
}

impl VideoSource for OpenCvCamera {
    fn open(&mut self) -> Result<(), VisionError> {
        let capture = match &self.input {
            Input::Camera(index) => VideoCapture::new(*index, videoio::CAP_ANY),
            Input::File(path) => VideoCapture::from_file(path, videoio::CAP_ANY),
        }
        .map_err(capture_err)?;

        if !capture.is_opened().map_err(capture_err)? {
            return Err(VisionError::Capture(format!("cannot open {:?}", self.input)));
        }
        self.capture = Some(capture);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, VisionError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };

        let mut mat = Mat::default();
        if !capture.read(&mut mat).map_err(capture_err)? || mat.empty() {
            if matches!(self.input, Input::File(_)) {
                self.finished.store(true, Ordering::Relaxed);
            }
            return Ok(None);
        }

        let frame = Frame {
            width: mat.cols() as u32,
            height: mat.rows() as u32,
            data: mat.data_bytes().map_err(capture_err)?.to_vec().into(),
        };
        if let Ok(mut slot) = self.tap.lock() {
            *slot = Some(mat);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            let _ = capture.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_argument_is_a_camera() {
        assert!(matches!(Input::parse("0"), Input::Camera(0)));
        assert!(matches!(Input::parse("clips/rex.mp4"), Input::File(p) if p == "clips/rex.mp4"));
    }

    #[test]
    fn release_before_open_is_harmless() {
        let mut camera = OpenCvCamera::new(Input::File("missing.mp4".into()));
        camera.release();
        camera.release();
        assert!(camera.read_frame().unwrap().is_none());
    }
}
