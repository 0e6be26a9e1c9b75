use crate::shared::frame::Frame;

use super::face_detection::FaceDetection;

/// Domain interface for face detection.
///
/// Results are ordered by descending score, so the first entry is the
/// primary face. `&mut self` because ONNX sessions need exclusive access.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>>;
}
