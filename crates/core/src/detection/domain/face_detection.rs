use crate::shared::bounding_box::BoundingBox;

use super::face_landmarks::FaceLandmarks;

/// One face found in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    /// Detector confidence in [0, 1].
    pub score: f64,
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceDetection {
    pub fn new(bbox: BoundingBox, score: f64, landmarks: Option<FaceLandmarks>) -> Self {
        Self {
            bbox,
            score,
            landmarks,
        }
    }
}
