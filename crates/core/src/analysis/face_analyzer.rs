use std::path::Path;

use crate::capture::infrastructure::frame_annotator::FrameAnnotator;
use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use crate::expression::domain::expression::{Expression, ExpressionScores};
use crate::expression::domain::expression_classifier::ExpressionClassifier;
use crate::expression::infrastructure::onnx_expression_classifier::OnnxExpressionClassifier;
use crate::shared::frame::Frame;

/// A detected face together with its expression confidences.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnalysis {
    pub detection: FaceDetection,
    pub scores: ExpressionScores,
}

impl FaceAnalysis {
    pub fn dominant(&self) -> Option<Expression> {
        self.scores.dominant()
    }

    /// Overlay text such as `happy 92%`; `None` without scores.
    pub fn label(&self) -> Option<String> {
        let dominant = self.dominant()?;
        let confidence = self.scores.get(dominant)?;
        Some(format!("{dominant} {:.0}%", confidence * 100.0))
    }
}

/// Draws each face's box, landmarks and expression label into `frame`.
pub fn annotate_faces(frame: &mut Frame, faces: &[FaceAnalysis]) {
    let annotator = FrameAnnotator::for_frame(frame);
    annotator.annotate(frame, faces.iter().map(|f| &f.detection));
    for face in faces {
        if let Some(label) = face.label() {
            annotator.draw_label(frame, &face.detection.bbox, &label);
        }
    }
}

/// Opaque face-expression service: frame in, analyzed faces out.
///
/// The first entry, when present, is the primary face.
pub trait FaceAnalyzer: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>>;
}

/// Runs a detector, then classifies every face that overlaps the frame.
pub struct DetectAndClassify {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn ExpressionClassifier>,
}

impl DetectAndClassify {
    pub fn new(detector: Box<dyn FaceDetector>, classifier: Box<dyn ExpressionClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Loads the ONNX face detector and expression classifier.
    pub fn from_models(
        detector_model: &Path,
        expression_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(
            Box::new(OnnxYoloDetector::new(detector_model, confidence)?),
            Box::new(OnnxExpressionClassifier::new(expression_model)?),
        ))
    }
}

impl FaceAnalyzer for DetectAndClassify {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>> {
        let detections = self.detector.detect(frame)?;
        let mut faces = Vec::with_capacity(detections.len());
        for detection in detections {
            if detection.bbox.clamped(frame.width(), frame.height()).is_none() {
                continue;
            }
            let scores = self.classifier.classify(frame, &detection.bbox)?;
            faces.push(FaceAnalysis { detection, scores });
        }
        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    struct StubDetector {
        boxes: Vec<BoundingBox>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
            Ok(self
                .boxes
                .iter()
                .map(|b| FaceDetection::new(*b, 0.9, None))
                .collect())
        }
    }

    /// Scores each face as happy in proportion to its x coordinate.
    struct StubClassifier;

    impl ExpressionClassifier for StubClassifier {
        fn classify(
            &mut self,
            _frame: &Frame,
            face: &BoundingBox,
        ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
            Ok([(Expression::Happy, face.x as f64 / 100.0)].into_iter().collect())
        }
    }

    struct FailingClassifier;

    impl ExpressionClassifier for FailingClassifier {
        fn classify(
            &mut self,
            _frame: &Frame,
            _face: &BoundingBox,
        ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
            Err("model exploded".into())
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, 0)
    }

    #[test]
    fn test_classifies_faces_in_detector_order() {
        let mut analyzer = DetectAndClassify::new(
            Box::new(StubDetector {
                boxes: vec![BoundingBox::new(40, 0, 10, 10), BoundingBox::new(10, 0, 10, 10)],
            }),
            Box::new(StubClassifier),
        );
        let faces = analyzer.analyze(&frame()).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].scores.get(Expression::Happy), Some(0.4));
        assert_eq!(faces[1].scores.get(Expression::Happy), Some(0.1));
        assert_eq!(faces[0].dominant(), Some(Expression::Happy));
    }

    #[test]
    fn test_skips_boxes_outside_frame() {
        let mut analyzer = DetectAndClassify::new(
            Box::new(StubDetector {
                boxes: vec![BoundingBox::new(500, 500, 10, 10)],
            }),
            Box::new(FailingClassifier),
        );
        assert!(analyzer.analyze(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_no_faces_is_empty() {
        let mut analyzer = DetectAndClassify::new(
            Box::new(StubDetector { boxes: vec![] }),
            Box::new(FailingClassifier),
        );
        assert!(analyzer.analyze(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_classifier_error_propagates() {
        let mut analyzer = DetectAndClassify::new(
            Box::new(StubDetector {
                boxes: vec![BoundingBox::new(0, 0, 10, 10)],
            }),
            Box::new(FailingClassifier),
        );
        assert!(analyzer.analyze(&frame()).is_err());
    }

    fn analysis(bbox: BoundingBox, scores: &[(Expression, f64)]) -> FaceAnalysis {
        FaceAnalysis {
            detection: FaceDetection::new(bbox, 0.9, None),
            scores: scores.iter().copied().collect(),
        }
    }

    #[test]
    fn test_label_names_dominant_expression() {
        let face = analysis(
            BoundingBox::new(0, 0, 10, 10),
            &[(Expression::Sad, 0.05), (Expression::Happy, 0.92)],
        );
        assert_eq!(face.label().as_deref(), Some("happy 92%"));
        assert_eq!(analysis(BoundingBox::new(0, 0, 10, 10), &[]).label(), None);
    }

    #[test]
    fn test_annotate_faces_draws_label_above_box() {
        let mut frame = frame();
        let face = analysis(BoundingBox::new(20, 40, 30, 30), &[(Expression::Happy, 0.92)]);
        annotate_faces(&mut frame, &[face]);

        let pixels = frame.as_ndarray();
        let white = (30..40)
            .flat_map(|y| (20..94).map(move |x| (x, y)))
            .filter(|&(x, y)| (0..3).all(|c| pixels[[y, x, c]] == 255))
            .count();
        assert!(white > 0);
        assert_eq!(pixels[[45, 20, 2]], 255);
        assert_eq!(pixels[[55, 35, 2]], 0);
    }
}
