//! FER+ expression classifier over ONNX Runtime.
//!
//! Input: `[1, 1, 64, 64]` grayscale face crop with raw 0-255 values.
//! Output: 8 logits ordered neutral, happiness, surprise, sadness, anger,
//! disgust, fear, contempt.
use std::path::Path;

use image::imageops::FilterType;
use image::GrayImage;

use crate::detection::infrastructure::execution_provider::build_session;
use crate::detection::infrastructure::math::softmax;
use crate::expression::domain::expression::{Expression, ExpressionScores};
use crate::expression::domain::expression_classifier::ExpressionClassifier;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: u32 = 64;

/// Extra context around the detector box, as a fraction of its longer edge.
const CROP_MARGIN: f64 = 0.1;

/// Model output index → expression. Contempt has no counterpart and is
/// folded into disgust.
const OUTPUT_LABELS: [Expression; 8] = [
    Expression::Neutral,
    Expression::Happy,
    Expression::Surprised,
    Expression::Sad,
    Expression::Angry,
    Expression::Disgusted,
    Expression::Fearful,
    Expression::Disgusted,
];

pub struct OnnxExpressionClassifier {
    session: ort::session::Session,
}

impl OnnxExpressionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: build_session(model_path)?,
        })
    }
}

impl ExpressionClassifier for OnnxExpressionClassifier {
    fn classify(
        &mut self,
        frame: &Frame,
        face: &BoundingBox,
    ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
        let input = preprocess(frame, face).ok_or("Face box lies outside the frame")?;

        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Expression model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let logits: Vec<f32> = tensor.iter().copied().collect();
        if logits.len() != OUTPUT_LABELS.len() {
            return Err(format!(
                "Expected {} expression logits, got {}",
                OUTPUT_LABELS.len(),
                logits.len()
            )
            .into());
        }
        Ok(to_scores(&logits))
    }
}

/// Square crop around `face`, grayscale, resized to the model input.
fn preprocess(frame: &Frame, face: &BoundingBox) -> Option<ndarray::Array4<f32>> {
    let crop = frame.crop(&face.square(CROP_MARGIN))?;
    let gray = GrayImage::from_raw(crop.width(), crop.height(), crop.to_grayscale())?;
    let resized = image::imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, size, size));
    for (x, y, px) in resized.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = px.0[0] as f32;
    }
    Some(tensor)
}

fn to_scores(logits: &[f32]) -> ExpressionScores {
    let mut scores: ExpressionScores = Expression::ALL.into_iter().map(|e| (e, 0.0)).collect();
    for (p, expression) in softmax(logits).into_iter().zip(OUTPUT_LABELS) {
        let current = scores.get(expression).unwrap_or(0.0);
        scores.set(expression, current + p);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_shape_and_range() {
        let frame = Frame::new(vec![200u8; 120 * 80 * 3], 120, 80, 3, 0);
        let tensor = preprocess(&frame, &BoundingBox::new(30, 20, 40, 40)).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, 64, 64]);
        assert_relative_eq!(tensor[[0, 0, 32, 32]], 200.0, epsilon = 1.0);
    }

    #[test]
    fn test_preprocess_box_outside_frame() {
        let frame = Frame::new(vec![0u8; 10 * 10 * 3], 10, 10, 3, 0);
        assert!(preprocess(&frame, &BoundingBox::new(50, 50, 5, 5)).is_none());
    }

    #[test]
    fn test_scores_cover_all_expressions_and_sum_to_one() {
        let scores = to_scores(&[0.0, 2.0, 0.5, 0.1, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(scores.len(), Expression::ALL.len());
        let sum: f64 = scores.iter().map(|(_, v)| v).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        assert_eq!(scores.dominant(), Some(Expression::Happy));
    }

    #[test]
    fn test_contempt_folds_into_disgusted() {
        // Equal logits: every output gets 1/8, disgust receives two shares.
        let scores = to_scores(&[1.0; 8]);
        assert_relative_eq!(scores.get(Expression::Disgusted).unwrap(), 0.25, epsilon = 1e-9);
        assert_relative_eq!(scores.get(Expression::Neutral).unwrap(), 0.125, epsilon = 1e-9);
    }

    #[test]
    fn test_surprise_index_maps_to_surprised() {
        let scores = to_scores(&[0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(scores.dominant(), Some(Expression::Surprised));
    }
}
