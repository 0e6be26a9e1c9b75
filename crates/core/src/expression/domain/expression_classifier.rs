use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::expression::ExpressionScores;

/// Domain interface for classifying the expression of one face.
pub trait ExpressionClassifier: Send {
    fn classify(
        &mut self,
        frame: &Frame,
        face: &BoundingBox,
    ) -> Result<ExpressionScores, Box<dyn std::error::Error>>;
}
