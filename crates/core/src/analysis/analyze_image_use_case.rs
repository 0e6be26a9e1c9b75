use std::path::Path;

use crate::analysis::face_analyzer::{annotate_faces, FaceAnalysis, FaceAnalyzer};
use crate::capture::domain::image_loader::{ImageLoader, ImageSource};
use crate::capture::domain::image_writer::ImageWriter;
use crate::expression::domain::expression::ExpressionBreakdown;
use crate::shared::frame::Frame;

/// Outcome of analyzing a single still image.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageAnalysis {
    NoFaceDetected,
    Faces {
        faces: Vec<FaceAnalysis>,
        /// The primary face's confidences as percentages.
        primary: ExpressionBreakdown,
    },
}

impl ImageAnalysis {
    fn from_faces(faces: Vec<FaceAnalysis>) -> Self {
        match faces.first() {
            None => ImageAnalysis::NoFaceDetected,
            Some(first) => {
                let primary = first.scores.to_percentages();
                ImageAnalysis::Faces { faces, primary }
            }
        }
    }

    pub fn faces(&self) -> &[FaceAnalysis] {
        match self {
            ImageAnalysis::NoFaceDetected => &[],
            ImageAnalysis::Faces { faces, .. } => faces,
        }
    }
}

/// The decoded image and what was found in it.
#[derive(Clone, Debug)]
pub struct AnalyzedImage {
    pub frame: Frame,
    pub analysis: ImageAnalysis,
}

impl AnalyzedImage {
    /// Copy of the image with face boxes, landmarks and expression labels drawn in.
    pub fn annotated(&self) -> Frame {
        let mut frame = self.frame.clone();
        annotate_faces(&mut frame, self.analysis.faces());
        frame
    }
}

/// Single-image path: load → analyze once. Nothing is accumulated.
pub struct AnalyzeImageUseCase {
    loader: Box<dyn ImageLoader>,
    analyzer: Box<dyn FaceAnalyzer>,
}

impl AnalyzeImageUseCase {
    pub fn new(loader: Box<dyn ImageLoader>, analyzer: Box<dyn FaceAnalyzer>) -> Self {
        Self { loader, analyzer }
    }

    pub fn execute(&mut self, source: &ImageSource) -> Result<AnalyzedImage, Box<dyn std::error::Error>> {
        let frame = self.loader.load(source)?;
        log::debug!("Loaded {source} ({}x{})", frame.width(), frame.height());
        let faces = self.analyzer.analyze(&frame)?;
        log::info!("Detected {} face(s) in {source}", faces.len());
        Ok(AnalyzedImage {
            frame,
            analysis: ImageAnalysis::from_faces(faces),
        })
    }

    /// Like [`execute`](Self::execute), also writing the annotated image to `output`.
    pub fn execute_annotated(
        &mut self,
        source: &ImageSource,
        writer: &dyn ImageWriter,
        output: &Path,
    ) -> Result<AnalyzedImage, Box<dyn std::error::Error>> {
        let analyzed = self.execute(source)?;
        writer.write(output, &analyzed.annotated())?;
        log::info!("Annotated image written to {}", output.display());
        Ok(analyzed)
    }
}
