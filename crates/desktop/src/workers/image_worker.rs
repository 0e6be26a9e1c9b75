use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use facetone_core::analysis::analyze_image_use_case::{AnalyzeImageUseCase, ImageAnalysis};
use facetone_core::analysis::face_analyzer::FaceAnalyzer;
use facetone_core::capture::domain::image_loader::{ImageLoader, ImageSource};
use facetone_core::capture::infrastructure::image_file_loader::ImageFileLoader;

use super::model_cache::ModelCache;

#[derive(Debug, Clone)]
pub enum ImageMessage {
    DownloadProgress(u64, u64),
    Complete(ImageResult),
    Error(String),
}

/// Annotated pixels plus the analysis shown next to them.
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub analysis: ImageAnalysis,
}

pub struct ImageParams {
    pub source: ImageSource,
    pub confidence: f64,
    pub model_cache: Arc<ModelCache>,
}

pub fn spawn(params: ImageParams) -> Receiver<ImageMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<ImageMessage>();

    thread::spawn(move || {
        log::info!("Analyzing image {}", params.source);
        let result = build_analyzer(&tx, &params).and_then(|analyzer| {
            analyze(Box::new(ImageFileLoader::new()), analyzer, &params.source)
        });
        let message = match result {
            Ok(result) => ImageMessage::Complete(result),
            Err(e) => ImageMessage::Error(e.to_string()),
        };
        let _ = tx.send(message);
    });

    rx
}

fn build_analyzer(
    tx: &Sender<ImageMessage>,
    params: &ImageParams,
) -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>> {
    let tx_dl = tx.clone();
    let analyzer = params.model_cache.analyzer(
        params.confidence,
        &|downloaded, total| {
            let _ = tx_dl.send(ImageMessage::DownloadProgress(downloaded, total));
        },
        &AtomicBool::new(false),
    )?;
    Ok(Box::new(analyzer))
}

fn analyze(
    loader: Box<dyn ImageLoader>,
    analyzer: Box<dyn FaceAnalyzer>,
    source: &ImageSource,
) -> Result<ImageResult, Box<dyn std::error::Error>> {
    let mut use_case = AnalyzeImageUseCase::new(loader, analyzer);
    let analyzed = use_case.execute(source)?;
    let annotated = analyzed.annotated();
    Ok(ImageResult {
        rgba: annotated.to_rgba(),
        width: annotated.width(),
        height: annotated.height(),
        analysis: analyzed.analysis,
    })
}
