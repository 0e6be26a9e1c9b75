use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use facetone_core::analysis::capture_session::{
    CaptureSession, SessionConfig, SessionEvent, SessionSummary, StopHandle,
};
use facetone_core::analysis::face_analyzer::{annotate_faces, FaceAnalysis, FaceAnalyzer};
use facetone_core::analysis::session_logger::NullSessionLogger;
use facetone_core::capture::domain::frame_source::FrameSource;
use facetone_core::capture::infrastructure::ffmpeg_source::FfmpegSource;
use facetone_core::expression::domain::expression::Expression;
use facetone_core::shared::frame::Frame;

use super::model_cache::ModelCache;

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Messages sent from the camera worker to the UI.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    DownloadProgress(u64, u64),
    Started(String),
    Frame(PreviewFrame),
    Warning(String),
    Finished(SessionSummary),
    Error(String),
    Cancelled,
}

/// An analyzed camera frame, annotated and ready for display.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub index: usize,
    pub faces: usize,
    pub dominant: Option<Expression>,
}

impl PreviewFrame {
    fn annotated(mut frame: Frame, faces: &[FaceAnalysis], dominant: Option<Expression>) -> Self {
        annotate_faces(&mut frame, faces);
        Self {
            rgba: frame.to_rgba(),
            width: frame.width(),
            height: frame.height(),
            index: frame.index(),
            faces: faces.len(),
            dominant,
        }
    }
}

/// Stop request shared by the UI and the camera worker.
///
/// Before the session exists it only marks the request; once the worker
/// attaches the session's [`StopHandle`], `request` cancels the session
/// directly, so nothing is accumulated after the user presses Stop.
#[derive(Default)]
pub struct CameraStop {
    requested: AtomicBool,
    session: Mutex<Option<StopHandle>>,
}

impl CameraStop {
    pub fn request(&self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        self.requested.store(true, Ordering::SeqCst);
        if let Some(handle) = session.as_ref() {
            handle.request_stop();
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn attach(&self, handle: StopHandle) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_requested() {
            handle.request_stop();
        }
        *session = Some(handle);
    }
}

pub struct SessionParams {
    pub device: String,
    pub confidence: f64,
    pub tick_interval: Duration,
    pub model_cache: Arc<ModelCache>,
}

/// Spawn a camera session worker. Requesting a stop through the returned
/// handle ends the session; the worker then reports
/// [`SessionMessage::Finished`].
pub fn spawn(params: SessionParams) -> (Receiver<SessionMessage>, Arc<CameraStop>) {
    let (tx, rx) = crossbeam_channel::unbounded::<SessionMessage>();
    let stop = Arc::new(CameraStop::default());
    let stop_clone = stop.clone();

    thread::spawn(move || {
        if let Err(e) = run_camera(&tx, &stop_clone, &params) {
            if stop_clone.is_requested() {
                let _ = tx.send(SessionMessage::Cancelled);
            } else {
                let _ = tx.send(SessionMessage::Error(e.to_string()));
            }
        }
    });

    (rx, stop)
}

fn run_camera(
    tx: &Sender<SessionMessage>,
    stop: &CameraStop,
    params: &SessionParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let tx_dl = tx.clone();
    let analyzer = params.model_cache.analyzer(
        params.confidence,
        &|downloaded, total| {
            let _ = tx_dl.send(SessionMessage::DownloadProgress(downloaded, total));
        },
        &stop.requested,
    )?;

    if stop.is_requested() {
        return Err("Cancelled".into());
    }

    let config = SessionConfig {
        tick_interval: params.tick_interval,
        ..SessionConfig::default()
    };
    run_capture(
        Box::new(FfmpegSource::camera(params.device.clone())),
        Box::new(analyzer),
        config,
        tx,
        stop,
    )
}

/// Runs one session until `stop` is set or the source ends, forwarding
/// analyzed frames to the UI.
fn run_capture(
    source: Box<dyn FrameSource>,
    analyzer: Box<dyn FaceAnalyzer>,
    config: SessionConfig,
    tx: &Sender<SessionMessage>,
    stop: &CameraStop,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = CaptureSession::start(source, analyzer, config, Box::new(NullSessionLogger))?;
    stop.attach(session.stop_handle());
    let _ = tx.send(SessionMessage::Started(session.metadata().description.clone()));

    let events = session.events();
    while !stop.is_requested() {
        match events.recv_timeout(EVENT_POLL) {
            Ok(SessionEvent::FrameAnalyzed {
                frame,
                faces,
                dominant,
            }) => {
                let preview = PreviewFrame::annotated(frame, &faces, dominant);
                let _ = tx.send(SessionMessage::Frame(preview));
            }
            Ok(SessionEvent::SourceEnded) => break,
            Ok(SessionEvent::Error(e)) => {
                let _ = tx.send(SessionMessage::Warning(e));
            }
            Err(RecvTimeoutError::Timeout) => {
                if session.source_ended() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let summary = session.stop()?;
    let _ = tx.send(SessionMessage::Finished(summary));
    Ok(())
}
