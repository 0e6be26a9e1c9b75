//! Live capture session: a reader thread keeps the newest frame, an analysis
//! thread wakes on a fixed tick and accumulates the primary face's scores.
//!
//! Layout: `source → reader [latest-frame slot] → analysis (tick) → events`
//!
//! The tick channel holds at most one pending tick, so ticks that fire while
//! a detection is running collapse into one and detections never overlap.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::analysis::face_analyzer::{FaceAnalysis, FaceAnalyzer};
use crate::analysis::session_logger::SessionLogger;
use crate::capture::domain::frame_source::FrameSource;
use crate::expression::domain::expression::{Expression, ExpressionBreakdown};
use crate::expression::domain::expression_aggregator::ExpressionAggregator;
use crate::shared::constants::DEFAULT_TICK_INTERVAL;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How often the latest frame is analyzed.
    pub tick_interval: Duration,
    /// Play files back at their native frame rate instead of as fast as
    /// they decode.
    pub pace_file_sources: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            pace_file_sources: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("capture source unavailable: {0}")]
    CaptureUnavailable(String),
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

/// Progress notifications for observers of a running session.
///
/// Delivery is best-effort: events are dropped when the observer lags.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    FrameAnalyzed {
        frame: Frame,
        faces: Vec<FaceAnalysis>,
        dominant: Option<Expression>,
    },
    /// A file source ran out of frames; the session stops analyzing.
    SourceEnded,
    Error(String),
}

/// Result of a stopped session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub breakdown: ExpressionBreakdown,
    pub frames_analyzed: usize,
    pub frames_with_face: usize,
    pub duration: Duration,
}

/// Accumulated state. `request_stop` holds this lock while setting the
/// cancellation token, so the check-then-accumulate step in the analysis
/// thread cannot straddle a stop.
#[derive(Default)]
struct Tally {
    aggregator: ExpressionAggregator,
    frames_analyzed: usize,
}

type FrameSlot = Arc<Mutex<Option<Frame>>>;
type SharedTally = Arc<Mutex<Tally>>;

/// Cloneable cancellation for a running [`CaptureSession`].
///
/// Once `request_stop` returns nothing more is accumulated, including the
/// result of a detection already running.
#[derive(Clone)]
pub struct StopHandle {
    tally: SharedTally,
    cancelled: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        {
            let _tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
            self.cancelled.store(true, Ordering::SeqCst);
        }
        let _ = self.wake.try_send(());
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub struct CaptureSession {
    metadata: SourceMetadata,
    tally: SharedTally,
    source_ended: Arc<AtomicBool>,
    stop_handle: StopHandle,
    events: Receiver<SessionEvent>,
    reader: Option<JoinHandle<()>>,
    analysis: Option<JoinHandle<()>>,
    started: Instant,
}

impl CaptureSession {
    /// Opens `source` and starts the reader and analysis threads.
    ///
    /// Fails without starting anything if the source cannot be opened.
    pub fn start(
        mut source: Box<dyn FrameSource>,
        analyzer: Box<dyn FaceAnalyzer>,
        config: SessionConfig,
        logger: Box<dyn SessionLogger>,
    ) -> Result<Self, SessionError> {
        let metadata = source.open().map_err(|e| {
            source.close();
            SessionError::CaptureUnavailable(e.to_string())
        })?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let source_ended = Arc::new(AtomicBool::new(false));
        let slot: FrameSlot = Arc::new(Mutex::new(None));
        let tally: SharedTally = Arc::new(Mutex::new(Tally::default()));
        tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .aggregator
            .reset();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY);

        let pace = if config.pace_file_sources && !metadata.live {
            metadata.frame_interval()
        } else {
            None
        };

        let reader = spawn_reader(
            source,
            slot.clone(),
            pace,
            cancelled.clone(),
            source_ended.clone(),
            event_tx.clone(),
        );
        let analysis = spawn_analysis(
            analyzer,
            logger,
            slot,
            tally.clone(),
            config.tick_interval,
            stop_rx,
            cancelled.clone(),
            source_ended.clone(),
            event_tx,
        );

        log::info!(
            "Capture session started on {} (tick {:?})",
            metadata.description,
            config.tick_interval
        );

        let stop_handle = StopHandle {
            tally: tally.clone(),
            cancelled,
            wake: stop_tx,
        };

        Ok(Self {
            metadata,
            tally,
            source_ended,
            stop_handle,
            events: event_rx,
            reader: Some(reader),
            analysis: Some(analysis),
            started: Instant::now(),
        })
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Receiver for progress events. Clones share one queue.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    /// `true` once a file source has been fully consumed.
    pub fn source_ended(&self) -> bool {
        self.source_ended.load(Ordering::SeqCst)
    }

    /// Percentages accumulated so far.
    pub fn snapshot(&self) -> ExpressionBreakdown {
        self.lock_tally().aggregator.summarize()
    }

    /// Sets the cancellation token and wakes the analysis thread.
    ///
    /// From this point on no result is accumulated, including one from a
    /// detection already running.
    pub fn request_stop(&self) {
        self.stop_handle.request_stop();
    }

    /// A handle that cancels this session from another thread, e.g. a UI
    /// event handler that does not own the session.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Stops both threads and summarizes everything accumulated before the
    /// stop request.
    pub fn stop(mut self) -> Result<SessionSummary, SessionError> {
        self.request_stop();
        let duration = self.started.elapsed();

        let analysis = self.analysis.take().map(|h| h.join());
        let reader = self.reader.take().map(|h| h.join());

        if let Some(Err(_)) = analysis {
            return Err(SessionError::WorkerPanicked("analysis"));
        }
        if let Some(Err(_)) = reader {
            return Err(SessionError::WorkerPanicked("reader"));
        }

        let summary = {
            let tally = self.lock_tally();
            SessionSummary {
                breakdown: tally.aggregator.summarize(),
                frames_analyzed: tally.frames_analyzed,
                frames_with_face: tally.aggregator.frame_count(),
                duration,
            }
        };
        log::info!(
            "Capture session stopped after {:.1}s: {} frames analyzed, {} with a face",
            duration.as_secs_f64(),
            summary.frames_analyzed,
            summary.frames_with_face
        );
        Ok(summary)
    }

    fn lock_tally(&self) -> std::sync::MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.request_stop();
        if let Some(h) = self.analysis.take() {
            let _ = h.join();
        }
        if let Some(h) = self.reader.take() {
            let _ = h.join();
        }
    }
}

fn spawn_reader(
    mut source: Box<dyn FrameSource>,
    slot: FrameSlot,
    pace: Option<Duration>,
    cancelled: Arc<AtomicBool>,
    source_ended: Arc<AtomicBool>,
    event_tx: Sender<SessionEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in source.frames() {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            match frame_result {
                Ok(frame) => {
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
                }
                Err(e) => {
                    log::warn!("Capture read failed: {e}");
                    let _ = event_tx.try_send(SessionEvent::Error(e.to_string()));
                    break;
                }
            }
            if let Some(interval) = pace {
                std::thread::sleep(interval);
            }
        }
        source.close();
        source_ended.store(true, Ordering::SeqCst);
    })
}

#[allow(clippy::too_many_arguments)]
fn spawn_analysis(
    mut analyzer: Box<dyn FaceAnalyzer>,
    mut logger: Box<dyn SessionLogger>,
    slot: FrameSlot,
    tally: SharedTally,
    tick_interval: Duration,
    stop_rx: Receiver<()>,
    cancelled: Arc<AtomicBool>,
    source_ended: Arc<AtomicBool>,
    event_tx: Sender<SessionEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let ticker = crossbeam_channel::tick(tick_interval);

        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {}
            }
            if cancelled.load(Ordering::SeqCst) {
                break;
            }

            let frame = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            let Some(frame) = frame else {
                // The reader may have stored a last frame between the two checks.
                if source_ended.load(Ordering::SeqCst)
                    && slot.lock().unwrap_or_else(PoisonError::into_inner).is_none()
                {
                    logger.info("Source ended");
                    let _ = event_tx.try_send(SessionEvent::SourceEnded);
                    break;
                }
                continue;
            };

            let t0 = Instant::now();
            let result = analyzer.analyze(&frame);
            logger.timing("analyze", t0.elapsed().as_secs_f64() * 1000.0);

            match result {
                Ok(faces) => {
                    let dominant = faces.first().and_then(FaceAnalysis::dominant);
                    {
                        let mut tally = tally.lock().unwrap_or_else(PoisonError::into_inner);
                        // A stop requested while the detection ran discards its result.
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        tally.frames_analyzed += 1;
                        if let Some(primary) = faces.first() {
                            tally.aggregator.accumulate(&primary.scores);
                        }
                    }
                    logger.frame_analyzed(frame.index(), dominant);
                    let _ = event_tx.try_send(SessionEvent::FrameAnalyzed {
                        frame,
                        faces,
                        dominant,
                    });
                }
                Err(e) => {
                    log::warn!("Analysis failed on frame {}: {e}", frame.index());
                    let _ = event_tx.try_send(SessionEvent::Error(e.to_string()));
                }
            }
        }

        logger.summary();
    })
}
