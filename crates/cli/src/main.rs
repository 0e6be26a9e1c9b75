use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};

use facetone_core::analysis::analyze_image_use_case::{AnalyzeImageUseCase, ImageAnalysis};
use facetone_core::analysis::capture_session::{
    CaptureSession, SessionConfig, SessionEvent, SessionSummary,
};
use facetone_core::analysis::face_analyzer::DetectAndClassify;
use facetone_core::analysis::session_logger::LogSessionLogger;
use facetone_core::capture::domain::frame_source::FrameSource;
use facetone_core::capture::domain::image_loader::ImageSource;
use facetone_core::capture::infrastructure::ffmpeg_source::{FfmpegSource, DEFAULT_CAMERA_DEVICE};
use facetone_core::capture::infrastructure::image_file_loader::ImageFileLoader;
use facetone_core::capture::infrastructure::image_file_writer::ImageFileWriter;
use facetone_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use facetone_core::shared::constants::{
    EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, IMAGE_EXTENSIONS, YOLO_MODEL_NAME,
    YOLO_MODEL_URL,
};
use facetone_core::shared::model_resolver;

/// Face expression analysis for still images and live capture.
#[derive(Parser, Debug)]
#[command(name = "facetone", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one image and print the primary face's expressions.
    Image {
        /// Image path, http(s) URL, or `-` to read image bytes from stdin.
        source: String,

        /// Write a copy with face boxes and landmarks drawn in.
        #[arg(long)]
        annotate: Option<PathBuf>,

        /// Face detection confidence threshold (0.0-1.0).
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
        confidence: f64,
    },
    /// Analyze a camera or video file until stopped, then print a summary.
    Session {
        /// Camera device (platform default when neither this nor --input is given).
        #[arg(long)]
        device: Option<String>,

        /// Video file to analyze instead of a camera.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Milliseconds between analyzed frames.
        #[arg(long, default_value = "100")]
        interval_ms: u64,

        /// Stop automatically after this many seconds.
        #[arg(long)]
        duration_secs: Option<f64>,

        /// Face detection confidence threshold (0.0-1.0).
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
        confidence: f64,
    },
}

/// Filter used when `RUST_LOG` is unset, so session lines are shown.
const DEFAULT_LOG_FILTER: &str = "info";

fn log_env(filter_var: &'static str) -> env_logger::Env<'static> {
    env_logger::Env::new()
        .filter_or(filter_var, DEFAULT_LOG_FILTER)
        .write_style("RUST_LOG_STYLE")
}

fn main() {
    env_logger::Builder::from_env(log_env("RUST_LOG")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    match cli.command {
        Command::Image {
            source,
            annotate,
            confidence,
        } => run_image(&source, annotate.as_deref(), confidence),
        Command::Session {
            device,
            input,
            interval_ms,
            duration_secs,
            confidence,
        } => {
            let source: Box<dyn FrameSource> = match input {
                Some(path) => Box::new(FfmpegSource::file(path)),
                None => Box::new(FfmpegSource::camera(
                    device.unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
                )),
            };
            let config = SessionConfig {
                tick_interval: Duration::from_millis(interval_ms),
                ..SessionConfig::default()
            };
            run_session(source, config, session_duration(duration_secs)?, confidence)
        }
    }
}

fn run_image(
    source: &str,
    annotate: Option<&Path>,
    confidence: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = if source == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().lock().read_to_end(&mut bytes)?;
        ImageSource::Bytes(bytes)
    } else {
        ImageSource::from_arg(source)
    };

    let analyzer = build_analyzer(confidence)?;
    let mut use_case = AnalyzeImageUseCase::new(Box::new(ImageFileLoader::new()), Box::new(analyzer));
    let analyzed = match annotate {
        Some(output) => use_case.execute_annotated(&source, &ImageFileWriter::new(), output)?,
        None => use_case.execute(&source)?,
    };

    println!("{}", format_image_analysis(&analyzed.analysis));
    Ok(())
}

fn run_session(
    source: Box<dyn FrameSource>,
    config: SessionConfig,
    duration: Option<Duration>,
    confidence: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let analyzer = build_analyzer(confidence)?;
    let session = CaptureSession::start(
        source,
        Box::new(analyzer),
        config,
        Box::new(LogSessionLogger::default()),
    )?;
    eprintln!("Analyzing {}. Press Enter to stop.", session.metadata().description);

    let enter = spawn_enter_listener(BufReader::new(std::io::stdin()));
    let stdin_closed = crossbeam_channel::never();
    let mut stdin_open = true;
    let deadline = match duration {
        Some(d) => crossbeam_channel::after(d),
        None => crossbeam_channel::never(),
    };
    let events = session.events();

    loop {
        let stdin = if stdin_open { &enter } else { &stdin_closed };
        crossbeam_channel::select! {
            recv(stdin) -> msg => match msg {
                Ok(()) => break,
                // stdin closed; keep running until the deadline or the source ends
                Err(_) => stdin_open = false,
            },
            recv(deadline) -> _ => {
                log::info!("Duration elapsed");
                break;
            }
            recv(events) -> event => match event {
                Ok(SessionEvent::SourceEnded) | Err(_) => break,
                Ok(SessionEvent::Error(e)) => log::warn!("{e}"),
                Ok(SessionEvent::FrameAnalyzed { .. }) => {}
            },
        }
    }

    let summary = session.stop()?;
    println!("{}", format_summary(&summary));
    Ok(())
}

/// Fires once when a line arrives on `input`. EOF or a read error
/// disconnects the channel without firing.
fn spawn_enter_listener<R>(mut input: R) -> crossbeam_channel::Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = input.read_line(&mut line) {
            if n > 0 {
                let _ = tx.send(());
            }
        }
    });
    rx
}

/// Converts `--duration-secs` into a deadline, rejecting values that are
/// not a positive, representable number of seconds.
fn session_duration(secs: Option<f64>) -> Result<Option<Duration>, String> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(Some(d)),
        _ => Err(format!("Duration must be a positive number of seconds, got {secs}")),
    }
}

fn build_analyzer(confidence: f64) -> Result<DetectAndClassify, Box<dyn std::error::Error>> {
    let detector_model = resolve_model(YOLO_MODEL_NAME, YOLO_MODEL_URL)?;
    let expression_model = resolve_model(EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL)?;
    DetectAndClassify::from_models(&detector_model, &expression_model, confidence)
}

fn resolve_model(name: &str, url: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let label = name.to_string();
    let path = model_resolver::resolve(
        name,
        url,
        None,
        Some(Box::new(move |downloaded, total| {
            download_progress(&label, downloaded, total)
        })),
    )?;
    Ok(path)
}

fn format_image_analysis(analysis: &ImageAnalysis) -> String {
    match analysis {
        ImageAnalysis::NoFaceDetected => "No face detected.".to_string(),
        ImageAnalysis::Faces { faces, primary } => {
            let mut out = String::from("Detected Expressions\n");
            out.push_str(&primary.to_string());
            if faces.len() > 1 {
                out.push_str(&format!(
                    "\n({} faces detected, showing the most confident)",
                    faces.len()
                ));
            }
            out
        }
    }
}

fn format_summary(summary: &SessionSummary) -> String {
    let mut out = String::from("Summary of Expressions\n");
    if summary.breakdown.is_empty() {
        out.push_str("No expressions recorded.");
    } else {
        out.push_str(&summary.breakdown.to_string());
    }
    out.push_str(&format!(
        "\n({} frames analyzed, {} with a face, {:.1}s)",
        summary.frames_analyzed,
        summary.frames_with_face,
        summary.duration.as_secs_f64()
    ));
    out
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Image {
            source, confidence, annotate, ..
        } => {
            validate_confidence(*confidence)?;
            if let ImageSource::File(path) = ImageSource::from_arg(source) {
                if source != "-" && !path.exists() {
                    return Err(format!("Input file not found: {}", path.display()).into());
                }
            }
            if let Some(out) = annotate {
                if !is_image(out) {
                    return Err(format!(
                        "Annotated output must be an image ({}), got {}",
                        IMAGE_EXTENSIONS.join(", "),
                        out.display()
                    )
                    .into());
                }
            }
        }
        Command::Session {
            device,
            input,
            interval_ms,
            duration_secs,
            confidence,
        } => {
            validate_confidence(*confidence)?;
            if device.is_some() && input.is_some() {
                return Err("--device and --input are mutually exclusive".into());
            }
            if let Some(path) = input {
                if !path.exists() {
                    return Err(format!("Input file not found: {}", path.display()).into());
                }
            }
            if *interval_ms == 0 {
                return Err("Interval must be greater than 0 ms".into());
            }
            session_duration(*duration_secs)?;
        }
    }
    Ok(())
}

fn validate_confidence(confidence: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetone_core::analysis::face_analyzer::FaceAnalysis;
    use facetone_core::detection::domain::face_detection::FaceDetection;
    use facetone_core::expression::domain::expression::{Expression, ExpressionBreakdown};
    use facetone_core::shared::bounding_box::BoundingBox;
    use crossbeam_channel::RecvTimeoutError;
    use rstest::rstest;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("facetone").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_session_defaults() {
        let cli = parse(&["session"]);
        let Command::Session {
            interval_ms,
            confidence,
            device,
            input,
            duration_secs,
        } = cli.command
        else {
            panic!("expected session");
        };
        assert_eq!(interval_ms, 100);
        assert_eq!(confidence, DEFAULT_CONFIDENCE);
        assert!(device.is_none() && input.is_none() && duration_secs.is_none());
    }

    #[test]
    fn test_device_and_input_are_exclusive() {
        let dir = std::env::temp_dir();
        let cli = parse(&["session", "--device", "0", "--input", dir.to_str().unwrap()]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(validate(&parse(&["session", "--interval-ms", "0"])).is_err());
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        assert!(validate(&parse(&["session", "--confidence", "1.5"])).is_err());
    }

    #[rstest]
    #[case("-2")]
    #[case("0")]
    #[case("NaN")]
    #[case("inf")]
    #[case("1e300")]
    fn test_unusable_duration_rejected(#[case] secs: &str) {
        let arg = format!("--duration-secs={secs}");
        assert!(validate(&parse(&["session", &arg])).is_err());
    }

    #[test]
    fn test_duration_converted() {
        assert_eq!(session_duration(Some(1.5)), Ok(Some(Duration::from_millis(1500))));
        assert_eq!(session_duration(None), Ok(None));
        assert!(session_duration(Some(1e300)).is_err());
    }

    #[test]
    fn test_closed_stdin_does_not_signal_stop() {
        let enter = spawn_enter_listener(Cursor::new(Vec::new()));
        assert_eq!(
            enter.recv_timeout(Duration::from_secs(5)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_enter_signals_stop() {
        let enter = spawn_enter_listener(Cursor::new(b"\n".to_vec()));
        assert_eq!(enter.recv_timeout(Duration::from_secs(5)), Ok(()));
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        let logger = env_logger::Builder::from_env(log_env("FACETONE_TEST_UNSET_FILTER")).build();
        assert_eq!(logger.filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_missing_image_rejected() {
        assert!(validate(&parse(&["image", "/nonexistent/face.jpg"])).is_err());
    }

    #[test]
    fn test_url_and_stdin_sources_skip_file_check() {
        assert!(validate(&parse(&["image", "https://example.com/face.jpg"])).is_ok());
        assert!(validate(&parse(&["image", "-"])).is_ok());
    }

    #[test]
    fn test_annotate_requires_image_extension() {
        let cli = parse(&["image", "-", "--annotate", "out.txt"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_format_no_face() {
        assert_eq!(
            format_image_analysis(&ImageAnalysis::NoFaceDetected),
            "No face detected."
        );
    }

    #[test]
    fn test_format_faces() {
        let face = FaceAnalysis {
            detection: FaceDetection::new(BoundingBox::new(0, 0, 10, 10), 0.9, None),
            scores: [(Expression::Happy, 0.75)].into_iter().collect(),
        };
        let analysis = ImageAnalysis::Faces {
            primary: face.scores.to_percentages(),
            faces: vec![face.clone(), face],
        };
        let text = format_image_analysis(&analysis);
        assert!(text.starts_with("Detected Expressions\nhappy: 75.00%"));
        assert!(text.contains("2 faces detected"));
    }

    #[test]
    fn test_format_summary() {
        let summary = SessionSummary {
            breakdown: ExpressionBreakdown::new(vec![(Expression::Sad, 100.0)]),
            frames_analyzed: 12,
            frames_with_face: 10,
            duration: Duration::from_secs(3),
        };
        assert_eq!(
            format_summary(&summary),
            "Summary of Expressions\nsad: 100.00%\n(12 frames analyzed, 10 with a face, 3.0s)"
        );
    }

    #[test]
    fn test_format_empty_summary() {
        let summary = SessionSummary {
            breakdown: ExpressionBreakdown::default(),
            frames_analyzed: 0,
            frames_with_face: 0,
            duration: Duration::ZERO,
        };
        assert!(format_summary(&summary).contains("No expressions recorded."));
    }
}
