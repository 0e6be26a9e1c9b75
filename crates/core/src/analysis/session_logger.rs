use std::collections::HashMap;
use std::time::Instant;

use crate::expression::domain::expression::Expression;

/// Observer for capture-session events.
///
/// Keeps the session loop independent of how (or whether) progress is
/// reported: the CLI logs, the GUI listens on the event channel instead.
pub trait SessionLogger: Send {
    /// One tick finished analysis. `dominant` is `None` when no face was found.
    fn frame_analyzed(&mut self, frame_index: usize, dominant: Option<Expression>);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by the desktop app and tests.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame_analyzed(&mut self, _frame_index: usize, _dominant: Option<Expression>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Session logger backed by the `log` facade: one `info` line per face
/// frame, throttled notices for faceless frames, per-stage timings in the
/// final summary. Output appears wherever the installed logger writes.
pub struct LogSessionLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
    faceless_frames: usize,
    messages: Vec<String>,
}

impl LogSessionLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            faceless_frames: 0,
            messages: Vec::new(),
        }
    }

    /// Formatted summary, or `None` if no frame was analyzed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Session summary ({} frames analyzed, {} without a face, {:.1}s):",
            self.frames,
            self.faceless_frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms"
            ));
        }

        if elapsed_ms > 0.0 {
            let rate = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Analysis rate: {rate:.1} frames/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }
}

impl Default for LogSessionLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SessionLogger for LogSessionLogger {
    fn frame_analyzed(&mut self, frame_index: usize, dominant: Option<Expression>) {
        self.frames += 1;
        match dominant {
            Some(expression) => log::info!("Dominant expression: {expression}"),
            None => {
                self.faceless_frames += 1;
                if self.faceless_frames % self.throttle_frames == 1 || self.throttle_frames == 1 {
                    log::info!(
                        "No face in frame {frame_index} ({} faceless so far)",
                        self.faceless_frames
                    );
                }
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_is_noop() {
        let mut logger = NullSessionLogger;
        logger.frame_analyzed(0, Some(Expression::Happy));
        logger.timing("analyze", 5.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_counts_faceless_frames() {
        let mut logger = LogSessionLogger::new(5);
        logger.frame_analyzed(0, Some(Expression::Sad));
        logger.frame_analyzed(1, None);
        logger.frame_analyzed(2, None);
        assert_eq!(logger.frames, 3);
        assert_eq!(logger.faceless_frames, 2);
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogSessionLogger::new(10);
        logger.timing("analyze", 20.0);
        logger.timing("analyze", 30.0);
        let values = logger.timings_for("analyze").unwrap();
        assert_eq!(values.len(), 2);
        assert_relative_eq!(values.iter().sum::<f64>() / 2.0, 25.0);
        assert!(logger.timings_for("missing").is_none());
    }

    #[test]
    fn test_summary_mentions_stages_and_counts() {
        let mut logger = LogSessionLogger::new(10);
        logger.frame_analyzed(0, Some(Expression::Happy));
        logger.frame_analyzed(1, None);
        logger.timing("analyze", 12.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("2 frames analyzed"));
        assert!(summary.contains("1 without a face"));
        assert!(summary.contains("analyze"));
        assert!(summary.contains("max"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogSessionLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = LogSessionLogger::new(10);
        logger.info("camera opened");
        assert_eq!(logger.messages, vec!["camera opened".to_string()]);
    }

    #[test]
    fn test_zero_throttle_clamped() {
        assert_eq!(LogSessionLogger::new(0).throttle_frames, 1);
    }
}
