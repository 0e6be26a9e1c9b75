/// Describes a capture source once it has been opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0.0 when the source does not report one.
    pub fps: f64,
    /// `true` for cameras, `false` for files that eventually end.
    pub live: bool,
    /// Human-readable origin, e.g. `/dev/video0` or a file path.
    pub description: String,
}

impl SourceMetadata {
    /// Delay between frames at the nominal rate, if known.
    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        if self.fps > 0.0 && self.fps.is_finite() {
            Some(std::time::Duration::from_secs_f64(1.0 / self.fps))
        } else {
            None
        }
    }
}
