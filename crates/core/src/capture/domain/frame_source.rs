use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// A live or recorded stream of frames.
///
/// The source is configured at construction; `open` acquires the device or
/// file and fails if it is unavailable.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceMetadata, Box<dyn std::error::Error>>;

    /// Lazily decoded frames. Ends when a file runs out; cameras never end.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases the device or file. Safe to call more than once.
    fn close(&mut self);
}
