use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detection model adapter.
///
/// # Contract
///
/// - `detect` is synchronous and may take tens of milliseconds. The pipeline
///   only calls it for frames the throttler has admitted.
/// - `None` means "no usable result for this frame" (model missing, warming
///   up, inference failed). It is not an error; the previous overlay stays up.
/// - `Some(vec![])` means "the model ran and found nothing"; stale boxes are
///   cleared.
/// - Implementations must treat the frame as read-only and must not keep
///   references to its pixels after returning.
pub trait DetectionAdapter: Send {
    /// Adapter identifier, used for registry lookup and logs.
    fn name(&self) -> &'static str;

    /// Run detection on one frame. Output order is the model's own order.
    fn detect(&mut self, frame: &Frame) -> Option<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
