use crate::detect::backend::DetectionAdapter;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Adapter standing in for a model that is not available.
///
/// Every frame yields `None`, so the pipeline never touches the overlay.
#[derive(Default)]
pub struct StubAdapter {
    frames_seen: u64,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl DetectionAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Option<Vec<Detection>> {
        self.frames_seen += 1;
        None
    }
}
