//! Real-time frame annotation pipeline.
//!
//! Runs on the media-delivery thread, once per captured frame:
//!
//! 1. Hand the frame to the preview sink (every frame, unthrottled).
//! 2. Ask the throttler whether inference may run; drop the frame if not.
//! 3. Run the detection adapter. `None` keeps the previous overlay.
//! 4. Map each detection into overlay-surface space and label it.
//! 5. Hand the finished overlay set to the UI context. Replacement and redraw
//!    happen there, never on this thread.

use std::sync::{Arc, Mutex, TryLockError};

use anyhow::Result;

use crate::detect::{Detection, SharedAdapter};
use crate::frame::Frame;
use crate::geometry::{Rect, Size};
use crate::mapper::CoordinateMapper;
use crate::overlay::{ApproximateTextMeasurer, FontRef, FontSpec, ObjectOverlay, TextMeasurer};
use crate::throttle::FrameThrottler;

const STATS_LOG_EVERY: u64 = 300;

/// Destination of finished overlay sets. Implementations must hand off
/// asynchronously; `submit` is called on the media thread.
pub trait OverlaySink: Send {
    fn submit(&self, overlays: Vec<ObjectOverlay>) -> Result<()>;
}

/// Raw-frame preview consumer. Sees every delivered frame.
pub trait PreviewSink: Send {
    fn present(&mut self, frame: &Frame);
}

/// Engine render-callback contract: frames arrive one at a time, never overlapping.
pub trait FrameSink: Send + Sync {
    fn render_frame(&self, frame: Frame) -> FrameOutcome;
}

/// Overlay-surface bounds published by the UI context for the media thread.
#[derive(Clone, Debug)]
pub struct SharedBounds(Arc<Mutex<Rect>>);

impl SharedBounds {
    pub fn new(bounds: Rect) -> Self {
        Self(Arc::new(Mutex::new(bounds)))
    }

    pub fn publish(&self, bounds: Rect) {
        match self.0.lock() {
            Ok(mut guard) => *guard = bounds,
            Err(poisoned) => *poisoned.into_inner() = bounds,
        }
    }

    pub fn current(&self) -> Rect {
        match self.0.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// What happened to one delivered frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Minimum interval not yet elapsed; inference skipped.
    Throttled,
    /// Adapter had no usable result; overlay left as is.
    NoDetection,
    /// Overlay set handed to the UI context.
    Dispatched { overlays: usize },
    /// Detections could not be mapped (degenerate frame or surface size).
    Unmapped,
    /// UI context no longer accepts work.
    HandoffClosed,
    /// Delivered while a previous frame was still in the pipeline.
    Overlapped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_seen: u64,
    pub frames_accepted: u64,
    pub no_detection: u64,
    pub dispatched: u64,
    pub unmapped: u64,
}

pub struct FramePipeline {
    throttler: FrameThrottler,
    adapter: SharedAdapter,
    mapper: CoordinateMapper,
    font: FontRef,
    measurer: Box<dyn TextMeasurer>,
    bounds: SharedBounds,
    sink: Box<dyn OverlaySink>,
    preview: Option<Box<dyn PreviewSink>>,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(adapter: SharedAdapter, sink: Box<dyn OverlaySink>, bounds: SharedBounds) -> Self {
        Self {
            throttler: FrameThrottler::default(),
            adapter,
            mapper: CoordinateMapper::default(),
            font: Arc::new(FontSpec::default()),
            measurer: Box::new(ApproximateTextMeasurer::default()),
            bounds,
            sink,
            preview: None,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_min_interval_ms(mut self, interval_ms: f64) -> Self {
        self.throttler = FrameThrottler::new(interval_ms);
        self
    }

    pub fn with_edge_offset(mut self, edge_offset: f64) -> Self {
        self.mapper = CoordinateMapper::new(edge_offset);
        self
    }

    pub fn with_font(mut self, font: FontRef) -> Self {
        self.font = font;
        self
    }

    pub fn with_measurer(mut self, measurer: Box<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn throttler(&self) -> &FrameThrottler {
        &self.throttler
    }

    /// Process one delivered frame observed at `now_ms`.
    pub fn on_frame(&mut self, frame: &Frame, now_ms: f64) -> FrameOutcome {
        self.stats.frames_seen += 1;
        if let Some(preview) = self.preview.as_mut() {
            preview.present(frame);
        }

        if !self.throttler.accept(now_ms) {
            return FrameOutcome::Throttled;
        }
        self.stats.frames_accepted += 1;
        if self.stats.frames_accepted % STATS_LOG_EVERY == 0 {
            self.log_stats();
        }

        let detections = match self.adapter.lock() {
            Ok(mut adapter) => adapter.detect(frame),
            Err(_) => {
                log::warn!("detection adapter lock poisoned; skipping frame");
                None
            }
        };
        let Some(detections) = detections else {
            self.stats.no_detection += 1;
            log::debug!("no detection result; keeping previous overlay");
            return FrameOutcome::NoDetection;
        };

        let overlays = match self.build_overlays(&detections, frame.size(), self.bounds.current()) {
            Ok(overlays) => overlays,
            Err(err) => {
                self.stats.unmapped += 1;
                log::warn!("dropping {} detections: {}", detections.len(), err);
                return FrameOutcome::Unmapped;
            }
        };

        let count = overlays.len();
        if let Err(err) = self.sink.submit(overlays) {
            log::warn!("overlay hand-off failed: {}", err);
            return FrameOutcome::HandoffClosed;
        }
        self.stats.dispatched += 1;
        FrameOutcome::Dispatched { overlays: count }
    }

    /// Turn frame-space detections into labeled overlays in `bounds`.
    pub fn build_overlays(
        &self,
        detections: &[Detection],
        frame_size: Size,
        bounds: Rect,
    ) -> Result<Vec<ObjectOverlay>> {
        detections
            .iter()
            .map(|detection| {
                let rect = self.mapper.map(detection.rect, frame_size, bounds)?;
                let label = detection.label();
                let label_size = self.measurer.measure(&label, &self.font);
                Ok(ObjectOverlay {
                    label,
                    rect,
                    label_size,
                    color: detection.display_color,
                    font: self.font.clone(),
                })
            })
            .collect()
    }

    fn log_stats(&self) {
        log::info!(
            "pipeline: seen={} accepted={} dispatched={} no_detection={} unmapped={}",
            self.stats.frames_seen,
            self.stats.frames_accepted,
            self.stats.dispatched,
            self.stats.no_detection,
            self.stats.unmapped
        );
    }
}

/// Pipeline shared with the engine's delivery thread.
///
/// Delivery must be sequential. An overlapping delivery is a contract
/// violation: it panics in debug builds and is logged and dropped otherwise.
#[derive(Clone)]
pub struct SharedPipeline {
    inner: Arc<Mutex<FramePipeline>>,
}

impl SharedPipeline {
    pub fn new(pipeline: FramePipeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Deliver a frame stamped with the process clock.
    pub fn deliver(&self, frame: &Frame) -> FrameOutcome {
        self.deliver_at(frame, crate::now_ms())
    }

    pub fn deliver_at(&self, frame: &Frame, now_ms: f64) -> FrameOutcome {
        match self.inner.try_lock() {
            Ok(mut pipeline) => pipeline.on_frame(frame, now_ms),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().on_frame(frame, now_ms),
            Err(TryLockError::WouldBlock) => {
                debug_assert!(false, "overlapping frame delivery");
                log::error!("overlapping frame delivery; frame dropped");
                FrameOutcome::Overlapped
            }
        }
    }

    /// Run `f` with exclusive access to the pipeline.
    pub fn with_pipeline<T>(&self, f: impl FnOnce(&mut FramePipeline) -> T) -> T {
        match self.inner.lock() {
            Ok(mut pipeline) => f(&mut pipeline),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.with_pipeline(|pipeline| pipeline.stats())
    }
}

impl FrameSink for SharedPipeline {
    fn render_frame(&self, frame: Frame) -> FrameOutcome {
        self.deliver(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectionAdapter;
    use crate::frame::PixelFormat;
    use crate::geometry::Color;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Option<Vec<Detection>>>);

    impl DetectionAdapter for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn detect(&mut self, _frame: &Frame) -> Option<Vec<Detection>> {
            self.0.pop_front().flatten()
        }
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<Vec<ObjectOverlay>>>>);

    impl OverlaySink for Collect {
        fn submit(&self, overlays: Vec<ObjectOverlay>) -> Result<()> {
            self.0.lock().unwrap().push(overlays);
            Ok(())
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 640 * 360 * 4], 640, 360, PixelFormat::Bgra).unwrap()
    }

    fn cat() -> Detection {
        Detection::new("cat", 0.87, Rect::new(0.0, 0.0, 50.0, 50.0), Color::GREEN)
    }

    fn pipeline(script: Vec<Option<Vec<Detection>>>) -> (FramePipeline, Collect) {
        let adapter: SharedAdapter = Arc::new(Mutex::new(Scripted(script.into())));
        let sink = Collect::default();
        let bounds = SharedBounds::new(Rect::new(0.0, 0.0, 320.0, 180.0));
        (FramePipeline::new(adapter, Box::new(sink.clone()), bounds), sink)
    }

    #[test]
    fn accepted_frame_maps_and_labels() {
        let (mut p, sink) = pipeline(vec![Some(vec![cat()])]);
        assert_eq!(p.on_frame(&frame(), 0.0), FrameOutcome::Dispatched { overlays: 1 });

        let batches = sink.0.lock().unwrap();
        let overlay = &batches[0][0];
        assert_eq!(overlay.rect, Rect::new(0.0, 0.0, 25.0, 25.0));
        assert_eq!(overlay.label, "cat  (87%)");
        assert_eq!(overlay.color, Color::GREEN);
        assert!(overlay.label_size.width > 0.0);
    }

    #[test]
    fn throttled_frames_never_reach_the_adapter() {
        let (mut p, sink) = pipeline(vec![Some(vec![cat()]), Some(vec![])]);
        assert!(matches!(p.on_frame(&frame(), 0.0), FrameOutcome::Dispatched { .. }));
        assert_eq!(p.on_frame(&frame(), 66.0), FrameOutcome::Throttled);
        assert_eq!(p.on_frame(&frame(), 133.0), FrameOutcome::Throttled);
        // second scripted answer is still queued for the next accepted frame
        assert_eq!(p.on_frame(&frame(), 200.0), FrameOutcome::Dispatched { overlays: 0 });
        assert_eq!(sink.0.lock().unwrap().len(), 2);
        let stats = p.stats();
        assert_eq!(stats.frames_seen, 4);
        assert_eq!(stats.frames_accepted, 2);
    }

    #[test]
    fn no_detection_submits_nothing() {
        let (mut p, sink) = pipeline(vec![None]);
        assert_eq!(p.on_frame(&frame(), 0.0), FrameOutcome::NoDetection);
        assert!(sink.0.lock().unwrap().is_empty());
        assert_eq!(p.stats().no_detection, 1);
    }

    #[test]
    fn empty_detections_still_submit_an_empty_set() {
        let (mut p, sink) = pipeline(vec![Some(vec![])]);
        assert_eq!(p.on_frame(&frame(), 0.0), FrameOutcome::Dispatched { overlays: 0 });
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[Vec::<ObjectOverlay>::new()]);
    }

    #[test]
    fn degenerate_surface_is_unmapped() {
        let (mut p, sink) = pipeline(vec![Some(vec![cat()])]);
        p.bounds.publish(Rect::default());
        assert_eq!(p.on_frame(&frame(), 0.0), FrameOutcome::Unmapped);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn preview_sees_every_frame() {
        #[derive(Clone, Default)]
        struct Count(Arc<Mutex<u32>>);
        impl PreviewSink for Count {
            fn present(&mut self, _frame: &Frame) {
                *self.0.lock().unwrap() += 1;
            }
        }

        let (p, _) = pipeline(vec![]);
        let count = Count::default();
        let mut p = p.with_preview(Box::new(count.clone()));
        for i in 0..5 {
            p.on_frame(&frame(), i as f64);
        }
        assert_eq!(*count.0.lock().unwrap(), 5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "overlapping frame delivery")]
    fn overlapping_delivery_fails_loudly() {
        let (p, _) = pipeline(vec![]);
        let shared = SharedPipeline::new(p);
        let other = shared.clone();
        shared.with_pipeline(|_| other.deliver_at(&frame(), 0.0));
    }
}
