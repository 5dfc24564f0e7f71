//! Vision Call
//!
//! Client core for a live two-party video call with on-device object
//! detection drawn over the local camera feed.
//!
//! # Architecture
//!
//! Two execution contexts, and nothing view-bound is shared between them:
//!
//! 1. **Media thread**: frames arrive one at a time from the call engine's
//!    render path. `FramePipeline` throttles them, runs the detection adapter
//!    and maps results into overlay space.
//! 2. **UI context**: owns the session controller and the overlay renderer.
//!    Finished overlay sets and engine callbacks are posted to it through a
//!    `UiHandle` and applied in order.
//!
//! # Module Structure
//!
//! - `throttle`: Minimum-interval gate in front of inference
//! - `detect`: Detection adapter contract, built-in adapters and registry
//! - `mapper`: Frame-space to overlay-space rectangle mapping with edge clamping
//! - `overlay`: Overlay model, text measurement and the renderer
//! - `pipeline`: Per-frame orchestration on the media thread
//! - `session`: Engine contracts and the call lifecycle state machine
//! - `screen`: UI-context state and engine callback marshaling
//! - `ui`: Task queue that stands in for the UI thread's run loop
//! - `capture`: Synthetic local camera
//! - `config`: File and environment configuration

use std::sync::OnceLock;
use std::time::Instant;

pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod geometry;
pub mod mapper;
pub mod overlay;
pub mod pipeline;
pub mod screen;
pub mod session;
pub mod throttle;
pub mod ui;

pub use capture::{CaptureConfig, SyntheticCamera};
pub use config::CallConfig;
pub use detect::{AdapterRegistry, Detection, DetectionAdapter, SharedAdapter};
pub use frame::{Frame, PixelFormat, Rotation};
pub use geometry::{Color, Rect, Size};
pub use mapper::CoordinateMapper;
pub use overlay::{
    ApproximateTextMeasurer, FontRef, FontSpec, FontWeight, LogSurface, ObjectOverlay,
    OverlayRenderer, OverlayStyle, OverlaySurface, TextMeasurer,
};
pub use pipeline::{
    FrameOutcome, FramePipeline, FrameSink, OverlaySink, PipelineStats, PreviewSink,
    SharedBounds, SharedPipeline,
};
pub use screen::{CallScreen, EngineEventBridge, OverlayApply};
pub use session::{
    CallEngine, CallSessionController, DisplayHost, EngineEvent, EngineEventHandler,
    SessionSettings, SessionState, ViewFlags,
};
pub use throttle::FrameThrottler;
pub use ui::{UiHandle, UiQueue};

static CLOCK_ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed on a monotonic process clock.
///
/// The origin is fixed the first time this is called, so only differences
/// between readings are meaningful.
pub fn now_ms() -> f64 {
    CLOCK_ORIGIN
        .get_or_init(Instant::now)
        .elapsed()
        .as_secs_f64()
        * 1000.0
}
