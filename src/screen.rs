//! The call screen: everything owned by the UI context.
//!
//! `CallScreen` bundles the session controller with the overlay renderer so
//! that both mutate only on the UI thread. The media thread and engine
//! callbacks reach it through `UiHandle<CallScreen>`.

use std::sync::Arc;

use anyhow::Result;

use crate::geometry::{Rect, Size};
use crate::overlay::{ObjectOverlay, OverlayRenderer};
use crate::pipeline::{OverlaySink, SharedBounds};
use crate::session::{
    CallSessionController, EngineCommand, EngineEvent, EngineEventHandler, OfflineReason,
    SessionState,
};
use crate::ui::UiHandle;

/// Result of handing an overlay set to the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayApply {
    Applied { overlays: usize },
    /// The call ended before the set arrived.
    Stale,
}

pub struct CallScreen {
    session: CallSessionController,
    overlay: OverlayRenderer,
    bounds: SharedBounds,
    stale_discards: u64,
}

impl CallScreen {
    pub fn new(session: CallSessionController, overlay: OverlayRenderer) -> Self {
        let bounds = SharedBounds::new(overlay.bounds());
        Self {
            session,
            overlay,
            bounds,
            stale_discards: 0,
        }
    }

    /// Bounds handle for the pipeline. Updated by `set_overlay_bounds`.
    pub fn shared_bounds(&self) -> SharedBounds {
        self.bounds.clone()
    }

    pub fn session(&self) -> &CallSessionController {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CallSessionController {
        &mut self.session
    }

    pub fn overlay(&self) -> &OverlayRenderer {
        &self.overlay
    }

    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    /// Replace the overlay set and redraw, unless the call is no longer active.
    pub fn apply_overlays(&mut self, overlays: Vec<ObjectOverlay>) -> OverlayApply {
        if self.session.state() != SessionState::InCall {
            self.stale_discards += 1;
            log::debug!(
                "discarding {} overlays in state {}",
                overlays.len(),
                self.session.state()
            );
            return OverlayApply::Stale;
        }
        let count = overlays.len();
        self.overlay.set_overlays(overlays);
        self.overlay.redraw();
        OverlayApply::Applied { overlays: count }
    }

    /// Layout changed. Later frames map against the new bounds.
    pub fn set_overlay_bounds(&mut self, bounds: Rect) {
        self.overlay.set_bounds(bounds);
        self.bounds.publish(bounds);
    }

    pub fn join(&mut self) -> Result<()> {
        self.session.join()
    }

    /// Leave the call and wipe the overlay.
    pub fn leave(&mut self) {
        self.session.leave();
        if !self.overlay.overlays().is_empty() {
            self.overlay.clear();
            self.overlay.redraw();
        }
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        self.session.handle_event(event);
    }
}

impl OverlaySink for UiHandle<CallScreen> {
    fn submit(&self, overlays: Vec<ObjectOverlay>) -> Result<()> {
        self.post(move |screen: &mut CallScreen| {
            screen.apply_overlays(overlays);
        })
    }
}

/// Engine callback handler that forwards every callback to the UI context.
pub struct EngineEventBridge {
    ui: UiHandle<CallScreen>,
}

impl EngineEventBridge {
    pub fn new(ui: UiHandle<CallScreen>) -> Arc<Self> {
        Arc::new(Self { ui })
    }

    fn forward(&self, event: EngineEvent) {
        if let Err(err) = self
            .ui
            .post(move |screen: &mut CallScreen| screen.handle_engine_event(event))
        {
            log::debug!("engine event dropped: {}", err);
        }
    }
}

impl EngineEventHandler for EngineEventBridge {
    fn on_join_success(&self, session_id: &str, uid: u32, elapsed_ms: u64) {
        self.forward(EngineEvent::JoinSucceeded {
            session_id: session_id.to_string(),
            uid,
            elapsed_ms,
        });
    }

    fn on_first_remote_video_decoded(&self, uid: u32, size: Size, elapsed_ms: u64) {
        self.forward(EngineEvent::FirstRemoteVideoDecoded {
            uid,
            size,
            elapsed_ms,
        });
    }

    fn on_remote_offline(&self, uid: u32, reason: OfflineReason) {
        self.forward(EngineEvent::RemoteOffline { uid, reason });
    }

    fn on_remote_video_muted(&self, muted: bool, uid: u32) {
        self.forward(EngineEvent::RemoteVideoMuted { muted, uid });
    }

    fn on_command_failed(&self, command: EngineCommand, reason: String) {
        self.forward(EngineEvent::CommandFailed { command, reason });
    }
}
