//! Loopback call engine.
//!
//! Accepts every command locally and answers with the callbacks a real engine
//! would send: join acknowledgment right away, and one simulated peer whose
//! first frame "decodes" as soon as we are in the channel. Peer-side changes
//! (mute, leaving) are driven through a `LoopbackPeer` handle.

use std::sync::Arc;

use anyhow::{bail, Result};
use rand::Rng;

use super::engine::{
    CallEngine, EngineEventHandler, JoinRequest, OfflineReason, SurfaceBinding, VideoProfile,
};
use crate::geometry::Size;

pub struct LoopbackEngine {
    handler: Arc<dyn EngineEventHandler>,
    app_id: String,
    peer_uid: Option<u32>,
    profile: VideoProfile,
    joined: bool,
    sessions: u64,
    local_binding: Option<SurfaceBinding>,
    remote_binding: Option<SurfaceBinding>,
    audio_muted: bool,
    video_muted: bool,
}

impl LoopbackEngine {
    pub fn new(handler: Arc<dyn EngineEventHandler>) -> Self {
        Self {
            handler,
            app_id: String::new(),
            peer_uid: None,
            profile: VideoProfile::default(),
            joined: false,
            sessions: 0,
            local_binding: None,
            remote_binding: None,
            audio_muted: false,
            video_muted: false,
        }
    }

    /// Application id the engine was initialised with. Sessions are scoped to
    /// it; an empty id uses the `loopback` scope.
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Simulate a peer with `uid` already publishing in the channel.
    pub fn with_peer(mut self, uid: u32) -> Self {
        self.peer_uid = Some(uid);
        self
    }

    /// Handle for driving the simulated peer from any thread.
    pub fn peer(&self) -> Option<LoopbackPeer> {
        self.peer_uid.map(|uid| LoopbackPeer {
            handler: self.handler.clone(),
            uid,
            size: Size::new(self.profile.width as f64, self.profile.height as f64),
        })
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn local_binding(&self) -> Option<&SurfaceBinding> {
        self.local_binding.as_ref()
    }

    pub fn remote_binding(&self) -> Option<&SurfaceBinding> {
        self.remote_binding.as_ref()
    }

    pub fn audio_muted(&self) -> bool {
        self.audio_muted
    }

    pub fn video_muted(&self) -> bool {
        self.video_muted
    }
}

impl CallEngine for LoopbackEngine {
    fn configure_video(&mut self, profile: &VideoProfile) -> Result<()> {
        log::debug!(
            "loopback: video {}x{}@{} {:?}/{:?}",
            profile.width,
            profile.height,
            profile.fps,
            profile.channel_profile,
            profile.client_role
        );
        self.profile = profile.clone();
        Ok(())
    }

    fn setup_local_video(&mut self, binding: SurfaceBinding) -> Result<()> {
        self.local_binding = binding.is_attached().then_some(binding);
        Ok(())
    }

    fn setup_remote_video(&mut self, binding: SurfaceBinding) -> Result<()> {
        self.remote_binding = binding.is_attached().then_some(binding);
        Ok(())
    }

    fn set_default_audio_route_to_speakerphone(&mut self, enabled: bool) -> Result<()> {
        log::debug!("loopback: speakerphone={}", enabled);
        Ok(())
    }

    fn join_channel(&mut self, request: &JoinRequest) -> Result<()> {
        if self.joined {
            bail!("already joined a channel");
        }
        if request.channel_id.trim().is_empty() {
            bail!("channel id must not be empty");
        }
        self.joined = true;
        self.sessions += 1;

        let uid = request
            .uid
            .unwrap_or_else(|| rand::thread_rng().gen_range(1_000..1_000_000));
        let scope = if self.app_id.is_empty() {
            "loopback"
        } else {
            self.app_id.as_str()
        };
        let session_id = format!("{}-{}-{}", scope, request.channel_id, self.sessions);
        self.handler.on_join_success(&session_id, uid, 0);

        if let Some(peer) = self.peer() {
            peer.publish_video();
        }
        Ok(())
    }

    fn leave_channel(&mut self) -> Result<()> {
        self.joined = false;
        Ok(())
    }

    fn mute_local_audio_stream(&mut self, muted: bool) -> Result<()> {
        self.audio_muted = muted;
        Ok(())
    }

    fn mute_local_video_stream(&mut self, muted: bool) -> Result<()> {
        self.video_muted = muted;
        Ok(())
    }

    fn switch_camera(&mut self) -> Result<()> {
        if !self.joined {
            bail!("no camera active");
        }
        Ok(())
    }
}

/// Remote-side controls for the simulated peer.
#[derive(Clone)]
pub struct LoopbackPeer {
    handler: Arc<dyn EngineEventHandler>,
    uid: u32,
    size: Size,
}

impl LoopbackPeer {
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Peer's first video frame decoded on our side.
    pub fn publish_video(&self) {
        self.handler.on_first_remote_video_decoded(self.uid, self.size, 0);
    }

    pub fn set_video_muted(&self, muted: bool) {
        self.handler.on_remote_video_muted(muted, self.uid);
    }

    pub fn go_offline(&self, reason: OfflineReason) {
        self.handler.on_remote_offline(self.uid, reason);
    }
}
