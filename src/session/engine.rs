//! Call engine collaborator contracts.
//!
//! The engine owns connection setup, media transport and encoding. The core
//! only issues commands (`CallEngine`) and receives callbacks
//! (`EngineEventHandler`). Commands are fire-and-forget: an `Ok` means the
//! engine accepted the request, not that the network acknowledged it.

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// Engine uid reserved for the local participant's own surface.
pub const LOCAL_UID: u32 = 0;

/// Name of a render target owned by the host UI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub String);

impl SurfaceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Fill the surface, cropping overflow.
    #[default]
    Hidden,
    /// Fit inside the surface, letterboxing.
    Fit,
}

/// Association between a participant's stream and a render target.
/// `surface: None` detaches the participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceBinding {
    pub uid: u32,
    pub surface: Option<SurfaceId>,
    pub render_mode: RenderMode,
}

impl SurfaceBinding {
    pub fn attach(uid: u32, surface: SurfaceId) -> Self {
        Self {
            uid,
            surface: Some(surface),
            render_mode: RenderMode::Hidden,
        }
    }

    pub fn detach(uid: u32) -> Self {
        Self {
            uid,
            surface: None,
            render_mode: RenderMode::Hidden,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProfile {
    Communication,
    #[default]
    LiveBroadcasting,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    Broadcaster,
    #[default]
    Audience,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bitrate {
    #[default]
    Standard,
    Compatible,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationMode {
    #[default]
    Adaptive,
    FixedLandscape,
    FixedPortrait,
}

/// Video setup applied to the engine before joining.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProfile {
    pub channel_profile: ChannelProfile,
    pub client_role: ClientRole,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate: Bitrate,
    pub orientation: OrientationMode,
}

impl Default for VideoProfile {
    fn default() -> Self {
        Self {
            channel_profile: ChannelProfile::LiveBroadcasting,
            client_role: ClientRole::Audience,
            width: 640,
            height: 360,
            fps: 15,
            bitrate: Bitrate::Standard,
            orientation: OrientationMode::Adaptive,
        }
    }
}

/// Arguments of `joinChannel`. `uid: None` lets the engine assign one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRequest {
    pub token: Option<String>,
    pub channel_id: String,
    pub info: Option<String>,
    pub uid: Option<u32>,
}

/// Commands the core issues, named for failure reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineCommand {
    ConfigureVideo,
    SetupLocalVideo,
    SetupRemoteVideo,
    SetSpeakerphone,
    JoinChannel,
    LeaveChannel,
    MuteLocalAudio,
    MuteLocalVideo,
    SwitchCamera,
}

/// Why a remote participant went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfflineReason {
    Quit,
    Dropped,
    BecameAudience,
}

/// Commands accepted by the call engine.
pub trait CallEngine {
    fn configure_video(&mut self, profile: &VideoProfile) -> Result<()>;
    fn setup_local_video(&mut self, binding: SurfaceBinding) -> Result<()>;
    fn setup_remote_video(&mut self, binding: SurfaceBinding) -> Result<()>;
    fn set_default_audio_route_to_speakerphone(&mut self, enabled: bool) -> Result<()>;
    fn join_channel(&mut self, request: &JoinRequest) -> Result<()>;
    fn leave_channel(&mut self) -> Result<()>;
    fn mute_local_audio_stream(&mut self, muted: bool) -> Result<()>;
    fn mute_local_video_stream(&mut self, muted: bool) -> Result<()>;
    fn switch_camera(&mut self) -> Result<()>;
}

/// Engine callbacks. May be invoked from any engine thread.
pub trait EngineEventHandler: Send + Sync {
    fn on_join_success(&self, session_id: &str, uid: u32, elapsed_ms: u64);
    fn on_first_remote_video_decoded(&self, uid: u32, size: Size, elapsed_ms: u64);
    fn on_remote_offline(&self, uid: u32, reason: OfflineReason);
    fn on_remote_video_muted(&self, muted: bool, uid: u32);
    fn on_command_failed(&self, command: EngineCommand, reason: String);
}

/// Engine callback captured as a value so it can cross threads.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    JoinSucceeded {
        session_id: String,
        uid: u32,
        elapsed_ms: u64,
    },
    FirstRemoteVideoDecoded {
        uid: u32,
        size: Size,
        elapsed_ms: u64,
    },
    RemoteOffline {
        uid: u32,
        reason: OfflineReason,
    },
    RemoteVideoMuted {
        muted: bool,
        uid: u32,
    },
    CommandFailed {
        command: EngineCommand,
        reason: String,
    },
}

/// Host display hooks that are not tied to a surface.
pub trait DisplayHost {
    /// Keep the screen awake while a call is active.
    fn set_idle_timer_disabled(&mut self, disabled: bool);
}

/// Display host for environments without a screen.
#[derive(Default)]
pub struct HeadlessDisplay {
    idle_timer_disabled: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle_timer_disabled(&self) -> bool {
        self.idle_timer_disabled
    }
}

impl DisplayHost for HeadlessDisplay {
    fn set_idle_timer_disabled(&mut self, disabled: bool) {
        self.idle_timer_disabled = disabled;
        log::debug!("idle timer disabled={}", disabled);
    }
}
