use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use super::engine::{
    CallEngine, DisplayHost, EngineCommand, EngineEvent, JoinRequest, OfflineReason,
    SurfaceBinding, SurfaceId, VideoProfile, LOCAL_UID,
};
use super::state::{CallSession, SessionState, ViewFlags};

/// Static inputs for a call session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub channel_id: String,
    pub token: Option<String>,
    pub video: VideoProfile,
    pub speakerphone: bool,
    pub local_surface: SurfaceId,
    pub remote_surface: SurfaceId,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            channel_id: "ar-core".to_string(),
            token: None,
            video: VideoProfile::default(),
            speakerphone: true,
            local_surface: SurfaceId::new("local-video"),
            remote_surface: SurfaceId::new("remote-video"),
        }
    }
}

/// An engine command that was rejected. Reported, never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineFailure {
    pub command: EngineCommand,
    pub reason: String,
}

/// Call lifecycle state machine: `Idle -> Joining -> InCall -> Leaving -> Idle`.
///
/// Lives on the UI-owning context. Engine callbacks reach it only after being
/// marshaled there (see `screen::EngineEventBridge`).
pub struct CallSessionController {
    engine: Box<dyn CallEngine>,
    display: Box<dyn DisplayHost>,
    settings: SessionSettings,
    session: CallSession,
    local_bound: bool,
    join_started: Option<Instant>,
    last_failure: Option<EngineFailure>,
}

impl CallSessionController {
    pub fn new(
        engine: Box<dyn CallEngine>,
        display: Box<dyn DisplayHost>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            engine,
            display,
            settings,
            session: CallSession::default(),
            local_bound: false,
            join_started: None,
            last_failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    pub fn view_flags(&self) -> ViewFlags {
        self.session.view_flags()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn last_failure(&self) -> Option<&EngineFailure> {
        self.last_failure.as_ref()
    }

    /// Time spent waiting for join acknowledgment, while in `Joining`.
    ///
    /// The controller has no join timeout of its own; a watchdog can poll this.
    pub fn join_pending_for(&self) -> Option<Duration> {
        match self.session.state {
            SessionState::Joining => self.join_started.map(|started| started.elapsed()),
            _ => None,
        }
    }

    /// Configure engine video and bind the local preview surface.
    pub fn prepare(&mut self) -> Result<()> {
        if self.session.state != SessionState::Idle {
            return Err(anyhow!("prepare requires an idle session (state: {})", self.session.state));
        }
        let profile = self.settings.video.clone();
        let configured = self.engine.configure_video(&profile);
        self.check(EngineCommand::ConfigureVideo, configured);

        let binding = SurfaceBinding::attach(LOCAL_UID, self.settings.local_surface.clone());
        let bound = self.engine.setup_local_video(binding);
        self.local_bound = self.check(EngineCommand::SetupLocalVideo, bound);

        self.session = CallSession::default();
        log::debug!(
            "session prepared: {}x{}@{}fps local_bound={}",
            profile.width,
            profile.height,
            profile.fps,
            self.local_bound
        );
        Ok(())
    }

    /// `Idle -> Joining`. Joins with no pre-set uid; the engine assigns one.
    pub fn join(&mut self) -> Result<()> {
        if self.session.state != SessionState::Idle {
            return Err(anyhow!("join requires an idle session (state: {})", self.session.state));
        }
        if !self.local_bound {
            self.prepare()?;
        }

        let speaker = self.settings.speakerphone;
        let routed = self.engine.set_default_audio_route_to_speakerphone(speaker);
        self.check(EngineCommand::SetSpeakerphone, routed);

        let request = JoinRequest {
            token: self.settings.token.clone(),
            channel_id: self.settings.channel_id.clone(),
            info: None,
            uid: None,
        };
        self.session.state = SessionState::Joining;
        self.join_started = Some(Instant::now());
        let joined = self.engine.join_channel(&request);
        self.check(EngineCommand::JoinChannel, joined);
        self.display.set_idle_timer_disabled(true);

        log::info!("joining channel '{}'", request.channel_id);
        Ok(())
    }

    /// Leave the call from any state. Cleanup is local and unconditional; a
    /// second call from `Idle` is a no-op.
    pub fn leave(&mut self) {
        if self.session.state == SessionState::Idle {
            log::debug!("leave ignored: session already idle");
            return;
        }
        let previous = self.session.state;
        self.session.state = SessionState::Leaving;

        let left = self.engine.leave_channel();
        self.check(EngineCommand::LeaveChannel, left);

        let local = self.engine.setup_local_video(SurfaceBinding::detach(LOCAL_UID));
        self.check(EngineCommand::SetupLocalVideo, local);
        let remote_uid = self.session.remote_user_id.unwrap_or(LOCAL_UID);
        let remote = self.engine.setup_remote_video(SurfaceBinding::detach(remote_uid));
        self.check(EngineCommand::SetupRemoteVideo, remote);

        self.display.set_idle_timer_disabled(false);
        self.local_bound = false;
        self.join_started = None;
        self.session = CallSession::default();
        log::info!("left channel '{}' (was {})", self.settings.channel_id, previous);
    }

    /// Dispatch a marshaled engine callback.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::JoinSucceeded {
                session_id,
                uid,
                elapsed_ms,
            } => self.on_join_success(&session_id, uid, elapsed_ms),
            EngineEvent::FirstRemoteVideoDecoded { uid, .. } => self.on_remote_first_frame(uid),
            EngineEvent::RemoteOffline { uid, reason } => self.on_remote_offline(uid, reason),
            EngineEvent::RemoteVideoMuted { muted, uid } => self.on_remote_mute_changed(muted, uid),
            EngineEvent::CommandFailed { command, reason } => {
                self.record_failure(command, reason)
            }
        }
    }

    /// `Joining -> InCall`.
    pub fn on_join_success(&mut self, session_id: &str, uid: u32, elapsed_ms: u64) {
        if self.session.state != SessionState::Joining {
            log::debug!(
                "join acknowledgment for session {} ignored in state {}",
                session_id,
                self.session.state
            );
            return;
        }
        self.session.state = SessionState::InCall;
        self.session.local_user_id = Some(uid);
        self.join_started = None;
        log::info!(
            "joined session {} as uid {} after {}ms",
            session_id,
            uid,
            elapsed_ms
        );
    }

    /// Bind the remote surface to the peer whose first frame just decoded.
    pub fn on_remote_first_frame(&mut self, uid: u32) {
        if self.session.state != SessionState::InCall {
            log::debug!("remote frame from uid {} ignored in state {}", uid, self.session.state);
            return;
        }
        if let Some(previous) = self.session.remote_user_id.filter(|&prev| prev != uid) {
            log::info!("remote participant {} replaced by {}", previous, uid);
            self.session.remote_muted = false;
        }
        let binding = SurfaceBinding::attach(uid, self.settings.remote_surface.clone());
        let bound = self.engine.setup_remote_video(binding);
        self.check(EngineCommand::SetupRemoteVideo, bound);
        self.session.remote_user_id = Some(uid);
        self.session.remote_video_visible = true;
    }

    /// Hide and unbind the remote surface. Top-level state is unchanged.
    pub fn on_remote_offline(&mut self, uid: u32, reason: OfflineReason) {
        if self.session.state != SessionState::InCall {
            return;
        }
        if self.session.remote_user_id != Some(uid) {
            log::debug!("offline for untracked uid {} ignored", uid);
            return;
        }
        self.session.remote_video_visible = false;
        let unbound = self.engine.setup_remote_video(SurfaceBinding::detach(uid));
        self.check(EngineCommand::SetupRemoteVideo, unbound);
        self.session.remote_user_id = None;
        log::info!("remote participant {} went offline ({:?})", uid, reason);
    }

    /// Remote video mute toggled. Written independently of the offline path.
    pub fn on_remote_mute_changed(&mut self, muted: bool, uid: u32) {
        if self.session.state != SessionState::InCall {
            return;
        }
        if matches!(self.session.remote_user_id, Some(tracked) if tracked != uid) {
            log::debug!("mute change for untracked uid {} ignored", uid);
            return;
        }
        self.session.remote_muted = muted;
        self.session.remote_video_visible = !muted && self.session.remote_user_id.is_some();
    }

    /// Flip local microphone mute. Returns the new value.
    pub fn toggle_local_audio_mute(&mut self) -> Result<bool> {
        self.require_in_call("toggle audio mute")?;
        let muted = !self.session.local_muted;
        self.session.local_muted = muted;
        let sent = self.engine.mute_local_audio_stream(muted);
        self.check(EngineCommand::MuteLocalAudio, sent);
        Ok(muted)
    }

    /// Flip local camera mute. Returns the new value.
    pub fn toggle_local_video_mute(&mut self) -> Result<bool> {
        self.require_in_call("toggle video mute")?;
        let muted = !self.session.local_video_muted;
        self.session.local_video_muted = muted;
        let sent = self.engine.mute_local_video_stream(muted);
        self.check(EngineCommand::MuteLocalVideo, sent);
        Ok(muted)
    }

    /// Swap front/back camera. Returns the new switched flag.
    pub fn switch_camera(&mut self) -> Result<bool> {
        self.require_in_call("switch camera")?;
        let switched = !self.session.camera_switched;
        self.session.camera_switched = switched;
        let sent = self.engine.switch_camera();
        self.check(EngineCommand::SwitchCamera, sent);
        Ok(switched)
    }

    fn require_in_call(&self, action: &str) -> Result<()> {
        if self.session.state != SessionState::InCall {
            return Err(anyhow!("{} requires an active call (state: {})", action, self.session.state));
        }
        Ok(())
    }

    fn check(&mut self, command: EngineCommand, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.record_failure(command, format!("{err:#}"));
                false
            }
        }
    }

    fn record_failure(&mut self, command: EngineCommand, reason: String) {
        log::warn!("engine command {:?} failed: {}", command, reason);
        self.last_failure = Some(EngineFailure { command, reason });
    }
}
