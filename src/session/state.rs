use std::fmt;

/// Top-level call lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Joining,
    InCall,
    Leaving,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Joining => "joining",
            SessionState::InCall => "in-call",
            SessionState::Leaving => "leaving",
        };
        f.write_str(name)
    }
}

/// State of one two-party call. Reset to `Default` (idle) on leave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSession {
    pub state: SessionState,
    pub local_muted: bool,
    pub local_video_muted: bool,
    pub camera_switched: bool,
    pub remote_video_visible: bool,
    pub remote_muted: bool,
    pub remote_user_id: Option<u32>,
    /// Uid the engine assigned to us on join.
    pub local_user_id: Option<u32>,
}

impl CallSession {
    pub fn view_flags(&self) -> ViewFlags {
        ViewFlags {
            local_video_visible: !self.local_video_muted,
            local_video_muted_indicator_visible: self.local_video_muted,
            remote_video_visible: self.remote_video_visible,
            remote_video_muted_indicator_visible: self.remote_muted,
        }
    }
}

/// Visibility flags consumed by the host UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewFlags {
    pub local_video_visible: bool,
    pub local_video_muted_indicator_visible: bool,
    pub remote_video_visible: bool,
    pub remote_video_muted_indicator_visible: bool,
}
