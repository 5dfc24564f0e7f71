//! Call session lifecycle.
//!
//! - `engine`: Collaborator contracts for the call engine and display host.
//! - `controller`: The join/leave state machine with remote binding and mute state.
//! - `loopback`: In-process engine that simulates one peer (demo, tests).

pub mod controller;
pub mod engine;
pub mod loopback;
mod state;

pub use controller::{CallSessionController, EngineFailure, SessionSettings};
pub use engine::{
    CallEngine, DisplayHost, EngineCommand, EngineEvent, EngineEventHandler, HeadlessDisplay,
    JoinRequest, OfflineReason, SurfaceBinding, SurfaceId, VideoProfile,
};
pub use loopback::{LoopbackEngine, LoopbackPeer};
pub use state::{CallSession, SessionState, ViewFlags};
