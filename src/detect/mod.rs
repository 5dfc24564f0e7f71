//! Detection model adapters.
//!
//! The pipeline never talks to a model directly. It calls a `DetectionAdapter`,
//! which may answer `None` when no usable result exists for a frame.

mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectionAdapter;
pub use backends::{MotionAdapter, StubAdapter};
pub use registry::{AdapterRegistry, SharedAdapter};
pub use result::Detection;
