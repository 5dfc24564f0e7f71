pub mod motion;
pub mod stub;

pub use motion::MotionAdapter;
pub use stub::StubAdapter;
