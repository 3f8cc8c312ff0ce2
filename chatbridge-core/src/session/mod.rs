//! Host-event orchestration and state sampling.

pub mod clock;
pub mod driver;

pub use clock::SamplingClock;
pub use driver::{SessionConfig, SessionDriver, SessionEnd};
