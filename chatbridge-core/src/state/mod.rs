pub mod backoff;
pub mod connection;

pub use backoff::{Backoff, BackoffPolicy};
pub use connection::ConnectionPhase;
