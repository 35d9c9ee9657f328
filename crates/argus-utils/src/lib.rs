//! Shared utilities for the argus workspace
//!
//! Logging setup for binaries and examples, and the clock abstraction that
//! keeps cache freshness a pure function of time inputs.

pub mod clock;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::init_tracing;
