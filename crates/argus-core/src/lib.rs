//! Shared vocabulary for the argus analysis workflow
//!
//! This crate defines the types every other argus crate speaks: the workflow
//! phase machine, agent keys and selection, execution log entries, per-agent
//! status, and the typed result payloads agents produce.

pub mod agent;
pub mod error;
pub mod phase;
pub mod result;
pub mod status;
pub mod step;
pub mod subject;

pub use agent::{AgentKind, AgentSelection};
pub use error::{Error, Result};
pub use phase::Phase;
pub use result::AgentResult;
pub use status::AgentStatus;
pub use step::{ExecutionStep, StepOutcome, StepStatus};
pub use subject::{MarketContext, Subject};
