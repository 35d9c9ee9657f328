//! Provider boundary for the argus workflow
//!
//! The engine reaches the outside world only through [`IntelligenceProvider`].
//! This crate defines that trait, the typed error taxonomy retry decisions
//! branch on, the linear-backoff retry policy applied underneath the agent
//! runner, and a deterministic scripted provider for tests and examples.

pub mod error;
pub mod provider;
pub mod retry;
pub mod scripted;

pub use error::{ProviderError, Result};
pub use provider::{IntelligenceProvider, ProviderRequest};
pub use retry::RetryPolicy;
pub use scripted::ScriptedProvider;
