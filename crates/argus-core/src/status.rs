//! Per-agent status tracking

use serde::{Deserialize, Serialize};

/// Loading/error state of one non-local agent key.
///
/// Mutated only by the agent runner: loading flips on before a call and off
/// after it settles, and `error` holds the user-facing message of the most
/// recent failure until the next run resets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AgentStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            error: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
