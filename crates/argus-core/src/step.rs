//! Execution log entries

use crate::agent::AgentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Running,
    Complete,
    Error,
    Paused,
}

impl StepStatus {
    /// A step settles exactly once; every status except `Running` is settled.
    pub fn is_settled(self) -> bool {
        !matches!(self, StepStatus::Running)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Running => "running",
            StepStatus::Complete => "complete",
            StepStatus::Error => "error",
            StepStatus::Paused => "paused",
        };
        write!(f, "{label}")
    }
}

/// One entry in the run's execution log.
///
/// Created in `Running` state when an agent invocation (or local bookkeeping
/// action) begins and settled exactly once afterward. Ids are monotonic
/// within a run; the log itself is append/settle-only and reset on each new
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub agent: AgentKind,
    pub step_name: String,
    pub status: StepStatus,
    pub input: Option<String>,
    pub output: Option<String>,
    pub sources: Vec<String>,
    pub confidence: Option<f64>,
    pub remediation: Option<String>,
}

impl ExecutionStep {
    /// Open a new step in `Running` state.
    pub fn begin(
        id: u64,
        agent: AgentKind,
        step_name: impl Into<String>,
        input: Option<String>,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            agent,
            step_name: step_name.into(),
            status: StepStatus::Running,
            input,
            output: None,
            sources: Vec::new(),
            confidence: None,
            remediation: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    /// Apply a settlement to a running step.
    pub fn settle(&mut self, outcome: StepOutcome) {
        self.status = outcome.status;
        self.output = outcome.output;
        self.sources = outcome.sources;
        self.confidence = outcome.confidence;
        self.remediation = outcome.remediation;
    }
}

/// The settlement applied to a running step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub output: Option<String>,
    pub sources: Vec<String>,
    pub confidence: Option<f64>,
    pub remediation: Option<String>,
}

impl StepOutcome {
    pub fn complete(output: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Complete,
            output: Some(output.into()),
            sources: Vec::new(),
            confidence: None,
            remediation: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Error,
            output: Some(message.into()),
            sources: Vec::new(),
            confidence: None,
            remediation: None,
        }
    }

    pub fn paused(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Paused,
            output: Some(message.into()),
            sources: Vec::new(),
            confidence: None,
            remediation: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_step_is_running() {
        let step = ExecutionStep::begin(1, AgentKind::Quote, "Fetch Quote", None);
        assert_eq!(step.status, StepStatus::Running);
        assert!(!step.is_settled());
        assert!(step.output.is_none());
    }

    #[test]
    fn every_non_running_status_is_settled() {
        assert!(StepStatus::Complete.is_settled());
        assert!(StepStatus::Error.is_settled());
        assert!(StepStatus::Paused.is_settled());
        assert!(!StepStatus::Running.is_settled());
    }

    #[test]
    fn settle_carries_the_full_outcome() {
        let mut step = ExecutionStep::begin(3, AgentKind::Sentiment, "Sentiment Scan", None);
        step.settle(
            StepOutcome::complete("bullish coverage")
                .with_sources(vec!["https://example.com/news".to_string()])
                .with_confidence(Some(0.8)),
        );

        assert_eq!(step.status, StepStatus::Complete);
        assert_eq!(step.output.as_deref(), Some("bullish coverage"));
        assert_eq!(step.sources.len(), 1);
        assert_eq!(step.confidence, Some(0.8));
        assert!(step.remediation.is_none());
    }
}
