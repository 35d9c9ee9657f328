//! Workflow phase state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// The phase a workflow run is in.
///
/// Exactly one phase is active per run and only the workflow driver moves it.
/// The canonical run advances `Idle → Planning → Gathering → Calculating →
/// Verifying → Drafting → Debating → Finalizing → Complete`. A run can drop
/// out early into `Error` (fatal failure) or `Paused` (partial data, awaiting
/// a remediation decision). `Refining` is part of the advertised sequence but
/// the current driver folds its work into `Finalizing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Planning,
    Gathering,
    Calculating,
    Verifying,
    Drafting,
    Debating,
    Refining,
    Finalizing,
    Complete,
    Error,
    Paused,
}

impl Phase {
    /// Whether the run has ended in this phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Error | Phase::Paused)
    }

    /// Position of the phase in the canonical forward order.
    ///
    /// Terminal phases rank above every working phase so that any observed
    /// phase sequence of a single run is strictly increasing.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Planning => 1,
            Phase::Gathering => 2,
            Phase::Calculating => 3,
            Phase::Verifying => 4,
            Phase::Drafting => 5,
            Phase::Debating => 6,
            Phase::Refining => 7,
            Phase::Finalizing => 8,
            Phase::Complete => 9,
            Phase::Error => 10,
            Phase::Paused => 11,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "Idle",
            Phase::Planning => "Planning",
            Phase::Gathering => "Gathering",
            Phase::Calculating => "Calculating",
            Phase::Verifying => "Verifying",
            Phase::Drafting => "Drafting",
            Phase::Debating => "Debating",
            Phase::Refining => "Refining",
            Phase::Finalizing => "Finalizing",
            Phase::Complete => "Complete",
            Phase::Error => "Error",
            Phase::Paused => "Paused",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(Phase::Complete.is_terminal());
        assert!(Phase::Error.is_terminal());
        assert!(Phase::Paused.is_terminal());
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Drafting.is_terminal());
    }

    #[test]
    fn canonical_order_is_increasing() {
        let path = [
            Phase::Idle,
            Phase::Planning,
            Phase::Gathering,
            Phase::Calculating,
            Phase::Verifying,
            Phase::Drafting,
            Phase::Debating,
            Phase::Finalizing,
            Phase::Complete,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn terminal_ranks_above_working_phases() {
        for phase in [Phase::Complete, Phase::Error, Phase::Paused] {
            assert!(phase.rank() > Phase::Finalizing.rank());
        }
    }

    #[test]
    fn display_labels() {
        assert_eq!(Phase::Gathering.to_string(), "Gathering");
        assert_eq!(Phase::Paused.to_string(), "Paused");
    }
}
