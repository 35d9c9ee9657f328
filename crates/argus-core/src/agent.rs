//! Agent keys and run selection

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Key identifying an agent within a run.
///
/// `Quote` and `Financials` are mandatory live lookups and are always
/// scheduled. The specialist agents are optional and enabled per run through
/// [`AgentSelection`]. `Synthesizer` and `Critic` drive the synthesis loop;
/// `Challenger` joins it when enabled. `Local` marks internal bookkeeping
/// steps that never correspond to a status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Quote,
    Financials,
    Esg,
    Macro,
    Competitive,
    Sentiment,
    Quantitative,
    Synthesizer,
    Challenger,
    Critic,
    Local,
}

/// The optional specialist agents, in scheduling order.
pub const SPECIALISTS: [AgentKind; 5] = [
    AgentKind::Esg,
    AgentKind::Macro,
    AgentKind::Competitive,
    AgentKind::Sentiment,
    AgentKind::Quantitative,
];

impl AgentKind {
    /// Internal bookkeeping key with no status entry or provider behind it.
    pub fn is_local(self) -> bool {
        matches!(self, AgentKind::Local)
    }

    /// Always scheduled and never served from cache.
    pub fn is_mandatory_live(self) -> bool {
        matches!(self, AgentKind::Quote | AgentKind::Financials)
    }

    /// Optional gathering specialist.
    pub fn is_specialist(self) -> bool {
        SPECIALISTS.contains(&self)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentKind::Quote => "quote",
            AgentKind::Financials => "financials",
            AgentKind::Esg => "esg",
            AgentKind::Macro => "macro",
            AgentKind::Competitive => "competitive",
            AgentKind::Sentiment => "sentiment",
            AgentKind::Quantitative => "quantitative",
            AgentKind::Synthesizer => "synthesizer",
            AgentKind::Challenger => "challenger",
            AgentKind::Critic => "critic",
            AgentKind::Local => "local",
        };
        write!(f, "{name}")
    }
}

/// Which optional agents a run schedules.
///
/// The mandatory live lookups and the synthesizer/critic pair are always on
/// and are not represented here. The challenger rides in the same set because
/// it is enabled the same way the specialists are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSelection {
    enabled: HashSet<AgentKind>,
}

impl AgentSelection {
    /// Every specialist enabled, challenger included.
    pub fn all() -> Self {
        let mut enabled: HashSet<AgentKind> = SPECIALISTS.into_iter().collect();
        enabled.insert(AgentKind::Challenger);
        Self { enabled }
    }

    /// Every specialist enabled, no challenger. This is the default.
    pub fn standard() -> Self {
        Self {
            enabled: SPECIALISTS.into_iter().collect(),
        }
    }

    /// Only the mandatory lookups and the synthesis loop.
    pub fn minimal() -> Self {
        Self {
            enabled: HashSet::new(),
        }
    }

    pub fn with(mut self, kind: AgentKind) -> Self {
        self.enabled.insert(kind);
        self
    }

    pub fn without(mut self, kind: AgentKind) -> Self {
        self.enabled.remove(&kind);
        self
    }

    /// Whether `kind` takes part in the run.
    ///
    /// Mandatory lookups, the synthesizer/critic pair, and local bookkeeping
    /// always do; specialists and the challenger follow the enabled set.
    pub fn is_enabled(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Quote
            | AgentKind::Financials
            | AgentKind::Synthesizer
            | AgentKind::Critic
            | AgentKind::Local => true,
            _ => self.enabled.contains(&kind),
        }
    }

    /// The enabled specialists in scheduling order.
    pub fn enabled_specialists(&self) -> Vec<AgentKind> {
        SPECIALISTS
            .into_iter()
            .filter(|kind| self.enabled.contains(kind))
            .collect()
    }

    pub fn challenger_enabled(&self) -> bool {
        self.enabled.contains(&AgentKind::Challenger)
    }
}

impl Default for AgentSelection {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_agents_are_always_enabled() {
        let selection = AgentSelection::minimal();
        assert!(selection.is_enabled(AgentKind::Quote));
        assert!(selection.is_enabled(AgentKind::Financials));
        assert!(selection.is_enabled(AgentKind::Synthesizer));
        assert!(selection.is_enabled(AgentKind::Critic));
        assert!(!selection.is_enabled(AgentKind::Esg));
        assert!(!selection.challenger_enabled());
    }

    #[test]
    fn standard_selection_enables_specialists_without_challenger() {
        let selection = AgentSelection::standard();
        assert_eq!(selection.enabled_specialists().len(), 5);
        assert!(!selection.challenger_enabled());
    }

    #[test]
    fn selection_can_be_adjusted() {
        let selection = AgentSelection::standard()
            .without(AgentKind::Sentiment)
            .with(AgentKind::Challenger);
        assert!(!selection.is_enabled(AgentKind::Sentiment));
        assert!(selection.challenger_enabled());
        assert_eq!(selection.enabled_specialists().len(), 4);
    }

    #[test]
    fn specialists_keep_scheduling_order() {
        let selection = AgentSelection::all();
        assert_eq!(selection.enabled_specialists(), SPECIALISTS.to_vec());
    }
}
