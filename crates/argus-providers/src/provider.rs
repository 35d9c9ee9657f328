//! Intelligence provider trait definition

use crate::error::Result;
use argus_core::{AgentKind, AgentResult, MarketContext, Subject};
use async_trait::async_trait;

/// One agent invocation against a provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Which agent's question this is
    pub agent: AgentKind,
    /// The security under analysis
    pub subject: Subject,
    /// Market configuration, passed through opaquely
    pub context: MarketContext,
    /// Assembled briefing for synthesis-side agents; `None` for data lookups
    pub briefing: Option<String>,
    /// Mandatory instruction injected when a call is re-issued to resolve a
    /// conflict
    pub refinement: Option<String>,
}

impl ProviderRequest {
    pub fn new(agent: AgentKind, subject: Subject, context: MarketContext) -> Self {
        Self {
            agent,
            subject,
            context,
            briefing: None,
            refinement: None,
        }
    }

    pub fn with_briefing(mut self, briefing: impl Into<String>) -> Self {
        self.briefing = Some(briefing.into());
        self
    }

    pub fn with_refinement(mut self, refinement: impl Into<String>) -> Self {
        self.refinement = Some(refinement.into());
        self
    }
}

/// Trait for intelligence providers
///
/// Implementations answer one agent's question about a subject and either
/// return a typed result or fail with a classified error. How an answer is
/// produced (market data API, LLM, local model) is invisible to the engine.
#[async_trait]
pub trait IntelligenceProvider: Send + Sync {
    /// Produce the result for one agent invocation
    ///
    /// # Arguments
    ///
    /// * `request` - The invocation with agent key, subject, and any
    ///   briefing/refinement text
    ///
    /// # Returns
    ///
    /// The typed result for the requested agent, or a classified error
    async fn gather(&self, request: ProviderRequest) -> Result<AgentResult>;

    /// Get the provider name (for logging)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builders_attach_text() {
        let subject = Subject::new("MSFT").unwrap();
        let request = ProviderRequest::new(AgentKind::Synthesizer, subject, MarketContext::default())
            .with_briefing("summaries and metrics")
            .with_refinement("address the conflict");
        assert_eq!(request.agent, AgentKind::Synthesizer);
        assert_eq!(request.briefing.as_deref(), Some("summaries and metrics"));
        assert_eq!(request.refinement.as_deref(), Some("address the conflict"));
    }
}
