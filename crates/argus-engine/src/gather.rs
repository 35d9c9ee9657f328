//! Gathering fan-out stage
//!
//! Schedules the mandatory live lookups plus every enabled specialist,
//! starts them all concurrently, and waits for every call to settle before
//! merging. A failed agent never stops the others; it is recorded on the
//! dossier and the driver decides what the gap means.

use crate::runner::AgentRunner;
use argus_core::result::{FinancialStatements, QuoteData};
use argus_core::{AgentKind, AgentResult, AgentSelection, MarketContext};
use argus_providers::{IntelligenceProvider, ProviderRequest};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Scheduling order of the gathering stage.
///
/// Ordering is presentational only; merge is commutative and calls settle in
/// whatever order the providers answer.
pub const GATHER_ORDER: [AgentKind; 7] = [
    AgentKind::Quote,
    AgentKind::Financials,
    AgentKind::Esg,
    AgentKind::Macro,
    AgentKind::Competitive,
    AgentKind::Sentiment,
    AgentKind::Quantitative,
];

fn step_name(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Quote => "Fetch Quote",
        AgentKind::Financials => "Fetch Financial Statements",
        AgentKind::Esg => "ESG Assessment",
        AgentKind::Macro => "Macro Outlook",
        AgentKind::Competitive => "Competitive Landscape",
        AgentKind::Sentiment => "Sentiment Scan",
        AgentKind::Quantitative => "Quantitative Signals",
        _ => "Gather",
    }
}

/// Merged output of one gathering pass.
///
/// Holds every successful result keyed by agent, plus the agents that
/// failed. The synthesis loop consumes nothing but this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dossier {
    results: HashMap<AgentKind, AgentResult>,
    failed: Vec<AgentKind>,
}

impl Dossier {
    pub fn insert(&mut self, result: AgentResult) {
        self.results.insert(result.kind(), result);
    }

    pub fn record_failure(&mut self, kind: AgentKind) {
        if !self.failed.contains(&kind) {
            self.failed.push(kind);
        }
    }

    pub fn get(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.results.get(&kind)
    }

    pub fn any_failed(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failed_agents(&self) -> &[AgentKind] {
        &self.failed
    }

    /// Agents that produced a result, in scheduling order.
    pub fn succeeded_agents(&self) -> Vec<AgentKind> {
        GATHER_ORDER
            .into_iter()
            .filter(|kind| self.results.contains_key(kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn quote(&self) -> Option<&QuoteData> {
        self.results
            .get(&AgentKind::Quote)
            .and_then(AgentResult::as_quote)
    }

    pub fn financials(&self) -> Option<&FinancialStatements> {
        self.results
            .get(&AgentKind::Financials)
            .and_then(AgentResult::as_financials)
    }

    /// One summary line per successful agent, in scheduling order.
    pub fn summaries(&self) -> Vec<(AgentKind, String)> {
        self.succeeded_agents()
            .into_iter()
            .filter_map(|kind| self.results.get(&kind).map(|r| (kind, r.summary())))
            .collect()
    }
}

/// Run the fan-out for one subject and merge the results.
///
/// Mandatory live lookups are never served from cache; specialists are.
/// The merged dossier is persisted to the whole-result cache when it holds
/// at least one success.
pub async fn gather(
    runner: &AgentRunner,
    provider: Arc<dyn IntelligenceProvider>,
    context: &MarketContext,
    selection: &AgentSelection,
) -> Dossier {
    let scheduled: Vec<AgentKind> = GATHER_ORDER
        .into_iter()
        .filter(|&kind| kind.is_mandatory_live() || selection.is_enabled(kind))
        .collect();

    info!(
        subject = %runner.subject(),
        agents = scheduled.len(),
        "gathering fan-out"
    );

    let calls = scheduled.into_iter().map(|kind| {
        let runner = runner.clone();
        let provider = Arc::clone(&provider);
        let request = ProviderRequest::new(kind, runner.subject().clone(), context.clone());
        async move {
            let result = runner
                .run(kind, step_name(kind), kind.is_specialist(), None, || {
                    let provider = Arc::clone(&provider);
                    let request = request.clone();
                    async move { provider.gather(request).await }
                })
                .await;
            (kind, result)
        }
    });

    let mut dossier = Dossier::default();
    for (kind, result) in join_all(calls).await {
        match result {
            Some(result) => dossier.insert(result),
            None => dossier.record_failure(kind),
        }
    }

    if dossier.any_failed() {
        warn!(failed = ?dossier.failed_agents(), "gathering finished with failures");
    }
    if !dossier.is_empty() {
        runner.cache().put_dossier(runner.subject(), &dossier).await;
    }
    dossier
}
