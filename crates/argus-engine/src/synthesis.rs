//! Draft, challenge, critique, and finalize stages
//!
//! Each stage is one runner invocation whose output feeds the next. The
//! stages only produce values; sequencing, phase changes, and the branch
//! decisions between them belong to the workflow driver.

use crate::gather::Dossier;
use crate::metrics::CalculatedMetric;
use crate::runner::AgentRunner;
use argus_core::result::{ChallengeReport, CritiqueReport, SynthesisReport};
use argus_core::{AgentKind, AgentResult, MarketContext};
use argus_providers::{IntelligenceProvider, ProviderRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

pub const DRAFT_STEP: &str = "Draft Recommendation";
pub const CHALLENGE_STEP: &str = "Challenge Draft";
pub const CRITIQUE_STEP: &str = "Critique Draft";
pub const FINALIZE_STEP: &str = "Finalize Recommendation";

fn metric_line(key: &str, metric: &CalculatedMetric) -> String {
    match metric.value {
        Some(v) => format!("- {key}: {v:.4} ({})", metric.formula),
        None => format!("- {key}: unavailable ({})", metric.formula),
    }
}

/// Briefing for the draft call: per-agent summaries, derived metrics, and
/// the merged raw data. Deliberately carries no critique text.
fn draft_briefing(
    runner: &AgentRunner,
    dossier: &Dossier,
    metrics: &BTreeMap<String, CalculatedMetric>,
) -> String {
    let mut out = format!("Subject: {}\n\nAgent findings:\n", runner.subject());
    for (kind, summary) in dossier.summaries() {
        out.push_str(&format!("- {kind}: {summary}\n"));
    }
    out.push_str("\nCalculated metrics:\n");
    for (key, metric) in metrics {
        out.push_str(&metric_line(key, metric));
        out.push('\n');
    }
    out.push_str("\nMerged data:\n");
    out.push_str(&serde_json::to_string(dossier).unwrap_or_else(|_| "{}".to_string()));
    out
}

fn summaries_block(summaries: &[(AgentKind, String)]) -> String {
    let mut out = String::from("Agent summaries:\n");
    for (kind, summary) in summaries {
        out.push_str(&format!("- {kind}: {summary}\n"));
    }
    out
}

async fn invoke(
    runner: &AgentRunner,
    provider: &Arc<dyn IntelligenceProvider>,
    step_name: &str,
    request: ProviderRequest,
) -> Option<AgentResult> {
    let briefing = request.briefing.clone();
    runner
        .run(request.agent, step_name, false, briefing, || {
            let provider = Arc::clone(provider);
            let request = request.clone();
            async move { provider.gather(request).await }
        })
        .await
}

/// Produce the draft recommendation. A `None` here is fatal to the run.
pub async fn draft(
    runner: &AgentRunner,
    provider: Arc<dyn IntelligenceProvider>,
    context: &MarketContext,
    dossier: &Dossier,
    metrics: &BTreeMap<String, CalculatedMetric>,
) -> Option<SynthesisReport> {
    let request = ProviderRequest::new(
        AgentKind::Synthesizer,
        runner.subject().clone(),
        context.clone(),
    )
    .with_briefing(draft_briefing(runner, dossier, metrics));

    match invoke(runner, &provider, DRAFT_STEP, request).await? {
        AgentResult::Synthesis(report) => Some(report),
        other => {
            warn!(kind = %other.kind(), "draft call returned a non-synthesis result");
            None
        }
    }
}

/// Run the challenger over the draft. A `None` is silently omitted.
pub async fn challenge(
    runner: &AgentRunner,
    provider: Arc<dyn IntelligenceProvider>,
    context: &MarketContext,
    draft: &SynthesisReport,
) -> Option<ChallengeReport> {
    let briefing = format!(
        "Draft recommendation under review:\n{}\n\nRationale:\n{}",
        draft.recommendation, draft.rationale
    );
    let request = ProviderRequest::new(
        AgentKind::Challenger,
        runner.subject().clone(),
        context.clone(),
    )
    .with_briefing(briefing);

    match invoke(runner, &provider, CHALLENGE_STEP, request).await? {
        AgentResult::Challenge(report) => Some(report),
        other => {
            warn!(kind = %other.kind(), "challenge call returned an unexpected result");
            None
        }
    }
}

/// Ask the critic for one conflict and one remediation question.
pub async fn critique(
    runner: &AgentRunner,
    provider: Arc<dyn IntelligenceProvider>,
    context: &MarketContext,
    draft: &SynthesisReport,
    summaries: &[(AgentKind, String)],
) -> Option<CritiqueReport> {
    let briefing = format!(
        "Draft recommendation:\n{}\n\n{}",
        draft.recommendation,
        summaries_block(summaries)
    );
    let request = ProviderRequest::new(
        AgentKind::Critic,
        runner.subject().clone(),
        context.clone(),
    )
    .with_briefing(briefing);

    match invoke(runner, &provider, CRITIQUE_STEP, request).await? {
        AgentResult::Critique(report) => Some(report),
        other => {
            warn!(kind = %other.kind(), "critique call returned an unexpected result");
            None
        }
    }
}

/// Re-invoke the synthesizer with the conflict as a mandatory instruction.
///
/// The caller falls back to the draft when this returns `None`.
pub async fn finalize(
    runner: &AgentRunner,
    provider: Arc<dyn IntelligenceProvider>,
    context: &MarketContext,
    draft: &SynthesisReport,
    critique: &CritiqueReport,
) -> Option<SynthesisReport> {
    let briefing = format!(
        "Prior draft:\n{}\n\nRationale:\n{}",
        draft.recommendation, draft.rationale
    );
    let refinement = format!(
        "Address this conflict before finalizing: {} Resolve: {}",
        critique.conflict, critique.remediation_question
    );
    let request = ProviderRequest::new(
        AgentKind::Synthesizer,
        runner.subject().clone(),
        context.clone(),
    )
    .with_briefing(briefing)
    .with_refinement(refinement);

    match invoke(runner, &provider, FINALIZE_STEP, request).await? {
        AgentResult::Synthesis(report) => Some(report),
        other => {
            warn!(kind = %other.kind(), "finalize call returned a non-synthesis result");
            None
        }
    }
}
