//! Workflow driver
//!
//! `AnalysisEngine` owns the shared state, cache, and provider, and is the
//! only component that moves the phase machine. A run walks
//! `Idle → Planning → Gathering → Calculating → Verifying → Drafting →
//! Debating → Finalizing → Complete`, dropping to `Error` on fatal failure
//! (planning validation, failed draft) and to `Paused` when gathering was
//! partial. Starting a run is always a full restart; the previous run is
//! superseded, never resumed.

use crate::cache::AgentCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::gather::{Dossier, gather};
use crate::metrics::{calculate_all_metrics, cross_check};
use crate::runner::AgentRunner;
use crate::state::{RunId, WorkflowSnapshot, WorkflowState};
use crate::store::{KeyValueStore, MemoryStore};
use crate::synthesis;
use argus_core::{AgentKind, AgentSelection, MarketContext, Phase, StepOutcome, Subject};
use argus_providers::IntelligenceProvider;
use argus_utils::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const PLAN_STEP: &str = "Plan Analysis";
pub const METRICS_STEP: &str = "Calculate Metrics";
pub const VERIFY_STEP: &str = "Cross-Check Metrics";
pub const PAUSE_STEP: &str = "Analysis Paused";

/// Top-level orchestrator for analysis runs.
pub struct AnalysisEngine {
    state: WorkflowState,
    cache: AgentCache,
    provider: Arc<dyn IntelligenceProvider>,
    config: EngineConfig,
    directory: Arc<HashMap<Subject, MarketContext>>,
    restrict_to_directory: bool,
}

impl AnalysisEngine {
    /// Create a new engine builder
    pub fn builder() -> AnalysisEngineBuilder {
        AnalysisEngineBuilder::default()
    }

    /// Run a full analysis for `subject`.
    ///
    /// Unconditionally resets any prior run, whatever state it was in, and
    /// drives the new run to a terminal phase. Returns the run id; the
    /// outcome is read through [`AnalysisEngine::snapshot`].
    pub async fn start(&self, subject: Subject, selection: AgentSelection) -> RunId {
        let run = self.state.begin_run(subject.clone(), selection.clone()).await;
        self.drive(run, subject, selection).await;
        run
    }

    /// Re-run `subject` with the selection remembered from its last run.
    pub async fn retry(&self, subject: Subject) -> Result<RunId> {
        let remembered = self.state.subject().await;
        if remembered.as_ref() != Some(&subject) {
            return Err(EngineError::UnknownSubject(subject.to_string()));
        }
        let selection = self.state.selection().await;
        info!(subject = %subject, "retrying with remembered selection");
        Ok(self.start(subject, selection).await)
    }

    /// Current phase of the engine's run.
    pub async fn phase(&self) -> Phase {
        self.state.phase().await
    }

    /// Immutable view of the current run.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.state.snapshot().await
    }

    /// The persisted whole-result dossier for a subject, with freshness.
    pub async fn cached_dossier(&self, subject: &Subject) -> Option<(Dossier, bool)> {
        self.cache.get_dossier(subject).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve_context(&self, subject: &Subject) -> std::result::Result<MarketContext, String> {
        if let Some(context) = self.directory.get(subject) {
            return Ok(context.clone());
        }
        if self.restrict_to_directory {
            Err(format!("{subject} is not in the configured market directory"))
        } else {
            Ok(MarketContext::default())
        }
    }

    fn plan_summary(selection: &AgentSelection) -> String {
        let specialists = selection.enabled_specialists();
        let mut plan = format!(
            "Scheduled quote and financials plus {} specialist(s)",
            specialists.len()
        );
        if !specialists.is_empty() {
            let names: Vec<String> = specialists.iter().map(ToString::to_string).collect();
            plan.push_str(&format!(" ({})", names.join(", ")));
        }
        if selection.challenger_enabled() {
            plan.push_str("; challenger enabled");
        }
        plan
    }

    async fn drive(&self, run: RunId, subject: Subject, selection: AgentSelection) {
        // Planning: resolve market configuration and record the plan
        if !self.state.set_phase(run, Phase::Planning).await {
            return;
        }
        let context = match self.resolve_context(&subject) {
            Ok(context) => {
                self.state
                    .note_local(
                        run,
                        PLAN_STEP,
                        StepOutcome::complete(Self::plan_summary(&selection)),
                    )
                    .await;
                context
            }
            Err(message) => {
                error!(subject = %subject, %message, "planning failed");
                self.state
                    .note_local(run, PLAN_STEP, StepOutcome::error(message))
                    .await;
                self.state.set_phase(run, Phase::Error).await;
                return;
            }
        };

        let runner = AgentRunner::new(
            self.state.clone(),
            self.cache.clone(),
            self.config.retry_policy(),
            self.config.call_timeout,
            run,
            subject.clone(),
        );

        // Gathering: concurrent fan-out, merge regardless of failures
        if !self.state.set_phase(run, Phase::Gathering).await {
            return;
        }
        let dossier = gather(&runner, Arc::clone(&self.provider), &context, &selection).await;
        self.state.set_dossier(run, dossier.clone()).await;

        // Calculating: synchronous metric derivation, never fails
        if !self.state.set_phase(run, Phase::Calculating).await {
            return;
        }
        let metrics = calculate_all_metrics(&dossier);
        self.state
            .note_local(
                run,
                METRICS_STEP,
                StepOutcome::complete(format!("{} metrics derived", metrics.len())),
            )
            .await;
        self.state.set_metrics(run, metrics.clone()).await;

        // Verifying: advisory cross-check, never fails
        if !self.state.set_phase(run, Phase::Verifying).await {
            return;
        }
        let notes = cross_check(&metrics);
        let verify_outcome = if notes.is_empty() {
            StepOutcome::complete("No inconsistencies found")
        } else {
            StepOutcome::complete(notes.join("; "))
        };
        self.state.note_local(run, VERIFY_STEP, verify_outcome).await;

        // Drafting: the one call whose failure is fatal to the run
        if !self.state.set_phase(run, Phase::Drafting).await {
            return;
        }
        let Some(draft) = synthesis::draft(
            &runner,
            Arc::clone(&self.provider),
            &context,
            &dossier,
            &metrics,
        )
        .await
        else {
            error!(run_id = %run, subject = %subject, "draft synthesis failed, no usable result");
            self.state.set_phase(run, Phase::Error).await;
            return;
        };
        self.state.set_report(run, draft.clone()).await;

        // Debating: optional challenger, then the critique
        if !self.state.set_phase(run, Phase::Debating).await {
            return;
        }
        // A failed challenger is omitted; the debate continues without it
        let mut summaries = dossier.summaries();
        if selection.challenger_enabled() {
            if let Some(challenge) =
                synthesis::challenge(&runner, Arc::clone(&self.provider), &context, &draft).await
            {
                summaries.push((AgentKind::Challenger, challenge.bear_case));
            }
        }
        let critique = synthesis::critique(
            &runner,
            Arc::clone(&self.provider),
            &context,
            &draft,
            &summaries,
        )
        .await;

        // Partial gathering always ends the run at the draft, inviting retry
        if dossier.any_failed() {
            let failed: Vec<String> = dossier
                .failed_agents()
                .iter()
                .map(ToString::to_string)
                .collect();
            let message = format!(
                "Partial data: {} did not answer. Retry the analysis to fill the gaps.",
                failed.join(", ")
            );
            warn!(run_id = %run, subject = %subject, "run paused on partial data");
            self.state
                .note_local(
                    run,
                    PAUSE_STEP,
                    StepOutcome::paused(message.clone()).with_remediation(message),
                )
                .await;
            self.state.set_phase(run, Phase::Paused).await;
            return;
        }

        // No critique to act on; the draft stands as the final result
        let Some(critique) = critique else {
            self.state.set_phase(run, Phase::Complete).await;
            return;
        };

        // Finalizing: address the conflict, fall back to the draft on failure
        if !self.state.set_phase(run, Phase::Finalizing).await {
            return;
        }
        match synthesis::finalize(
            &runner,
            Arc::clone(&self.provider),
            &context,
            &draft,
            &critique,
        )
        .await
        {
            Some(final_report) => {
                self.state.set_report(run, final_report).await;
            }
            None => {
                warn!(run_id = %run, "finalize failed, keeping the draft result");
            }
        }
        self.state.set_phase(run, Phase::Complete).await;
    }
}

impl Clone for AnalysisEngine {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            cache: self.cache.clone(),
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
            directory: Arc::clone(&self.directory),
            restrict_to_directory: self.restrict_to_directory,
        }
    }
}

/// Builder for [`AnalysisEngine`]
#[derive(Default)]
pub struct AnalysisEngineBuilder {
    provider: Option<Arc<dyn IntelligenceProvider>>,
    config: Option<EngineConfig>,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    directory: HashMap<Subject, MarketContext>,
    restrict_to_directory: bool,
}

impl AnalysisEngineBuilder {
    /// Set the intelligence provider (required)
    pub fn provider(mut self, provider: Arc<dyn IntelligenceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the persistent store backing the cache
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the time source for cache freshness
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register market configuration for a subject
    pub fn subject_context(mut self, subject: Subject, context: MarketContext) -> Self {
        self.directory.insert(subject, context);
        self
    }

    /// Reject subjects that have no registered market configuration
    pub fn restrict_to_directory(mut self) -> Self {
        self.restrict_to_directory = true;
        self
    }

    /// Build the engine, hydrating the cache from the store.
    pub async fn build(self) -> Result<AnalysisEngine> {
        let provider = self.provider.ok_or_else(|| {
            EngineError::Config("an intelligence provider is required".to_string())
        })?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let cache = AgentCache::new(config.cache_ttl, clock, store);
        cache.hydrate().await;

        Ok(AnalysisEngine {
            state: WorkflowState::new(),
            cache,
            provider,
            config,
            directory: Arc::new(self.directory),
            restrict_to_directory: self.restrict_to_directory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::FROM_CACHE;
    use argus_core::result::{
        ChallengeReport, CompetitiveLandscape, CritiqueReport, EsgProfile, FinancialStatements,
        MacroContext, QuantSignals, QuoteData, SentimentReading, SynthesisReport,
    };
    use argus_core::{AgentResult, ExecutionStep, StepStatus};
    use argus_providers::{ProviderError, ProviderRequest, ScriptedProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CONFLICT: &str = "Sentiment contradicts the quantitative signal";

    fn subject() -> Subject {
        Subject::new("AAPL").unwrap()
    }

    fn quote_result() -> AgentResult {
        AgentResult::Quote(QuoteData {
            symbol: "AAPL".to_string(),
            price: 190.0,
            pe_ratio: Some(29.0),
            sources: vec!["https://example.com/quote".to_string()],
            ..Default::default()
        })
    }

    fn financials_result() -> AgentResult {
        AgentResult::Financials(FinancialStatements {
            symbol: "AAPL".to_string(),
            total_debt: Some(90.0e9),
            total_equity: Some(60.0e9),
            net_income: Some(15.0e9),
            pb_ratio: Some(4.0),
            ..Default::default()
        })
    }

    fn draft_result() -> AgentResult {
        AgentResult::Synthesis(SynthesisReport {
            recommendation: "Hold AAPL".to_string(),
            rationale: "Fundamentals solid, valuation rich".to_string(),
            confidence: Some(0.7),
            ..Default::default()
        })
    }

    fn final_result() -> AgentResult {
        AgentResult::Synthesis(SynthesisReport {
            recommendation: format!("Hold AAPL. Noted conflict: {CONFLICT}."),
            rationale: "Conflict weighed against the longer horizon".to_string(),
            confidence: Some(0.75),
            ..Default::default()
        })
    }

    fn critique_result() -> AgentResult {
        AgentResult::Critique(CritiqueReport {
            conflict: CONFLICT.to_string(),
            remediation_question: "Which time horizon should dominate?".to_string(),
            target_agent: Some(AgentKind::Sentiment),
            ..Default::default()
        })
    }

    /// Scripts every agent so a full run succeeds.
    fn full_script() -> ScriptedProvider {
        ScriptedProvider::new()
            .with_repeating(AgentKind::Quote, quote_result())
            .with_repeating(AgentKind::Financials, financials_result())
            .with_repeating(AgentKind::Esg, AgentResult::Esg(EsgProfile::default()))
            .with_repeating(AgentKind::Macro, AgentResult::Macro(MacroContext::default()))
            .with_repeating(
                AgentKind::Competitive,
                AgentResult::Competitive(CompetitiveLandscape::default()),
            )
            .with_repeating(
                AgentKind::Sentiment,
                AgentResult::Sentiment(SentimentReading {
                    score: 0.6,
                    ..Default::default()
                }),
            )
            .with_repeating(
                AgentKind::Quantitative,
                AgentResult::Quant(QuantSignals::default()),
            )
            .with_repeating(AgentKind::Critic, critique_result())
    }

    async fn engine_with(provider: ScriptedProvider) -> (AnalysisEngine, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let engine = AnalysisEngine::builder()
            .provider(provider.clone())
            .build()
            .await
            .unwrap();
        (engine, provider)
    }

    #[tokio::test]
    async fn builder_requires_a_provider() {
        let result = AnalysisEngine::builder().build().await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn full_success_embeds_conflict() {
        let provider = full_script()
            .with_result(AgentKind::Synthesizer, draft_result())
            .with_result(AgentKind::Synthesizer, final_result());
        let (engine, provider) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::standard()).await;
        let snap = engine.snapshot().await;

        assert_eq!(snap.phase, Phase::Complete);
        assert_eq!(
            snap.phases,
            vec![
                Phase::Idle,
                Phase::Planning,
                Phase::Gathering,
                Phase::Calculating,
                Phase::Verifying,
                Phase::Drafting,
                Phase::Debating,
                Phase::Finalizing,
                Phase::Complete,
            ]
        );

        // The exposed result is the finalize output with the conflict embedded
        let report = snap.report.unwrap();
        assert!(report.recommendation.contains(CONFLICT));

        // Non-null metrics came out of Calculating
        let metrics = snap.metrics.unwrap();
        assert_eq!(metrics["pe_ratio"].value, Some(29.0));

        // The finalize call carried the conflict as a mandatory instruction
        let synth_requests = provider.requests_for(AgentKind::Synthesizer).await;
        assert_eq!(synth_requests.len(), 2);
        assert!(synth_requests[0].refinement.is_none());
        assert!(synth_requests[1].refinement.as_deref().unwrap().contains(CONFLICT));
    }

    #[tokio::test]
    async fn phase_sequence_is_monotonic() {
        let provider = full_script()
            .with_result(AgentKind::Synthesizer, draft_result())
            .with_result(AgentKind::Synthesizer, final_result());
        let (engine, _) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::standard()).await;
        let snap = engine.snapshot().await;

        for pair in snap.phases.windows(2) {
            assert!(
                pair[0].rank() < pair[1].rank(),
                "phase went backwards: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn partial_gathering_failure_pauses_run() {
        // ESG enabled and failing transiently through its whole retry budget;
        // macro stays disabled and must never be scheduled
        let provider = ScriptedProvider::new()
            .with_repeating(AgentKind::Quote, quote_result())
            .with_repeating(AgentKind::Financials, financials_result())
            .with_failure(
                AgentKind::Esg,
                ProviderError::Transient("quota exhausted".to_string()),
            )
            .with_failure(
                AgentKind::Esg,
                ProviderError::Transient("quota exhausted".to_string()),
            )
            .with_repeating(AgentKind::Synthesizer, draft_result())
            .with_repeating(AgentKind::Critic, critique_result());
        let (engine, provider) = engine_with(provider).await;

        let selection = AgentSelection::minimal().with(AgentKind::Esg);
        engine.start(subject(), selection).await;
        let snap = engine.snapshot().await;

        assert_eq!(snap.phase, Phase::Paused);

        // Exactly one error step for the failed agent, none for the disabled one
        let error_steps: Vec<_> = snap
            .log
            .iter()
            .filter(|s| s.status == StepStatus::Error)
            .collect();
        assert_eq!(error_steps.len(), 1);
        assert_eq!(error_steps[0].agent, AgentKind::Esg);
        assert!(snap.steps_for(AgentKind::Macro).is_empty());

        // Initial attempt plus one retry
        assert_eq!(provider.call_count(AgentKind::Esg).await, 2);

        // The draft survives as the exposed result, with a pause note
        assert_eq!(snap.report.unwrap().recommendation, "Hold AAPL");
        let pause = snap.log.iter().find(|s| s.step_name == PAUSE_STEP).unwrap();
        assert_eq!(pause.status, StepStatus::Paused);
        assert!(pause.remediation.as_deref().unwrap().contains("esg"));

        // Critique ran despite the partial failure, but no finalize happened
        assert_eq!(provider.call_count(AgentKind::Critic).await, 1);
        assert!(!snap.phases.contains(&Phase::Finalizing));
    }

    #[tokio::test]
    async fn draft_failure_errors_run() {
        let provider = full_script().with_failure(
            AgentKind::Synthesizer,
            ProviderError::BadRequest("briefing rejected".to_string()),
        );
        let (engine, provider) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::standard()).await;
        let snap = engine.snapshot().await;

        assert_eq!(snap.phase, Phase::Error);
        // The run died in Drafting; the debate never started
        assert_eq!(provider.call_count(AgentKind::Critic).await, 0);
        assert!(snap.report.is_none());
    }

    #[tokio::test]
    async fn finalize_failure_falls_back_to_draft() {
        let provider = full_script()
            .with_result(AgentKind::Synthesizer, draft_result())
            .with_failure(
                AgentKind::Synthesizer,
                ProviderError::BadRequest("refinement rejected".to_string()),
            );
        let (engine, _) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::standard()).await;
        let snap = engine.snapshot().await;

        assert_eq!(snap.phase, Phase::Complete);
        assert_eq!(snap.report.unwrap().recommendation, "Hold AAPL");
    }

    #[tokio::test]
    async fn failed_challenger_is_omitted_silently() {
        let provider = full_script()
            .with_failure(AgentKind::Challenger, ProviderError::AuthInvalid)
            .with_result(AgentKind::Synthesizer, draft_result())
            .with_result(AgentKind::Synthesizer, final_result());
        let (engine, provider) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::all()).await;
        let snap = engine.snapshot().await;

        // The run completes; the challenger failure is logged but not fatal
        assert_eq!(snap.phase, Phase::Complete);
        assert_eq!(snap.steps_for(AgentKind::Challenger).len(), 1);
        assert_eq!(
            snap.steps_for(AgentKind::Challenger)[0].status,
            StepStatus::Error
        );

        // The critic's briefing carries no challenger summary
        let critic_requests = provider.requests_for(AgentKind::Critic).await;
        assert!(!critic_requests[0].briefing.as_deref().unwrap().contains("challenger:"));
    }

    #[tokio::test]
    async fn enabled_challenger_feeds_the_critic() {
        let provider = full_script()
            .with_repeating(
                AgentKind::Challenger,
                AgentResult::Challenge(ChallengeReport {
                    bear_case: "Multiple compression is underpriced".to_string(),
                    ..Default::default()
                }),
            )
            .with_result(AgentKind::Synthesizer, draft_result())
            .with_result(AgentKind::Synthesizer, final_result());
        let (engine, provider) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::all()).await;

        let critic_requests = provider.requests_for(AgentKind::Critic).await;
        let briefing = critic_requests[0].briefing.as_deref().unwrap();
        assert!(briefing.contains("challenger: Multiple compression is underpriced"));
    }

    #[tokio::test]
    async fn unknown_subject_fails_planning_when_restricted() {
        let provider = Arc::new(full_script());
        let engine = AnalysisEngine::builder()
            .provider(provider.clone())
            .subject_context(subject(), MarketContext::default().with_currency("USD"))
            .restrict_to_directory()
            .build()
            .await
            .unwrap();

        engine
            .start(Subject::new("TSLA").unwrap(), AgentSelection::standard())
            .await;
        let snap = engine.snapshot().await;

        assert_eq!(snap.phase, Phase::Error);
        assert_eq!(snap.phases, vec![Phase::Idle, Phase::Planning, Phase::Error]);
        let plan = snap.log.iter().find(|s| s.step_name == PLAN_STEP).unwrap();
        assert_eq!(plan.status, StepStatus::Error);
        // Nothing was gathered for a rejected subject
        assert_eq!(provider.call_count(AgentKind::Quote).await, 0);
    }

    #[tokio::test]
    async fn retry_reuses_remembered_selection() {
        let provider = full_script()
            .with_repeating(AgentKind::Synthesizer, draft_result());
        let (engine, provider) = engine_with(provider).await;

        let selection = AgentSelection::minimal().with(AgentKind::Esg);
        engine.start(subject(), selection).await;
        engine.retry(subject()).await.unwrap();

        let snap = engine.snapshot().await;
        assert_eq!(snap.phase, Phase::Complete);

        // The retried run scheduled ESG again (served from cache) and still
        // never touched the disabled specialists
        assert_eq!(snap.steps_for(AgentKind::Esg).len(), 1);
        assert_eq!(
            snap.steps_for(AgentKind::Esg)[0].output.as_deref(),
            Some(FROM_CACHE)
        );
        assert!(snap.steps_for(AgentKind::Macro).is_empty());
        assert_eq!(provider.call_count(AgentKind::Esg).await, 1);
        // Live lookups were re-fetched for both runs
        assert_eq!(provider.call_count(AgentKind::Quote).await, 2);
    }

    #[tokio::test]
    async fn retry_without_prior_run_is_rejected() {
        let (engine, _) = engine_with(full_script()).await;
        let result = engine.retry(subject()).await;
        assert!(matches!(result, Err(EngineError::UnknownSubject(_))));
    }

    #[tokio::test]
    async fn completed_run_persists_the_dossier() {
        let provider = full_script()
            .with_result(AgentKind::Synthesizer, draft_result())
            .with_result(AgentKind::Synthesizer, final_result());
        let (engine, _) = engine_with(provider).await;

        engine.start(subject(), AgentSelection::standard()).await;

        let (dossier, fresh) = engine.cached_dossier(&subject()).await.unwrap();
        assert!(fresh);
        assert!(dossier.quote().is_some());
        assert!(dossier.financials().is_some());
    }

    /// Stalls the first quote call indefinitely, answers instantly afterward.
    struct StallingProvider {
        inner: ScriptedProvider,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IntelligenceProvider for StallingProvider {
        async fn gather(
            &self,
            request: ProviderRequest,
        ) -> argus_providers::Result<AgentResult> {
            if request.agent == AgentKind::Quote
                && self.calls.fetch_add(1, Ordering::SeqCst) == 0
            {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.inner.gather(request).await
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_inflight_run() {
        let provider = Arc::new(StallingProvider {
            inner: full_script().with_repeating(AgentKind::Synthesizer, draft_result()),
            calls: AtomicUsize::new(0),
        });
        let engine = AnalysisEngine::builder()
            .provider(provider.clone())
            .build()
            .await
            .unwrap();

        // First run blocks inside the gathering fan-out
        let background = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .start(Subject::new("NVDA").unwrap(), AgentSelection::minimal())
                    .await
            })
        };
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        // Restart for a different subject while the first is still settling
        let second = engine.start(subject(), AgentSelection::minimal()).await;
        let first = background.await.unwrap();
        assert_ne!(first, second);

        let snap = engine.snapshot().await;
        assert_eq!(snap.run_id, second);
        assert_eq!(snap.subject.as_ref().unwrap().as_str(), "AAPL");
        assert_eq!(snap.phase, Phase::Complete);

        // Nothing from the superseded run leaked into the new run's log
        assert!(snap.log.iter().all(ExecutionStep::is_settled));
        let quote_steps = snap.steps_for(AgentKind::Quote);
        assert_eq!(quote_steps.len(), 1);
        assert_eq!(quote_steps[0].status, StepStatus::Complete);
    }
}
