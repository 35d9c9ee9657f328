//! Run-scoped workflow state
//!
//! One logical run at a time. Every mutation carries the id of the run that
//! requested it; mutations from a superseded run are discarded, so a slow
//! agent call settling after a restart can never touch the new run's log.

use crate::gather::Dossier;
use crate::metrics::CalculatedMetric;
use argus_core::result::SynthesisReport;
use argus_core::{
    AgentKind, AgentSelection, AgentStatus, ExecutionStep, Phase, StepOutcome, Subject,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Identity of one analysis run.
pub type RunId = Uuid;

#[derive(Debug)]
struct RunState {
    run_id: RunId,
    subject: Option<Subject>,
    selection: AgentSelection,
    phase: Phase,
    phase_history: Vec<Phase>,
    log: Vec<ExecutionStep>,
    next_step_id: u64,
    statuses: HashMap<AgentKind, AgentStatus>,
    dossier: Option<Dossier>,
    metrics: Option<BTreeMap<String, CalculatedMetric>>,
    report: Option<SynthesisReport>,
}

impl RunState {
    fn reset(&mut self, subject: Subject, selection: AgentSelection) -> RunId {
        self.run_id = Uuid::new_v4();
        self.subject = Some(subject);
        self.selection = selection;
        self.phase = Phase::Idle;
        self.phase_history = vec![Phase::Idle];
        self.log.clear();
        self.next_step_id = 0;
        self.statuses.clear();
        self.dossier = None;
        self.metrics = None;
        self.report = None;
        self.run_id
    }
}

/// Shared, run-id-guarded workflow state.
pub struct WorkflowState {
    inner: Arc<RwLock<RunState>>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RunState {
                run_id: Uuid::new_v4(),
                subject: None,
                selection: AgentSelection::default(),
                phase: Phase::Idle,
                phase_history: vec![Phase::Idle],
                log: Vec::new(),
                next_step_id: 0,
                statuses: HashMap::new(),
                dossier: None,
                metrics: None,
                report: None,
            })),
        }
    }

    /// Reset everything and mint the identity of a new run.
    ///
    /// Any previous run becomes superseded the moment this returns; its
    /// pending mutations will fail the run-id guard.
    pub async fn begin_run(&self, subject: Subject, selection: AgentSelection) -> RunId {
        let mut state = self.inner.write().await;
        let run = state.reset(subject.clone(), selection);
        info!(run_id = %run, subject = %subject, "run started");
        run
    }

    pub async fn run_id(&self) -> RunId {
        self.inner.read().await.run_id
    }

    pub async fn phase(&self) -> Phase {
        self.inner.read().await.phase
    }

    pub async fn subject(&self) -> Option<Subject> {
        self.inner.read().await.subject.clone()
    }

    pub async fn selection(&self) -> AgentSelection {
        self.inner.read().await.selection.clone()
    }

    /// Move the run to a new phase. Returns false for a superseded run.
    pub async fn set_phase(&self, run: RunId, phase: Phase) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            debug!(run_id = %run, ?phase, "phase change from superseded run discarded");
            return false;
        }
        if state.phase != phase {
            info!(run_id = %run, from = %state.phase, to = %phase, "phase transition");
            state.phase = phase;
            state.phase_history.push(phase);
        }
        true
    }

    /// Open a `Running` log entry; `None` when the run is superseded.
    pub async fn begin_step(
        &self,
        run: RunId,
        agent: AgentKind,
        step_name: &str,
        input: Option<String>,
    ) -> Option<u64> {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            debug!(run_id = %run, step_name, "step from superseded run discarded");
            return None;
        }
        let id = state.next_step_id;
        state.next_step_id += 1;
        state.log.push(ExecutionStep::begin(id, agent, step_name, input));
        Some(id)
    }

    /// Settle a running step exactly once.
    pub async fn settle_step(&self, run: RunId, step_id: u64, outcome: StepOutcome) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            debug!(run_id = %run, step_id, "settlement from superseded run discarded");
            return false;
        }
        let Some(step) = state.log.iter_mut().find(|s| s.id == step_id) else {
            debug!(step_id, "settlement for unknown step discarded");
            return false;
        };
        if step.is_settled() {
            debug!(step_id, "second settlement discarded");
            return false;
        }
        step.settle(outcome);
        true
    }

    /// Record a bookkeeping action as one already-settled `Local` step.
    pub async fn note_local(&self, run: RunId, step_name: &str, outcome: StepOutcome) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            debug!(run_id = %run, step_name, "local step from superseded run discarded");
            return false;
        }
        let id = state.next_step_id;
        state.next_step_id += 1;
        let mut step = ExecutionStep::begin(id, AgentKind::Local, step_name, None);
        step.settle(outcome);
        state.log.push(step);
        true
    }

    pub async fn set_status(&self, run: RunId, agent: AgentKind, status: AgentStatus) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            return false;
        }
        state.statuses.insert(agent, status);
        true
    }

    pub async fn set_dossier(&self, run: RunId, dossier: Dossier) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            return false;
        }
        state.dossier = Some(dossier);
        true
    }

    pub async fn set_metrics(
        &self,
        run: RunId,
        metrics: BTreeMap<String, CalculatedMetric>,
    ) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            return false;
        }
        state.metrics = Some(metrics);
        true
    }

    pub async fn set_report(&self, run: RunId, report: SynthesisReport) -> bool {
        let mut state = self.inner.write().await;
        if state.run_id != run {
            return false;
        }
        state.report = Some(report);
        true
    }

    /// Immutable copy of everything a consumer renders.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.inner.read().await;
        WorkflowSnapshot {
            run_id: state.run_id,
            subject: state.subject.clone(),
            phase: state.phase,
            phases: state.phase_history.clone(),
            log: state.log.clone(),
            statuses: state.statuses.clone(),
            dossier: state.dossier.clone(),
            metrics: state.metrics.clone(),
            report: state.report.clone(),
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WorkflowState {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Point-in-time view of a run for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub run_id: RunId,
    pub subject: Option<Subject>,
    pub phase: Phase,
    /// Every phase the run has passed through, in order.
    pub phases: Vec<Phase>,
    pub log: Vec<ExecutionStep>,
    pub statuses: HashMap<AgentKind, AgentStatus>,
    pub dossier: Option<Dossier>,
    pub metrics: Option<BTreeMap<String, CalculatedMetric>>,
    pub report: Option<SynthesisReport>,
}

impl WorkflowSnapshot {
    /// Log entries for one agent key, in append order.
    pub fn steps_for(&self, agent: AgentKind) -> Vec<&ExecutionStep> {
        self.log.iter().filter(|s| s.agent == agent).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::StepStatus;

    fn subject() -> Subject {
        Subject::new("AAPL").unwrap()
    }

    #[tokio::test]
    async fn begin_run_resets_previous_state() {
        let state = WorkflowState::new();
        let first = state.begin_run(subject(), AgentSelection::default()).await;
        state.set_phase(first, Phase::Planning).await;
        state
            .begin_step(first, AgentKind::Quote, "Fetch Quote", None)
            .await;

        let second = state
            .begin_run(Subject::new("MSFT").unwrap(), AgentSelection::minimal())
            .await;
        assert_ne!(first, second);

        let snap = state.snapshot().await;
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.phases, vec![Phase::Idle]);
        assert!(snap.log.is_empty());
        assert!(snap.statuses.is_empty());
        assert_eq!(snap.subject.unwrap().as_str(), "MSFT");
    }

    #[tokio::test]
    async fn superseded_run_cannot_mutate() {
        let state = WorkflowState::new();
        let old = state.begin_run(subject(), AgentSelection::default()).await;
        let step = state
            .begin_step(old, AgentKind::Esg, "ESG Assessment", None)
            .await
            .unwrap();

        // Restart supersedes the first run before its step settles
        let new = state.begin_run(subject(), AgentSelection::default()).await;

        assert!(!state.set_phase(old, Phase::Gathering).await);
        assert!(
            !state
                .settle_step(old, step, StepOutcome::complete("late"))
                .await
        );
        assert!(
            !state
                .set_status(old, AgentKind::Esg, AgentStatus::loading())
                .await
        );

        let snap = state.snapshot().await;
        assert_eq!(snap.run_id, new);
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.log.is_empty());
        assert!(snap.statuses.is_empty());
    }

    #[tokio::test]
    async fn steps_settle_exactly_once() {
        let state = WorkflowState::new();
        let run = state.begin_run(subject(), AgentSelection::default()).await;
        let step = state
            .begin_step(run, AgentKind::Quote, "Fetch Quote", None)
            .await
            .unwrap();

        assert!(
            state
                .settle_step(run, step, StepOutcome::complete("ok"))
                .await
        );
        assert!(
            !state
                .settle_step(run, step, StepOutcome::error("too late"))
                .await
        );

        let snap = state.snapshot().await;
        assert_eq!(snap.log[0].status, StepStatus::Complete);
        assert_eq!(snap.log[0].output.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn step_ids_are_monotonic() {
        let state = WorkflowState::new();
        let run = state.begin_run(subject(), AgentSelection::default()).await;

        let a = state
            .begin_step(run, AgentKind::Quote, "Fetch Quote", None)
            .await
            .unwrap();
        let b = state
            .begin_step(run, AgentKind::Financials, "Fetch Financial Statements", None)
            .await
            .unwrap();
        state
            .note_local(run, "Metrics Calculated", StepOutcome::complete("4 metrics"))
            .await;

        assert!(b > a);
        let snap = state.snapshot().await;
        assert_eq!(snap.log.len(), 3);
        assert_eq!(snap.log[2].id, 2);
        assert_eq!(snap.log[2].agent, AgentKind::Local);
        assert!(snap.log[2].is_settled());
    }

    #[tokio::test]
    async fn phase_history_records_transitions_in_order() {
        let state = WorkflowState::new();
        let run = state.begin_run(subject(), AgentSelection::default()).await;
        state.set_phase(run, Phase::Planning).await;
        state.set_phase(run, Phase::Gathering).await;
        // Setting the current phase again is a no-op
        state.set_phase(run, Phase::Gathering).await;

        let snap = state.snapshot().await;
        assert_eq!(
            snap.phases,
            vec![Phase::Idle, Phase::Planning, Phase::Gathering]
        );
    }
}
