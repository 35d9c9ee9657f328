//! Concurrent agent-invocation wrapper
//!
//! Every provider call in a run goes through [`AgentRunner::run`], which
//! handles status flags, execution-log entries, the read-before-call cache,
//! retry with backoff, and the per-call timeout. A failed call never escapes
//! as an error; it resolves to `None` with the failure recorded in the log,
//! and only the workflow driver decides what an absorbed failure means.

use crate::cache::AgentCache;
use crate::state::{RunId, WorkflowState};
use argus_core::{AgentKind, AgentStatus, StepOutcome, Subject};
use argus_providers::{ProviderError, RetryPolicy};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Output marker written to a step settled from a fresh cache entry.
pub const FROM_CACHE: &str = "[FROM CACHE]";

/// Runs one agent invocation at a time for one specific run.
///
/// Cheap to clone; the gathering stage clones one per concurrent branch.
pub struct AgentRunner {
    state: WorkflowState,
    cache: AgentCache,
    retry: RetryPolicy,
    call_timeout: Duration,
    run: RunId,
    subject: Subject,
}

impl AgentRunner {
    pub fn new(
        state: WorkflowState,
        cache: AgentCache,
        retry: RetryPolicy,
        call_timeout: Duration,
        run: RunId,
        subject: Subject,
    ) -> Self {
        Self {
            state,
            cache,
            retry,
            call_timeout,
            run,
            subject,
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn cache(&self) -> &AgentCache {
        &self.cache
    }

    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// Invoke one agent through the full wrapper.
    ///
    /// # Arguments
    ///
    /// * `kind` - Agent key the call is attributed to
    /// * `step_name` - Human-readable log entry name
    /// * `cacheable` - Whether a fresh cached value short-circuits the call
    ///   and a successful result is written back
    /// * `logged_input` - Input text recorded on the log entry
    /// * `call` - The provider invocation; re-invoked on retry
    ///
    /// # Returns
    ///
    /// The typed result, or `None` when the call failed or the run was
    /// superseded. The log entry and status map carry the details.
    pub async fn run<T, F, Fut>(
        &self,
        kind: AgentKind,
        step_name: &str,
        cacheable: bool,
        logged_input: Option<String>,
        mut call: F,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = argus_providers::Result<T>>,
    {
        if !kind.is_local() {
            self.state
                .set_status(self.run, kind, AgentStatus::loading())
                .await;
        }

        let Some(step_id) = self
            .state
            .begin_step(self.run, kind, step_name, logged_input)
            .await
        else {
            return None;
        };

        if cacheable {
            if let Some(typed) = self.settle_from_cache::<T>(kind, step_id).await {
                return Some(typed);
            }
        }

        let timeout = self.call_timeout;
        let outcome = self
            .retry
            .execute(step_name, || {
                let fut = call();
                async move {
                    match tokio::time::timeout(timeout, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Transient(format!(
                            "call timed out after {}s",
                            timeout.as_secs()
                        ))),
                    }
                }
            })
            .await;

        match outcome {
            Ok(result) => {
                let value = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);
                let settled = self
                    .state
                    .settle_step(
                        self.run,
                        step_id,
                        StepOutcome::complete(value.to_string())
                            .with_sources(extract_sources(&value))
                            .with_confidence(extract_confidence(&value)),
                    )
                    .await;
                if !settled {
                    // Superseded mid-call; drop the result on the floor
                    return None;
                }
                if cacheable {
                    self.cache.put(kind, &self.subject, value).await;
                }
                if !kind.is_local() {
                    self.state
                        .set_status(self.run, kind, AgentStatus::idle())
                        .await;
                }
                Some(result)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(agent = %kind, step_name, error = %e, "agent call failed");
                self.state
                    .settle_step(self.run, step_id, StepOutcome::error(message.clone()))
                    .await;
                if !kind.is_local() {
                    self.state
                        .set_status(self.run, kind, AgentStatus::failed(message))
                        .await;
                }
                None
            }
        }
    }

    /// Serve a fresh cache entry, settling the step with the cache marker.
    async fn settle_from_cache<T: DeserializeOwned>(
        &self,
        kind: AgentKind,
        step_id: u64,
    ) -> Option<T> {
        let value = match self.cache.get(kind, &self.subject).await {
            Some((value, true)) => value,
            Some((_, false)) | None => return None,
        };
        match serde_json::from_value::<T>(value.clone()) {
            Ok(typed) => {
                let outcome = StepOutcome::complete(FROM_CACHE)
                    .with_sources(extract_sources(&value))
                    .with_confidence(extract_confidence(&value));
                self.state.settle_step(self.run, step_id, outcome).await;
                if !kind.is_local() {
                    self.state
                        .set_status(self.run, kind, AgentStatus::idle())
                        .await;
                }
                Some(typed)
            }
            Err(e) => {
                debug!(agent = %kind, error = %e, "cached value unreadable, refetching");
                None
            }
        }
    }
}

impl Clone for AgentRunner {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            cache: self.cache.clone(),
            retry: self.retry.clone(),
            call_timeout: self.call_timeout,
            run: self.run,
            subject: self.subject.clone(),
        }
    }
}

fn extract_sources(value: &serde_json::Value) -> Vec<String> {
    value
        .get("sources")
        .and_then(serde_json::Value::as_array)
        .map(|sources| {
            sources
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_confidence(value: &serde_json::Value) -> Option<f64> {
    value.get("confidence").and_then(serde_json::Value::as_f64)
}
