//! Deterministic scripted provider
//!
//! Serves canned results per agent key, in order. Engine tests script exact
//! failure sequences with it, and the runnable example uses it in place of
//! live data and model providers.

use crate::error::{ProviderError, Result};
use crate::provider::{IntelligenceProvider, ProviderRequest};
use argus_core::{AgentKind, AgentResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Provider that replays a prepared script.
///
/// Each agent key holds a queue of outcomes consumed one per call, plus an
/// optional repeating fallback served once the queue is empty. Calls for a
/// key with neither fail with [`ProviderError::Unsupported`]. Every request
/// received is recorded so tests can assert on briefing and refinement text.
pub struct ScriptedProvider {
    name: String,
    scripts: Mutex<HashMap<AgentKind, VecDeque<Result<AgentResult>>>>,
    fallbacks: HashMap<AgentKind, AgentResult>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            scripts: Mutex::new(HashMap::new()),
            fallbacks: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue a successful outcome for `kind`.
    pub fn with_result(mut self, kind: AgentKind, result: AgentResult) -> Self {
        self.scripts
            .get_mut()
            .entry(kind)
            .or_default()
            .push_back(Ok(result));
        self
    }

    /// Queue a failure for `kind`.
    pub fn with_failure(mut self, kind: AgentKind, error: ProviderError) -> Self {
        self.scripts
            .get_mut()
            .entry(kind)
            .or_default()
            .push_back(Err(error));
        self
    }

    /// Serve `result` for every call to `kind` once its queue is empty.
    pub fn with_repeating(mut self, kind: AgentKind, result: AgentResult) -> Self {
        self.fallbacks.insert(kind, result);
        self
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests received for one agent key, in call order.
    pub async fn requests_for(&self, kind: AgentKind) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.agent == kind)
            .cloned()
            .collect()
    }

    /// How many times `kind` has been called.
    pub async fn call_count(&self, kind: AgentKind) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.agent == kind)
            .count()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelligenceProvider for ScriptedProvider {
    async fn gather(&self, request: ProviderRequest) -> Result<AgentResult> {
        let agent = request.agent;
        self.requests.lock().await.push(request);

        let queued = self
            .scripts
            .lock()
            .await
            .get_mut(&agent)
            .and_then(VecDeque::pop_front);

        match queued {
            Some(outcome) => outcome,
            None => match self.fallbacks.get(&agent) {
                Some(result) => Ok(result.clone()),
                None => Err(ProviderError::Unsupported(format!(
                    "no script for agent {agent}"
                ))),
            },
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
