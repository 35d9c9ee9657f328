//! Orchestration engine for the argus analysis workflow
//!
//! This crate drives a full multi-agent equity analysis from one entry point.
//! It includes:
//!
//! - A phase machine covering the whole run (planning, gathering, metric
//!   calculation, verification, and the synthesis loop)
//! - Concurrent gathering across mandatory live lookups and optional
//!   specialist agents, merged into a [`Dossier`] that tolerates partial
//!   failure
//! - Deterministic metric derivation with recorded formulas and inputs
//! - A draft / challenge / critique / finalize synthesis loop
//! - Per-agent result caching with TTL freshness and write-through
//!   persistence
//! - A run-id guard so a restarted analysis can never be touched by the run
//!   it superseded
//!
//! # Architecture
//!
//! [`AnalysisEngine`] owns the pieces and is the only component that moves
//! the phase machine:
//! - [`WorkflowState`]: run-scoped state behind a run-id guard (phase
//!   history, execution log, statuses, results)
//! - [`AgentRunner`]: wraps every provider call with logging, cache lookup,
//!   timeout, and retry, settling exactly one log entry per call
//! - [`gather()`]: fans out over the scheduled gathering agents concurrently
//!   and merges whatever comes back
//! - [`calculate_all_metrics`] / [`cross_check`]: pure valuation arithmetic
//!   over the merged dossier
//! - [`synthesis`]: the debate stages, each seeded with a briefing built
//!   from earlier results
//!
//! Live market data and model-backed agents sit behind the
//! `IntelligenceProvider` trait from `argus-providers`; the engine never
//! talks to the outside world directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_core::{AgentSelection, Subject};
//! use argus_engine::{AnalysisEngine, EngineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = AnalysisEngine::builder()
//!         .provider(Arc::new(/* your provider */))
//!         .config(EngineConfig::default())
//!         .build()
//!         .await?;
//!
//!     engine
//!         .start(Subject::new("AAPL")?, AgentSelection::standard())
//!         .await;
//!
//!     let snapshot = engine.snapshot().await;
//!     println!("{:?}", snapshot.report);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod gather;
pub mod metrics;
pub mod runner;
pub mod state;
pub mod store;
pub mod synthesis;

// Re-export main types for convenience
pub use cache::AgentCache;
pub use config::EngineConfig;
pub use driver::{AnalysisEngine, AnalysisEngineBuilder};
pub use error::{EngineError, Result};
pub use gather::{Dossier, gather};
pub use metrics::{CalculatedMetric, calculate_all_metrics, cross_check};
pub use runner::AgentRunner;
pub use state::{RunId, WorkflowSnapshot, WorkflowState};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
