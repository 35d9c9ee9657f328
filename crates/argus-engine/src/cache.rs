//! TTL cache for agent results
//!
//! Entries never evict in the background; staleness is decided at read time
//! from the entry timestamp, the injected clock, and the configured TTL.
//! Reads happen before an agent call, writes only after a success. Every
//! write goes through to the persistent store so a later process can hydrate.

use crate::gather::Dossier;
use crate::store::KeyValueStore;
use argus_core::{AgentKind, Subject};
use argus_utils::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// One cached value with its write instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Thread-safe TTL cache keyed by agent and subject.
pub struct AgentCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
}

fn agent_key(kind: AgentKind, subject: &Subject) -> String {
    format!("agent:{kind}:{subject}")
}

fn dossier_key(subject: &Subject) -> String {
    format!("dossier:{subject}")
}

fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

impl AgentCache {
    /// Create an empty cache; call [`AgentCache::hydrate`] to load the store.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: to_chrono(ttl),
            clock,
            store,
        }
    }

    /// Whether an entry written at `timestamp` is fresh at `now` under `ttl`.
    ///
    /// The only freshness rule in the system; everything else calls this.
    pub fn is_fresh_at(now: DateTime<Utc>, timestamp: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(timestamp) < ttl
    }

    fn is_fresh(&self, timestamp: DateTime<Utc>) -> bool {
        Self::is_fresh_at(self.clock.now(), timestamp, self.ttl)
    }

    /// Load persisted entries, keeping the newer side per key.
    ///
    /// Reconciliation is last-writer-wins by entry timestamp; nothing
    /// stronger is promised across processes.
    pub async fn hydrate(&self) {
        let persisted = self.store.entries().await;
        let mut entries = self.entries.write().await;
        let mut loaded = 0_usize;

        for (key, raw) in persisted {
            match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => {
                    let newer = entries
                        .get(&key)
                        .is_none_or(|existing| entry.timestamp > existing.timestamp);
                    if newer {
                        entries.insert(key, entry);
                        loaded += 1;
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable cache entry");
                }
            }
        }

        debug!(loaded, "cache hydrated from store");
    }

    /// Read an agent entry, with its freshness at the current instant.
    pub async fn get(&self, kind: AgentKind, subject: &Subject) -> Option<(serde_json::Value, bool)> {
        let entries = self.entries.read().await;
        entries.get(&agent_key(kind, subject)).map(|entry| {
            let fresh = self.is_fresh(entry.timestamp);
            debug!(agent = %kind, subject = %subject, fresh, "cache read");
            (entry.value.clone(), fresh)
        })
    }

    /// Write an agent entry and push it through to the store.
    pub async fn put(&self, kind: AgentKind, subject: &Subject, value: serde_json::Value) {
        let key = agent_key(kind, subject);
        let entry = CacheEntry {
            value,
            timestamp: self.clock.now(),
        };
        self.entries
            .write()
            .await
            .insert(key.clone(), entry.clone());
        self.write_through(&key, &entry).await;
    }

    /// Read the whole-result dossier for a subject, with freshness.
    pub async fn get_dossier(&self, subject: &Subject) -> Option<(Dossier, bool)> {
        let entries = self.entries.read().await;
        let entry = entries.get(&dossier_key(subject))?;
        match serde_json::from_value::<Dossier>(entry.value.clone()) {
            Ok(dossier) => Some((dossier, self.is_fresh(entry.timestamp))),
            Err(e) => {
                warn!(subject = %subject, error = %e, "cached dossier unreadable");
                None
            }
        }
    }

    /// Persist the merged dossier under its own key.
    pub async fn put_dossier(&self, subject: &Subject, dossier: &Dossier) {
        let value = match serde_json::to_value(dossier) {
            Ok(value) => value,
            Err(e) => {
                warn!(subject = %subject, error = %e, "dossier not cacheable");
                return;
            }
        };
        let key = dossier_key(subject);
        let entry = CacheEntry {
            value,
            timestamp: self.clock.now(),
        };
        self.entries
            .write()
            .await
            .insert(key.clone(), entry.clone());
        self.write_through(&key, &entry).await;
    }

    async fn write_through(&self, key: &str, entry: &CacheEntry) {
        match serde_json::to_string(entry) {
            Ok(raw) => {
                if let Err(e) = self.store.put(key, &raw).await {
                    warn!(key = %key, error = %e, "cache write-through failed");
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache entry not serializable");
            }
        }
    }
}

impl Clone for AgentCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
            store: Arc::clone(&self.store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use argus_core::AgentResult;
    use argus_core::result::EsgProfile;
    use argus_utils::ManualClock;
    use chrono::TimeZone;

    fn subject() -> Subject {
        Subject::new("AAPL").unwrap()
    }

    fn cache_with_clock(ttl_secs: u64) -> (AgentCache, ManualClock, Arc<MemoryStore>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let store = Arc::new(MemoryStore::new());
        let cache = AgentCache::new(
            Duration::from_secs(ttl_secs),
            Arc::new(clock.clone()),
            store.clone(),
        );
        (cache, clock, store)
    }

    #[test]
    fn freshness_is_pure_function_of_clock() {
        let ttl = chrono::Duration::seconds(900);
        let written = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let just_before = written + chrono::Duration::seconds(899);
        assert!(AgentCache::is_fresh_at(just_before, written, ttl));

        // Exactly at the TTL boundary the entry is stale
        let at_boundary = written + chrono::Duration::seconds(900);
        assert!(!AgentCache::is_fresh_at(at_boundary, written, ttl));

        let long_after = written + chrono::Duration::hours(2);
        assert!(!AgentCache::is_fresh_at(long_after, written, ttl));
    }

    #[tokio::test]
    async fn entry_goes_stale_but_stays_readable() {
        let (cache, clock, _store) = cache_with_clock(900);
        cache
            .put(AgentKind::Esg, &subject(), serde_json::json!({"overall": 71.0}))
            .await;

        let (value, fresh) = cache.get(AgentKind::Esg, &subject()).await.unwrap();
        assert!(fresh);
        assert_eq!(value["overall"], 71.0);

        clock.advance(chrono::Duration::seconds(901));

        // No eviction: the value is still there, just flagged stale
        let (value, fresh) = cache.get(AgentKind::Esg, &subject()).await.unwrap();
        assert!(!fresh);
        assert_eq!(value["overall"], 71.0);
    }

    #[tokio::test]
    async fn keys_separate_agents_and_subjects() {
        let (cache, _clock, _store) = cache_with_clock(900);
        cache
            .put(AgentKind::Esg, &subject(), serde_json::json!(1))
            .await;

        assert!(cache.get(AgentKind::Macro, &subject()).await.is_none());
        assert!(
            cache
                .get(AgentKind::Esg, &Subject::new("MSFT").unwrap())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn writes_reach_the_store_and_hydrate_back() {
        let (cache, clock, store) = cache_with_clock(900);
        cache
            .put(AgentKind::Esg, &subject(), serde_json::json!({"overall": 70.0}))
            .await;

        // A fresh cache over the same store sees the entry after hydration
        let rebuilt = AgentCache::new(
            Duration::from_secs(900),
            Arc::new(clock.clone()),
            store.clone(),
        );
        assert!(rebuilt.get(AgentKind::Esg, &subject()).await.is_none());

        rebuilt.hydrate().await;
        let (value, fresh) = rebuilt.get(AgentKind::Esg, &subject()).await.unwrap();
        assert!(fresh);
        assert_eq!(value["overall"], 70.0);
    }

    #[tokio::test]
    async fn hydrate_keeps_newer_in_memory_entry() {
        let (cache, clock, _store) = cache_with_clock(900);

        // Old value persisted, then a newer in-memory write
        cache
            .put(AgentKind::Esg, &subject(), serde_json::json!("old"))
            .await;
        clock.advance(chrono::Duration::seconds(10));
        cache
            .put(AgentKind::Esg, &subject(), serde_json::json!("new"))
            .await;

        cache.hydrate().await;
        let (value, _) = cache.get(AgentKind::Esg, &subject()).await.unwrap();
        assert_eq!(value, serde_json::json!("new"));
    }

    #[tokio::test]
    async fn dossier_roundtrip_with_freshness() {
        let (cache, clock, _store) = cache_with_clock(900);

        let mut dossier = Dossier::default();
        dossier.insert(AgentResult::Esg(EsgProfile {
            overall: Some(66.0),
            summary: "Solid governance".to_string(),
            ..Default::default()
        }));

        cache.put_dossier(&subject(), &dossier).await;

        let (cached, fresh) = cache.get_dossier(&subject()).await.unwrap();
        assert!(fresh);
        assert_eq!(cached.succeeded_agents(), vec![AgentKind::Esg]);

        clock.advance(chrono::Duration::seconds(1800));
        let (_, fresh) = cache.get_dossier(&subject()).await.unwrap();
        assert!(!fresh);
    }
}
