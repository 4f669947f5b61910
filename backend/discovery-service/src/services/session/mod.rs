/// Session Registry
///
/// One behavioral store and one city page per session id. Sessions are
/// created lazily on first use and evicted once idle for longer than the
/// configured TTL.
use crate::config::{AggregatorConfig, BehaviorConfig};
use crate::error::{AppError, Result};
use crate::services::aggregator::{validate_sources, LiveDataAggregator, LiveSource};
use crate::services::behavior::BehavioralStore;
use crate::services::catalog::Catalog;
use crate::services::page::CityPage;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

const MAX_SESSION_ID_LEN: usize = 64;

pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub store: Arc<BehavioralStore>,
    pub page: CityPage,
    last_seen: Mutex<Instant>,
}

impl Session {
    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(*self.last_seen.lock())
    }
}

pub struct SessionRegistry {
    catalog: Arc<Catalog>,
    sources: Vec<Arc<dyn LiveSource>>,
    behavior: BehaviorConfig,
    aggregator: AggregatorConfig,
    sessions: DashMap<String, Arc<Session>>,
}

pub fn validate_session_id(id: &str) -> Result<()> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if well_formed {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid session id {:?}", id)))
    }
}

impl SessionRegistry {
    pub fn new(
        catalog: Arc<Catalog>,
        sources: Vec<Arc<dyn LiveSource>>,
        behavior: BehaviorConfig,
        aggregator: AggregatorConfig,
    ) -> Result<Self> {
        validate_sources(&sources)?;
        Ok(Self {
            catalog,
            sources,
            behavior,
            aggregator,
            sessions: DashMap::new(),
        })
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_or_create(&self, id: &str) -> Result<Arc<Session>> {
        validate_session_id(id)?;

        if let Some(session) = self.get(id) {
            session.touch();
            return Ok(session);
        }

        let store = Arc::new(BehavioralStore::new(self.behavior.clone()));
        let aggregator = LiveDataAggregator::new(self.sources.clone(), &self.aggregator)?;
        let page = CityPage::new(
            Arc::clone(&self.catalog),
            Arc::clone(&store),
            aggregator,
            self.behavior.visit_tick,
        );
        let candidate = Arc::new(Session {
            id: id.to_string(),
            created_at: Utc::now(),
            store,
            page,
            last_seen: Mutex::new(Instant::now()),
        });

        let session = Arc::clone(
            self.sessions
                .entry(id.to_string())
                .or_insert(candidate)
                .value(),
        );
        session.touch();

        info!(session_id = id, active_sessions = self.sessions.len(), "Session ready");
        Ok(session)
    }

    /// Close the session's page and forget it.
    pub fn remove(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                session.page.close();
                true
            }
            None => false,
        }
    }

    /// Remove every session idle for longer than the TTL. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        let ttl = self.behavior.session_idle_ttl;
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for() > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for id in idle {
            // Re-checked under the shard lock; a request may have touched it since.
            if let Some((_, session)) = self
                .sessions
                .remove_if(&id, |_, session| session.idle_for() > ttl)
            {
                session.page.close();
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(evicted, active_sessions = self.sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    /// Periodic [`evict_idle`](Self::evict_idle) on the configured interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = self.behavior.session_sweep_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle();
                debug!(evicted, "Session sweep finished");
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
