// ============================================
// Live-Data Aggregator
// ============================================
//
// Per city page visit:
// 1. start()   - new generation, fresh bundle, one task per source
// 2. complete  - matching generation: write field (once) or mark failed
// 3. stale     - non-matching generation: drop the result
// 4. stop()    - supersede the generation, abort pending tasks
//
// Sources own disjoint fields, so the only race is a stale write; the
// generation check under the state lock rules it out.

mod bundle;
mod http_source;
mod source;

pub use bundle::{
    CountryFacts, EncyclopediaSummary, FieldStatus, ForecastEntry, LiveDataBundle, LiveDataView,
    LiveField, PhotoRef, PlacePhotos, PointOfInterest, SourceFetchState, SourcePayload,
    WeatherSnapshot,
};
pub use http_source::{sources_from_config, HttpJsonSource};
pub use source::{CityQuery, LiveSource, SourceError};

use crate::config::AggregatorConfig;
use crate::error::{AppError, Result};
use crate::models::CityRecord;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Token identifying one city page visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// How a completed fetch was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    Failed,
    Stale,
    Duplicate,
}

#[derive(Debug, Default)]
struct AggregatorState {
    generation: u64,
    city_id: Option<String>,
    bundle: LiveDataBundle,
    states: BTreeMap<LiveField, SourceFetchState>,
}

impl AggregatorState {
    fn view(&self) -> LiveDataView {
        LiveDataView {
            city_id: self.city_id.clone(),
            generation: self.generation,
            bundle: self.bundle.clone(),
            states: self.states.clone(),
        }
    }
}

struct Shared {
    state: Mutex<AggregatorState>,
    updates: watch::Sender<LiveDataView>,
}

impl Shared {
    fn complete(
        &self,
        generation: Generation,
        field: LiveField,
        source: &str,
        outcome: std::result::Result<SourcePayload, SourceError>,
    ) -> MergeOutcome {
        let mut state = self.state.lock();

        if state.generation != generation.value() {
            debug!(
                source,
                field = field.as_str(),
                generation = generation.value(),
                active = state.generation,
                "Discarding stale live data"
            );
            return MergeOutcome::Stale;
        }

        let outcome = outcome.and_then(|payload| {
            if payload.field() == field {
                Ok(payload)
            } else {
                Err(SourceError::FieldMismatch {
                    expected: field,
                    actual: payload.field(),
                })
            }
        });

        let merged = match outcome {
            Ok(payload) => {
                if state.bundle.apply(payload) {
                    state.states.insert(field, SourceFetchState::Resolved);
                    MergeOutcome::Applied
                } else {
                    MergeOutcome::Duplicate
                }
            }
            Err(err) => {
                warn!(
                    source,
                    field = field.as_str(),
                    city_id = state.city_id.as_deref().unwrap_or_default(),
                    error = %err,
                    "Live source failed; field left empty"
                );
                if state.bundle.has(field) {
                    MergeOutcome::Duplicate
                } else {
                    state.states.insert(field, SourceFetchState::Failed);
                    MergeOutcome::Failed
                }
            }
        };

        if merged != MergeOutcome::Duplicate {
            self.updates.send_replace(state.view());
        }
        merged
    }
}

/// Fans a city page out to every registered [`LiveSource`] and merges the
/// results into one [`LiveDataBundle`].
///
/// `start` spawns Tokio tasks and must be called from within a runtime.
pub struct LiveDataAggregator {
    sources: Vec<Arc<dyn LiveSource>>,
    source_timeout: Duration,
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Rejects two sources claiming the same field.
pub fn validate_sources(sources: &[Arc<dyn LiveSource>]) -> Result<()> {
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.field()) {
            return Err(AppError::Validation(format!(
                "more than one source registered for {}",
                source.field().as_str()
            )));
        }
    }
    Ok(())
}

impl LiveDataAggregator {
    pub fn new(sources: Vec<Arc<dyn LiveSource>>, config: &AggregatorConfig) -> Result<Self> {
        validate_sources(&sources)?;

        let (updates, _) = watch::channel(LiveDataView::default());
        Ok(Self {
            sources,
            source_timeout: config.source_timeout,
            shared: Arc::new(Shared {
                state: Mutex::new(AggregatorState::default()),
                updates,
            }),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn fields(&self) -> Vec<LiveField> {
        self.sources.iter().map(|s| s.field()).collect()
    }

    pub fn active_generation(&self) -> Generation {
        Generation(self.shared.state.lock().generation)
    }

    /// Current view; never blocks on in-flight fetches.
    pub fn snapshot(&self) -> LiveDataView {
        self.shared.state.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveDataView> {
        self.shared.updates.subscribe()
    }

    /// Begin a visit for `city`, superseding whatever was in flight.
    pub fn start(&self, city: &CityRecord) -> Generation {
        self.abort_pending();

        let generation = {
            let mut state = self.shared.state.lock();
            let generation = Generation(state.generation).next();
            state.generation = generation.value();
            state.city_id = Some(city.id.clone());
            state.bundle = LiveDataBundle::new(city.id.clone());
            state.states = self
                .sources
                .iter()
                .map(|source| (source.field(), SourceFetchState::Pending))
                .collect();
            self.shared.updates.send_replace(state.view());
            generation
        };

        info!(
            city_id = %city.id,
            generation = generation.value(),
            sources = self.sources.len(),
            "Live data fan-out started"
        );

        let query = CityQuery::from(city);
        let mut handles = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let source = Arc::clone(source);
            let shared = Arc::clone(&self.shared);
            let query = query.clone();
            let timeout = self.source_timeout;

            handles.push(tokio::spawn(async move {
                let outcome = match tokio::time::timeout(timeout, source.fetch(&query)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout(timeout)),
                };
                shared.complete(generation, source.field(), source.name(), outcome);
            }));
        }
        *self.tasks.lock() = handles;

        generation
    }

    /// Leave the current page. Returns false when nothing was active.
    pub fn stop(&self) -> bool {
        let was_active = {
            let mut state = self.shared.state.lock();
            let was_active = state.city_id.is_some();
            state.generation += 1;
            state.city_id = None;
            state.bundle = LiveDataBundle::default();
            state.states.clear();
            self.shared.updates.send_replace(state.view());
            was_active
        };

        let aborted = self.abort_pending();
        if was_active {
            debug!(aborted, "Live data aggregation stopped");
        }
        was_active
    }

    fn abort_pending(&self) -> usize {
        let handles = std::mem::take(&mut *self.tasks.lock());
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }
}

impl Drop for LiveDataAggregator {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
