/// City Page Lifecycle
///
/// Ties one open city page to its side effects: the counted visit, the
/// live-data fan-out and the periodic visit-tracking timer. Opening another
/// city or closing the page tears all of it down; the timer is cancelled
/// exactly once per visit.
use crate::error::{AppError, Result};
use crate::models::CityRecord;
use crate::services::aggregator::{Generation, LiveDataAggregator, LiveDataView};
use crate::services::behavior::BehavioralStore;
use crate::services::catalog::Catalog;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub city: CityRecord,
    pub generation: Generation,
    pub visit_count: u32,
    pub saved: bool,
    pub live: LiveDataView,
}

struct ActiveVisit {
    city_id: String,
    timer: JoinHandle<()>,
}

pub struct CityPage {
    catalog: Arc<Catalog>,
    store: Arc<BehavioralStore>,
    aggregator: LiveDataAggregator,
    visit_tick: Duration,
    active: Mutex<Option<ActiveVisit>>,
    timer_cancellations: AtomicU64,
}

impl CityPage {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<BehavioralStore>,
        aggregator: LiveDataAggregator,
        visit_tick: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            aggregator,
            visit_tick,
            active: Mutex::new(None),
            timer_cancellations: AtomicU64::new(0),
        }
    }

    pub fn aggregator(&self) -> &LiveDataAggregator {
        &self.aggregator
    }

    pub fn current_city(&self) -> Option<String> {
        self.active.lock().as_ref().map(|visit| visit.city_id.clone())
    }

    /// Number of visit-tracking timers cancelled so far.
    pub fn timer_cancellations(&self) -> u64 {
        self.timer_cancellations.load(Ordering::SeqCst)
    }

    /// Navigate to `city_id`. The previous page is left first, so an unknown
    /// id ends with no page open rather than a partial one.
    ///
    /// The whole teardown, start and install sequence runs under the `active`
    /// lock, so concurrent opens of one page never orphan a visit timer.
    pub fn open(&self, city_id: &str) -> Result<PageView> {
        let mut active = self.active.lock();
        self.teardown(&mut active);

        let city = self
            .catalog
            .lookup(city_id)
            .ok_or_else(|| AppError::NotFound(city_id.to_string()))?
            .clone();

        let visit_count = self.store.record_visit(&city.id);
        let generation = self.aggregator.start(&city);
        let timer = self.spawn_visit_timer(city.id.clone());

        *active = Some(ActiveVisit {
            city_id: city.id.clone(),
            timer,
        });
        let live = self.aggregator.snapshot();
        drop(active);

        info!(
            city_id = %city.id,
            visit_count,
            generation = generation.value(),
            "City page opened"
        );

        Ok(PageView {
            saved: self.store.is_saved(&city.id),
            live,
            city,
            generation,
            visit_count,
        })
    }

    /// Leave the open page. Returns false when no page was open.
    pub fn close(&self) -> bool {
        let mut active = self.active.lock();
        self.teardown(&mut active)
    }

    fn teardown(&self, active: &mut Option<ActiveVisit>) -> bool {
        let Some(visit) = active.take() else {
            return false;
        };

        visit.timer.abort();
        self.timer_cancellations.fetch_add(1, Ordering::SeqCst);
        self.aggregator.stop();

        debug!(city_id = %visit.city_id, "City page closed");
        true
    }

    pub fn live(&self) -> LiveDataView {
        self.aggregator.snapshot()
    }

    fn spawn_visit_timer(&self, city_id: String) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let tick = self.visit_tick;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.record_dwell(&city_id, tick);
            }
        })
    }
}

impl Drop for CityPage {
    fn drop(&mut self) {
        self.close();
    }
}
