// Search session: the single owner of the current criteria, history and cached lists

use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiError, Booking, HomeStaySummary, HomestayApi, HttpHomestayApi};
use crate::clock::{Clock, SystemClock};
use crate::composer;
use crate::config::SessionConfig;
use crate::criteria::{CriteriaPatch, SearchCriteria};
use crate::date_range::{DateRangeError, DateSelection};
use crate::filter_request::to_filter_request;
use crate::history::{HistoryEntry, HistoryState, SearchHistory};
use crate::persistence::{bookings_key, KeyValueStore};
use crate::result_cache::{CacheStatsReport, ResultCache};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid dates: {0}")]
    InvalidDates(#[from] DateRangeError),

    #[error("A search is already in progress")]
    Busy,

    #[error("No user is signed in")]
    NoUser,

    #[error("Fetch failed: {0}")]
    Fetch(#[from] ApiError),
}

/// Outcome of an async operation started on behalf of a screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Delivered(T),
    // The screen was unmounted while the operation was running
    Discarded,
}

impl<T> Delivery<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Delivery::Delivered(value) => Some(value),
            Delivery::Discarded => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Delivery::Discarded)
    }
}

/// Handle a screen holds while it is mounted. Clones share the mounted flag.
#[derive(Debug, Clone)]
pub struct ScreenHandle {
    name: Arc<str>,
    mounted: Arc<AtomicBool>,
}

impl ScreenHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    fn deliver<T>(&self, value: T) -> Delivery<T> {
        if self.is_mounted() {
            Delivery::Delivered(value)
        } else {
            debug!("Discarding result for unmounted screen {}", self.name);
            Delivery::Discarded
        }
    }
}

// Held for the duration of a search submission
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Session-scoped search state shared by the screens through an `Arc`.
///
/// Criteria edits are applied atomically. While a search submission is in
/// flight, further submissions, patches and history replays are rejected
/// with [`SessionError::Busy`].
pub struct SearchSessionManager {
    api: Arc<dyn HomestayApi>,
    criteria: Mutex<SearchCriteria>,
    history: tokio::sync::Mutex<SearchHistory>,
    history_state: RwLock<HistoryState>,
    bookings: ResultCache<Vec<Booking>>,
    user_id: RwLock<Option<String>>,
    in_flight: AtomicBool,
}

impl SearchSessionManager {
    pub fn new(
        config: &SessionConfig,
        api: Arc<dyn HomestayApi>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        today: NaiveDate,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            api,
            criteria: Mutex::new(SearchCriteria::starting_on(today)?),
            history: tokio::sync::Mutex::new(SearchHistory::with_limit(
                store.clone(),
                config.history_limit,
            )),
            history_state: RwLock::new(HistoryState::Uninitialized),
            bookings: ResultCache::new(store, clock, config.cache_ttl()),
            user_id: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        })
    }

    // Session backed by the HTTP API and the system clock
    pub fn connect(
        config: &SessionConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, SessionError> {
        let api = HttpHomestayApi::new(config.client.clone())?;
        let clock = Arc::new(SystemClock);
        let today = clock.now().date_naive();
        Self::new(config, Arc::new(api), store, clock, today)
    }

    pub fn mount_screen(&self, name: &str) -> ScreenHandle {
        ScreenHandle {
            name: Arc::from(name),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<InFlight<'_>, SessionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SessionError::Busy)?;
        Ok(InFlight {
            flag: &self.in_flight,
        })
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    pub fn current_criteria(&self) -> SearchCriteria {
        self.criteria.lock().clone()
    }

    pub fn apply_patch(&self, patch: &CriteriaPatch) -> Result<SearchCriteria, SessionError> {
        // Checked under the lock so a submission cannot start between check and write
        let mut criteria = self.criteria.lock();
        self.ensure_idle()?;
        let next = composer::apply_patch(&criteria, patch)?;
        *criteria = next.clone();
        Ok(next)
    }

    // Calendar state seeded from the current stay
    pub fn date_selection(&self) -> DateSelection {
        DateSelection::from_stay(&self.criteria.lock().stay)
    }

    pub fn commit_dates(&self, selection: &DateSelection) -> Result<SearchCriteria, SessionError> {
        let stay = selection.commit()?;
        self.apply_patch(&CriteriaPatch::new().stay(stay.check_in(), stay.check_out()))
    }

    pub async fn submit_search(
        &self,
        screen: &ScreenHandle,
    ) -> Result<Delivery<Vec<HomeStaySummary>>, SessionError> {
        let _in_flight = self.begin()?;
        let generation = self.history.lock().await.generation();
        let criteria = self.current_criteria();
        let request = to_filter_request(&criteria);
        info!(
            "Searching {:?} for {} ({} adults, {} children)",
            criteria.location,
            criteria.stay.label(),
            criteria.adults,
            criteria.children
        );

        let results = self.api.filter_home_stays(&request).await?;
        info!("Search returned {} homestays", results.len());

        let mut history = self.history.lock().await;
        if history.generation() == generation {
            history.add(criteria, results.clone()).await;
        } else {
            info!("User changed during search, result not added to history");
        }
        drop(history);
        Ok(screen.deliver(results))
    }

    /// Make a past search current again and return it with its stored results.
    pub async fn replay_history(&self, index: usize) -> Result<Option<HistoryEntry>, SessionError> {
        self.ensure_idle()?;
        let entry = self.history.lock().await.get(index).cloned();
        if let Some(entry) = &entry {
            let mut criteria = self.criteria.lock();
            self.ensure_idle()?;
            *criteria = entry.criteria.clone();
        }
        Ok(entry)
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.entries().to_vec()
    }

    pub fn history_state(&self) -> HistoryState {
        *self.history_state.read()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear().await;
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    /// React to a sign-in, sign-out or account switch.
    pub async fn set_user(&self, user_id: Option<String>) -> Vec<HistoryEntry> {
        *self.user_id.write() = user_id.clone();
        *self.history_state.write() = HistoryState::Loading;

        let mut history = self.history.lock().await;
        let entries = history.load_for_user(user_id.as_deref()).await;
        *self.history_state.write() = history.state();
        entries
    }

    pub async fn bookings(
        &self,
        screen: &ScreenHandle,
        force_refresh: bool,
    ) -> Result<Delivery<Vec<Booking>>, SessionError> {
        let user_id = self.user_id().ok_or(SessionError::NoUser)?;
        let bookings = self
            .bookings
            .fetch_with_cache(&bookings_key(&user_id), force_refresh, || {
                self.api.get_bookings_by_account_id(&user_id)
            })
            .await?;
        Ok(screen.deliver(bookings))
    }

    pub fn bookings_cache_stats(&self) -> CacheStatsReport {
        self.bookings.stats()
    }
}
