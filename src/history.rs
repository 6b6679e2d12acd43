// Per-user search history: bounded, deduplicated, written through to the store

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::HomeStaySummary;
use crate::criteria::SearchCriteria;
use crate::persistence::{search_history_key, KeyValueStore, PersistenceError};

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub criteria: SearchCriteria,
    #[serde(default)]
    pub results: Vec<HomeStaySummary>,
}

/// Load state of the history list.
///
/// `Loading` lasts from an identity change until the persisted list for the
/// new user has been read; the session reports it while that read is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Uninitialized,
    Loading,
    Ready,
}

/// Most recent searches of the signed-in user, newest first.
///
/// The in-memory list is authoritative for the session. Every change is
/// written through to `searchHistory_{userId}`; storage failures are logged
/// and otherwise ignored.
pub struct SearchHistory {
    store: Arc<dyn KeyValueStore>,
    user_id: Option<String>,
    entries: Vec<HistoryEntry>,
    state: HistoryState,
    limit: usize,
    generation: u64,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            store,
            user_id: None,
            entries: Vec::new(),
            state: HistoryState::Uninitialized,
            limit: limit.max(1),
            generation: 0,
        }
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    // Bumped on every identity change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Switch to `user_id` and load its persisted history.
    ///
    /// Without a user the in-memory list is wiped and nothing is read.
    pub async fn load_for_user(&mut self, user_id: Option<&str>) -> Vec<HistoryEntry> {
        self.state = HistoryState::Loading;
        self.generation += 1;
        self.user_id = user_id.map(str::to_string);
        self.entries.clear();

        if let Some(user_id) = user_id {
            match self.read(user_id).await {
                Ok(entries) => {
                    self.entries = entries;
                    self.entries.truncate(self.limit);
                    info!(
                        "Loaded {} history entries for user {}",
                        self.entries.len(),
                        user_id
                    );
                }
                Err(e) => warn!("Could not load search history for {}: {}", user_id, e),
            }
        } else {
            debug!("No user signed in, search history reset");
        }

        self.state = HistoryState::Ready;
        self.entries.clone()
    }

    async fn read(&self, user_id: &str) -> Result<Vec<HistoryEntry>, PersistenceError> {
        match self.store.get(&search_history_key(user_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn add(&mut self, criteria: SearchCriteria, results: Vec<HomeStaySummary>) {
        let key = criteria.history_key();
        self.entries
            .retain(|entry| entry.criteria.history_key() != key);
        self.entries.insert(0, HistoryEntry { criteria, results });
        self.entries.truncate(self.limit);

        self.persist().await;
    }

    pub async fn clear(&mut self) {
        self.entries.clear();

        if let Some(user_id) = &self.user_id {
            if let Err(e) = self.store.remove(&search_history_key(user_id)).await {
                warn!("Could not remove search history for {}: {}", user_id, e);
            }
        }
    }

    async fn persist(&self) {
        let Some(user_id) = &self.user_id else {
            debug!("No user signed in, search history kept in memory only");
            return;
        };

        let result = match serde_json::to_string(&self.entries) {
            Ok(serialized) => {
                self.store
                    .set(&search_history_key(user_id), serialized)
                    .await
            }
            Err(e) => Err(PersistenceError::Serialization(e)),
        };
        if let Err(e) = result {
            warn!("Could not persist search history for {}: {}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::StayDates;
    use crate::persistence::MemoryStore;
    use chrono::{Duration, NaiveDate};

    fn criteria(location: &str, day: u32) -> SearchCriteria {
        let check_in = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let stay = StayDates::new(check_in, check_in + Duration::days(2)).unwrap();
        SearchCriteria::new(location, stay)
    }

    fn result(name: &str) -> Vec<HomeStaySummary> {
        vec![HomeStaySummary {
            name: name.to_string(),
            ..Default::default()
        }]
    }

    async fn loaded(store: Arc<MemoryStore>, user: &str) -> SearchHistory {
        let mut history = SearchHistory::new(store);
        history.load_for_user(Some(user)).await;
        history
    }

    #[tokio::test]
    async fn test_state_machine() {
        let store = Arc::new(MemoryStore::new());
        let mut history = SearchHistory::new(store);
        assert_eq!(history.state(), HistoryState::Uninitialized);

        history.load_for_user(Some("u1")).await;
        assert_eq!(history.state(), HistoryState::Ready);
        assert_eq!(history.user_id(), Some("u1"));
        assert_eq!(history.generation(), 1);

        history.load_for_user(None).await;
        assert_eq!(history.generation(), 2);
    }

    #[tokio::test]
    async fn test_cap_keeps_five_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store, "u1").await;

        for day in 1..=6 {
            history
                .add(criteria(&format!("City {}", day), day), result("r"))
                .await;
        }

        let locations: Vec<&str> = history
            .entries()
            .iter()
            .map(|e| e.criteria.location.as_str())
            .collect();
        assert_eq!(
            locations,
            vec!["City 6", "City 5", "City 4", "City 3", "City 2"]
        );
    }

    #[tokio::test]
    async fn test_readding_moves_entry_to_front() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store, "u1").await;

        for day in 1..=5 {
            history
                .add(criteria(&format!("City {}", day), day), result("old"))
                .await;
        }
        history.add(criteria("City 3", 3), result("new")).await;

        assert_eq!(history.len(), 5);
        assert_eq!(history.entries()[0].criteria.location, "City 3");
        assert_eq!(history.entries()[0].results[0].name, "new");
        assert_eq!(
            history
                .entries()
                .iter()
                .filter(|e| e.criteria.location == "City 3")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_dedup_ignores_price_and_rating() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store, "u1").await;

        let plain = criteria("Huế", 1);
        let mut filtered = plain.clone();
        filtered.price_from = Some(100.0);
        filtered.rating_stars = Some(4);

        history.add(plain, result("a")).await;
        history.add(filtered, result("b")).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].criteria.rating_stars, Some(4));
    }

    #[tokio::test]
    async fn test_history_is_persisted_per_user() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store.clone(), "alice").await;
        history.add(criteria("Sa Pa", 1), result("a")).await;

        assert!(store.contains_key("searchHistory_alice"));

        let entries = history.load_for_user(Some("bob")).await;
        assert!(entries.is_empty());

        let entries = history.load_for_user(Some("alice")).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].criteria.location, "Sa Pa");
    }

    #[tokio::test]
    async fn test_no_user_wipes_memory() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store.clone(), "alice").await;
        history.add(criteria("Sa Pa", 1), result("a")).await;

        let entries = history.load_for_user(None).await;
        assert!(entries.is_empty());
        assert!(history.is_empty());
        assert!(store.contains_key("searchHistory_alice"));
    }

    #[tokio::test]
    async fn test_clear_removes_persisted_entry() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store.clone(), "u1").await;
        history.add(criteria("Vũng Tàu", 1), result("a")).await;

        history.clear().await;
        assert!(history.is_empty());
        assert!(!store.contains_key("searchHistory_u1"));
    }

    #[tokio::test]
    async fn test_read_failure_is_empty_state() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("searchHistory_u1", "{broken".to_string())
            .await
            .unwrap();

        let mut history = SearchHistory::new(store.clone());
        assert!(history.load_for_user(Some("u1")).await.is_empty());
        assert_eq!(history.state(), HistoryState::Ready);

        store.fail_next_operations(1);
        assert!(history.load_for_user(Some("u1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_huge_limit_does_not_preallocate() {
        let store = Arc::new(MemoryStore::new());
        let mut history = SearchHistory::with_limit(store, 1 << 62);
        history.load_for_user(Some("u1")).await;
        history.add(criteria("Cần Thơ", 1), result("a")).await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_authoritative() {
        let store = Arc::new(MemoryStore::new());
        let mut history = loaded(store.clone(), "u1").await;

        store.fail_next_operations(1);
        history.add(criteria("Phú Quốc", 1), result("a")).await;

        assert_eq!(history.len(), 1);
        assert!(!store.contains_key("searchHistory_u1"));
    }
}
