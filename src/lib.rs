// Search and filter state coordination for the homestay booking client

// Criteria model and the rules that keep it consistent
pub mod composer;
pub mod criteria;
pub mod date_range;
pub mod filter_request;

// Caches and their collaborators
pub mod api;
pub mod clock;
pub mod history;
pub mod persistence;
pub mod result_cache;

pub mod config;
pub mod session;

// Re-export key types for convenience
pub use api::{ApiError, Booking, ClientConfig, HomeStaySummary, HomestayApi, HttpHomestayApi};
pub use clock::{Clock, ManualClock, SystemClock};
pub use composer::apply_patch;
pub use config::{ConfigError, SessionConfig};
pub use criteria::{CriteriaPatch, GeoPoint, Patch, SearchCriteria, StayDates};
pub use date_range::{validate, DateRangeError, DateSelection};
pub use filter_request::{to_filter_request, FilterRequest};
pub use history::{HistoryEntry, HistoryState, SearchHistory};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, PersistenceError};
pub use result_cache::{CacheStatsReport, CachedList, ResultCache};
pub use session::{Delivery, ScreenHandle, SearchSessionManager, SessionError};
