//! Data acquisition and caching.

pub mod cache;
pub mod polygon;
pub mod provider;
pub mod store;

pub use cache::{DayCache, DaySource, FetchedDay, QuotaPacer};
pub use polygon::{PolygonProvider, RetryPolicy};
pub use provider::{
    DataError, DayKey, DayOutcome, DayRecord, FetchProgress, GroupedProvider, StdoutProgress,
};
pub use store::{CacheStore, FsStore, MemStore};
