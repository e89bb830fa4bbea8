//! Provider contract and structured error types.
//!
//! `GroupedProvider` abstracts over the grouped-daily data source so the
//! cache layer can be exercised against a mock in tests. Providers own the
//! retry policy; by contract they never fail past this boundary — a day that
//! cannot be fetched degrades to an empty record set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ticker's daily aggregate on one day, as returned by the provider.
///
/// Immutable once written to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub ticker: String,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Cache key: one persisted artifact per (day, adjustment flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey {
    pub day: NaiveDate,
    pub adjusted: bool,
}

impl DayKey {
    /// File stem for the persisted artifact, e.g. `2024-06-07_adj1`.
    pub fn file_stem(&self) -> String {
        let tag = if self.adjusted { "adj1" } else { "adj0" };
        format!("{}_{tag}", self.day)
    }

    /// Inverse of [`file_stem`](Self::file_stem).
    pub fn parse_stem(stem: &str) -> Option<Self> {
        let (date_part, tag) = stem.rsplit_once('_')?;
        let adjusted = match tag {
            "adj1" => true,
            "adj0" => false,
            _ => return None,
        };
        let day = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
        Some(Self { day, adjusted })
    }
}

/// Structured error types for the data layer.
///
/// Only `MissingApiKey` is fatal to a run. Network and rate-limit faults are
/// absorbed inside the provider and never surface here.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("POLYGON_API_KEY is not set")]
    MissingApiKey,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet error: {0}")]
    ParquetError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Grouped-daily data source: all tickers' closes for one calendar day.
///
/// The cache layer sits above this trait — providers don't know about the
/// cache. Implementations absorb network faults: exhausting retries returns
/// an empty vec, never an error.
pub trait GroupedProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch every ticker's close for `day`. Empty means "no data for this
    /// day" (holiday, weekend, no entitlement, or retries exhausted).
    fn fetch_day(&self, day: NaiveDate, adjusted: bool) -> Vec<DayRecord>;
}

/// How a single day in a batch was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    /// Served from the cache with this many records.
    CacheHit(usize),
    /// Fetched from the provider and persisted, with this many records.
    Downloaded(usize),
    /// The provider returned no data; nothing was persisted.
    Empty,
}

/// Progress callback for multi-day operations.
pub trait FetchProgress {
    /// Called after each day in the batch is resolved.
    fn on_day(&self, day: NaiveDate, index: usize, total: usize, outcome: &DayOutcome);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, downloaded: usize, cached: usize, empty: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_day(&self, day: NaiveDate, index: usize, total: usize, outcome: &DayOutcome) {
        match outcome {
            DayOutcome::CacheHit(n) => println!("[{}/{}] {day}: cached ({n} records)", index + 1, total),
            DayOutcome::Downloaded(n) => {
                println!("[{}/{}] {day}: downloaded ({n} records)", index + 1, total)
            }
            DayOutcome::Empty => println!("[{}/{}] {day}: no data", index + 1, total),
        }
    }

    fn on_batch_complete(&self, downloaded: usize, cached: usize, empty: usize) {
        println!("\nFetch complete: {downloaded} downloaded, {cached} cached, {empty} empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_stem_roundtrip() {
        let key = DayKey {
            day: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
            adjusted: true,
        };
        assert_eq!(key.file_stem(), "2024-06-07_adj1");
        assert_eq!(DayKey::parse_stem(&key.file_stem()), Some(key));

        let unadj = DayKey {
            adjusted: false,
            ..key
        };
        assert_eq!(DayKey::parse_stem(&unadj.file_stem()), Some(unadj));
    }

    #[test]
    fn parse_stem_rejects_garbage() {
        assert_eq!(DayKey::parse_stem("2024-06-07"), None);
        assert_eq!(DayKey::parse_stem("2024-06-07_adj2"), None);
        assert_eq!(DayKey::parse_stem("notadate_adj1"), None);
    }
}
