//! End-to-end orchestration: calendar → cache → panel.
//!
//! Deliberately single-threaded and sequential: the remote API enforces a
//! per-minute call budget, so parallel fetches would raise rate-limit
//! failures, not throughput. Days are resolved in strictly ascending order.

use crate::calendar::last_business_days;
use crate::data::{
    CacheStore, DataError, DayCache, DayKey, DayOutcome, DayRecord, DaySource, FetchProgress,
    GroupedProvider, QuotaPacer,
};
use crate::panel::{build_panel, Panel};
use crate::universe::Universe;
use chrono::NaiveDate;

/// Resolve each day through the cache, ascending, pacing network calls.
///
/// Per-day network faults have already degraded to empty record sets inside
/// the provider; only cache/configuration faults surface here.
pub fn fetch_days(
    store: &dyn CacheStore,
    provider: &dyn GroupedProvider,
    dates: &[NaiveDate],
    adjusted: bool,
    pacer: &mut QuotaPacer,
    progress: Option<&dyn FetchProgress>,
) -> Result<Vec<(NaiveDate, Vec<DayRecord>)>, DataError> {
    let cache = DayCache::new(store, provider);
    let total = dates.len();
    let mut out = Vec::with_capacity(total);
    let (mut downloaded, mut cached, mut empty) = (0, 0, 0);

    for (i, day) in dates.iter().enumerate() {
        let key = DayKey {
            day: *day,
            adjusted,
        };
        let fetched = cache.get_or_fetch(&key, pacer)?;

        let outcome = match (fetched.source, fetched.records.is_empty()) {
            (_, true) => {
                empty += 1;
                DayOutcome::Empty
            }
            (DaySource::Cache, false) => {
                cached += 1;
                DayOutcome::CacheHit(fetched.records.len())
            }
            (DaySource::Provider, false) => {
                downloaded += 1;
                DayOutcome::Downloaded(fetched.records.len())
            }
        };
        if let Some(p) = progress {
            p.on_day(*day, i, total, &outcome);
        }

        out.push((*day, fetched.records));
    }

    if let Some(p) = progress {
        p.on_batch_complete(downloaded, cached, empty);
    }
    Ok(out)
}

/// The last `days` business days of closes, assembled into the wide panel.
///
/// An all-empty window yields an empty panel, not an error.
pub fn fetch_close_panel(
    store: &dyn CacheStore,
    provider: &dyn GroupedProvider,
    universe: &Universe,
    days: usize,
    today: NaiveDate,
    adjusted: bool,
    pacer: &mut QuotaPacer,
    progress: Option<&dyn FetchProgress>,
) -> Result<Panel, DataError> {
    let dates = last_business_days(days, today);
    let day_records = fetch_days(store, provider, &dates, adjusted, pacer, progress)?;
    Ok(build_panel(&day_records, universe))
}
