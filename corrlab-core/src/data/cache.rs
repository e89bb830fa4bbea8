//! Write-once day cache over a [`CacheStore`].
//!
//! `get_or_fetch` is the single entry point: a cached artifact is returned
//! unchanged (no network call, no quota increment); on a miss the provider is
//! invoked and a non-empty result is persisted exactly once. Empty results
//! are never persisted — the day stays a miss and is retried on future runs,
//! an explicit, accepted limitation.

use super::provider::{DataError, DayKey, DayRecord, GroupedProvider};
use super::store::CacheStore;
use polars::prelude::*;
use std::io::Cursor;
use std::time::Duration;

/// Where a day's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySource {
    Cache,
    Provider,
}

/// One day resolved through the cache.
#[derive(Debug)]
pub struct FetchedDay {
    pub records: Vec<DayRecord>,
    pub source: DaySource,
}

/// Paces network calls against a fixed per-minute quota.
///
/// Owned by the orchestrating loop, not the provider: cache hits must not
/// advance the counter. After every `calls_per_pause`-th call, the next call
/// waits out `pause` first.
#[derive(Debug)]
pub struct QuotaPacer {
    calls_made: u64,
    calls_per_pause: u64,
    pause: Duration,
}

impl Default for QuotaPacer {
    /// Free-plan pacing: 5 calls, then a 60 second pause.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

impl QuotaPacer {
    pub fn new(calls_per_pause: u64, pause: Duration) -> Self {
        Self {
            calls_made: 0,
            calls_per_pause,
            pause,
        }
    }

    /// Record an imminent network call, sleeping first when the quota
    /// boundary is reached.
    pub fn before_call(&mut self) {
        if self.calls_made > 0 && self.calls_made % self.calls_per_pause == 0 {
            println!(
                "[rate-limit] {} calls so far, pausing {}s...",
                self.calls_made,
                self.pause.as_secs()
            );
            std::thread::sleep(self.pause);
        }
        self.calls_made += 1;
    }

    pub fn calls_made(&self) -> u64 {
        self.calls_made
    }
}

/// The write-once cache: store + provider.
pub struct DayCache<'a> {
    store: &'a dyn CacheStore,
    provider: &'a dyn GroupedProvider,
}

impl<'a> DayCache<'a> {
    pub fn new(store: &'a dyn CacheStore, provider: &'a dyn GroupedProvider) -> Self {
        Self { store, provider }
    }

    /// Resolve one day: cache hit, or fetch-and-persist.
    ///
    /// A corrupt cached artifact is warned about and treated as a miss; a
    /// successful refetch then overwrites it.
    pub fn get_or_fetch(
        &self,
        key: &DayKey,
        pacer: &mut QuotaPacer,
    ) -> Result<FetchedDay, DataError> {
        if let Some(bytes) = self.store.get(key)? {
            match decode_records(&bytes) {
                Ok(records) => {
                    return Ok(FetchedDay {
                        records,
                        source: DaySource::Cache,
                    })
                }
                Err(e) => {
                    eprintln!(
                        "WARNING: ignoring corrupt cache artifact {}: {e}",
                        key.file_stem()
                    );
                }
            }
        }

        pacer.before_call();
        let records = self.provider.fetch_day(key.day, key.adjusted);
        if !records.is_empty() {
            let bytes = encode_records(&records)?;
            self.store.put(key, &bytes)?;
        }

        Ok(FetchedDay {
            records,
            source: DaySource::Provider,
        })
    }
}

// ── Parquet codec ───────────────────────────────────────────────────

fn records_to_dataframe(records: &[DayRecord]) -> Result<DataFrame, DataError> {
    let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
    let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
    let volumes: Vec<Option<f64>> = records.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new("ticker".into(), tickers),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn dataframe_to_records(df: &DataFrame) -> Result<Vec<DayRecord>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let ticker_ca = df
        .column("ticker")
        .map_err(map_err)?
        .str()
        .map_err(|e| DataError::ParquetError(format!("ticker column type: {e}")))?;
    let close_ca = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;
    let volume_ca = df
        .column("volume")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("volume column type: {e}")))?;

    let n = df.height();
    let mut records = Vec::with_capacity(n);
    for i in 0..n {
        let ticker = ticker_ca
            .get(i)
            .ok_or_else(|| DataError::ValidationError(format!("null ticker at row {i}")))?;
        let close = close_ca
            .get(i)
            .ok_or_else(|| DataError::ValidationError(format!("null close at row {i}")))?;
        records.push(DayRecord {
            ticker: ticker.to_string(),
            close,
            volume: volume_ca.get(i),
        });
    }
    Ok(records)
}

/// Serialize records to Parquet bytes (columns: ticker, close, volume).
pub fn encode_records(records: &[DayRecord]) -> Result<Vec<u8>, DataError> {
    let df = records_to_dataframe(records)?;
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(buf)
}

/// Deserialize a cached Parquet artifact back into records.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<DayRecord>, DataError> {
    let df = ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read parquet: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet artifact".into()));
    }

    dataframe_to_records(&df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::store::MemStore;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn key(s: &str) -> DayKey {
        DayKey {
            day: day(s),
            adjusted: true,
        }
    }

    fn rec(ticker: &str, close: f64) -> DayRecord {
        DayRecord {
            ticker: ticker.into(),
            close,
            volume: None,
        }
    }

    /// Scripted provider that counts its network calls.
    struct ScriptedProvider {
        days: HashMap<NaiveDate, Vec<DayRecord>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(days: HashMap<NaiveDate, Vec<DayRecord>>) -> Self {
            Self {
                days,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GroupedProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_day(&self, day: NaiveDate, _adjusted: bool) -> Vec<DayRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.days.get(&day).cloned().unwrap_or_default()
        }
    }

    fn zero_pacer() -> QuotaPacer {
        QuotaPacer::new(5, Duration::ZERO)
    }

    #[test]
    fn parquet_codec_roundtrip() {
        let records = vec![
            DayRecord {
                ticker: "AAPL".into(),
                close: 189.95,
                volume: Some(52_164_500.0),
            },
            rec("MSFT", 423.85),
        ];
        let bytes = encode_records(&records).unwrap();
        assert_eq!(decode_records(&bytes).unwrap(), records);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_records(b"not parquet at all").is_err());
    }

    #[test]
    fn second_call_is_a_cache_hit() {
        let store = MemStore::new();
        let provider = ScriptedProvider::new(HashMap::from([(
            day("2024-06-07"),
            vec![rec("AAPL", 189.95)],
        )]));
        let cache = DayCache::new(&store, &provider);
        let mut pacer = zero_pacer();

        let first = cache.get_or_fetch(&key("2024-06-07"), &mut pacer).unwrap();
        assert_eq!(first.source, DaySource::Provider);

        let second = cache.get_or_fetch(&key("2024-06-07"), &mut pacer).unwrap();
        assert_eq!(second.source, DaySource::Cache);
        assert_eq!(second.records, first.records);

        // At most one network call total for the same key
        assert_eq!(provider.calls(), 1);
        assert_eq!(pacer.calls_made(), 1);
    }

    #[test]
    fn empty_day_is_not_persisted_and_refetched() {
        let store = MemStore::new();
        let provider = ScriptedProvider::new(HashMap::new());
        let cache = DayCache::new(&store, &provider);
        let mut pacer = zero_pacer();

        let first = cache.get_or_fetch(&key("2024-06-07"), &mut pacer).unwrap();
        assert!(first.records.is_empty());
        assert!(store.is_empty());

        // Still a miss on the next run
        cache.get_or_fetch(&key("2024-06-07"), &mut pacer).unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn corrupt_artifact_falls_back_to_fetch() {
        let store = MemStore::new();
        let k = key("2024-06-07");
        store.put(&k, b"garbage").unwrap();

        let provider = ScriptedProvider::new(HashMap::from([(
            day("2024-06-07"),
            vec![rec("AAPL", 189.95)],
        )]));
        let cache = DayCache::new(&store, &provider);
        let mut pacer = zero_pacer();

        let fetched = cache.get_or_fetch(&k, &mut pacer).unwrap();
        assert_eq!(fetched.source, DaySource::Provider);
        assert_eq!(fetched.records.len(), 1);

        // The good artifact replaced the corrupt one
        let again = cache.get_or_fetch(&k, &mut pacer).unwrap();
        assert_eq!(again.source, DaySource::Cache);
    }

    #[test]
    fn pacer_counts_only_network_calls() {
        let mut pacer = QuotaPacer::new(5, Duration::ZERO);
        for _ in 0..7 {
            pacer.before_call();
        }
        assert_eq!(pacer.calls_made(), 7);
    }
}
