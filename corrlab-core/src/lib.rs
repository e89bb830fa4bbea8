//! corrlab-core — daily close pipeline and correlation-mate ranking.
//!
//! The crate covers the whole path from the remote grouped-daily API down to
//! the ranked table:
//! - Business-day calendar (weekdays only, ending yesterday)
//! - Rate-limited grouped-daily provider with retry/backoff
//! - Write-once per-day Parquet cache behind a swappable key-value store
//! - Long-to-wide panel assembly with a NaN missing sentinel
//! - One-period log/simple returns
//! - Pairwise-complete correlation with overlap thresholds, top-K ranking,
//!   and optional beta

pub mod calendar;
pub mod config;
pub mod correlate;
pub mod data;
pub mod panel;
pub mod pipeline;
pub mod returns;
pub mod universe;

pub use calendar::last_business_days;
pub use config::FetchConfig;
pub use correlate::{rank_mates, CorrMethod, RankOutcome, RankParams, RankedMate, Warning};
pub use data::{
    CacheStore, DataError, DayCache, DayKey, DayRecord, FetchProgress, FsStore, GroupedProvider,
    MemStore, PolygonProvider, QuotaPacer, StdoutProgress,
};
pub use panel::Panel;
pub use pipeline::{fetch_close_panel, fetch_days};
pub use returns::{panel_returns, ReturnKind};
pub use universe::Universe;
