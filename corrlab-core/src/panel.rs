//! Dense date×ticker panel with a NaN missing sentinel.
//!
//! Long-format (date, ticker, close) triples are accumulated into a sparse
//! map, then materialized: rows are the union of dates from contributing
//! days sorted ascending, columns are tickers in lexicographic order, and
//! any (date, ticker) combination absent from the input becomes NaN. Columns
//! with fewer than [`MIN_OBSERVATIONS`] non-missing values are dropped.

use crate::data::DayRecord;
use crate::universe::Universe;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Minimum non-missing observations for a column to survive assembly.
pub const MIN_OBSERVATIONS: usize = 3;

/// Dense wide panel. Used for both prices and returns; missing cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    /// One column per ticker; `cols[c].len() == dates.len()`.
    cols: Vec<Vec<f64>>,
}

impl Panel {
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            tickers: Vec::new(),
            cols: Vec::new(),
        }
    }

    /// Construct from parts. Column lengths must match the date axis.
    pub fn from_parts(dates: Vec<NaiveDate>, tickers: Vec<String>, cols: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(tickers.len(), cols.len());
        debug_assert!(cols.iter().all(|c| c.len() == dates.len()));
        Self {
            dates,
            tickers,
            cols,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// True when there are no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    pub fn col_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Full column as a slice aligned with `dates()`.
    pub fn col(&self, c: usize) -> &[f64] {
        &self.cols[c]
    }

    /// Cell by (date, ticker); `None` when either coordinate is absent,
    /// NaN when the coordinate exists but the cell is missing.
    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let r = self.dates.iter().position(|d| *d == date)?;
        let c = self.col_index(ticker)?;
        Some(self.cols[c][r])
    }
}

/// Assemble the close panel from per-day record sets.
///
/// Records outside the universe are dropped before accumulation; days whose
/// records all fall outside the universe contribute no row.
pub fn build_panel(days: &[(NaiveDate, Vec<DayRecord>)], universe: &Universe) -> Panel {
    let mut cells: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
    for (day, records) in days {
        for record in records {
            if universe.contains(&record.ticker) {
                cells.insert((*day, record.ticker.clone()), record.close);
            }
        }
    }
    if cells.is_empty() {
        return Panel::empty();
    }

    let mut date_set = BTreeSet::new();
    let mut ticker_set = BTreeSet::new();
    for (date, ticker) in cells.keys() {
        date_set.insert(*date);
        ticker_set.insert(ticker.clone());
    }
    let dates: Vec<NaiveDate> = date_set.into_iter().collect();
    let all_tickers: Vec<String> = ticker_set.into_iter().collect();

    let row_of: BTreeMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut cols: Vec<Vec<f64>> = vec![vec![f64::NAN; dates.len()]; all_tickers.len()];
    let col_of: BTreeMap<&str, usize> = all_tickers
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    for ((date, ticker), close) in &cells {
        cols[col_of[ticker.as_str()]][row_of[date]] = *close;
    }

    // Drop sparse columns
    let mut kept_tickers = Vec::new();
    let mut kept_cols = Vec::new();
    for (ticker, col) in all_tickers.into_iter().zip(cols) {
        if col.iter().filter(|v| v.is_finite()).count() >= MIN_OBSERVATIONS {
            kept_tickers.push(ticker);
            kept_cols.push(col);
        }
    }

    Panel::from_parts(dates, kept_tickers, kept_cols)
}
