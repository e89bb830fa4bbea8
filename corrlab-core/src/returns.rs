//! One-period returns over the price panel.
//!
//! Pure transformation: same panel shape, one fewer leading row. Per-ticker
//! missingness is preserved so downstream pairwise statistics see exactly
//! which dates each pair shares.

use crate::panel::Panel;

/// Return definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// `ln(p_t) - ln(p_{t-1})`
    Log,
    /// `p_t / p_{t-1} - 1`
    Simple,
}

fn one_period(prev: f64, cur: f64, kind: ReturnKind) -> f64 {
    if !prev.is_finite() || !cur.is_finite() || prev <= 0.0 {
        return f64::NAN;
    }
    match kind {
        ReturnKind::Log => {
            if cur <= 0.0 {
                f64::NAN
            } else {
                (cur / prev).ln()
            }
        }
        ReturnKind::Simple => cur / prev - 1.0,
    }
}

/// Compute the return panel.
///
/// The first row (undefined from differencing) is dropped, as is any row
/// that is missing across every column. Partially missing rows are kept.
pub fn panel_returns(prices: &Panel, kind: ReturnKind) -> Panel {
    let n_rows = prices.dates().len();
    if n_rows < 2 || prices.is_empty() {
        return Panel::empty();
    }
    let n_cols = prices.tickers().len();

    // Differenced rows 1..n_rows
    let mut cols: Vec<Vec<f64>> = Vec::with_capacity(n_cols);
    for c in 0..n_cols {
        let prices_col = prices.col(c);
        let col: Vec<f64> = (1..n_rows)
            .map(|r| one_period(prices_col[r - 1], prices_col[r], kind))
            .collect();
        cols.push(col);
    }
    let dates: Vec<_> = prices.dates()[1..].to_vec();

    // Drop rows that are NaN in every column
    let keep: Vec<usize> = (0..dates.len())
        .filter(|&r| cols.iter().any(|col| col[r].is_finite()))
        .collect();

    let kept_dates: Vec<_> = keep.iter().map(|&r| dates[r]).collect();
    let kept_cols: Vec<Vec<f64>> = cols
        .iter()
        .map(|col| keep.iter().map(|&r| col[r]).collect())
        .collect();

    Panel::from_parts(kept_dates, prices.tickers().to_vec(), kept_cols)
}
