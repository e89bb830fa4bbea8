//! Pairwise correlation and top-K mate ranking.
//!
//! Every statistic is pairwise-complete: a pair is evaluated only on the
//! dates where both series are observed, and a pair whose overlap falls
//! below the configured minimum is undefined (not zero). Ranking keeps a
//! second, per-pair overlap recount for the surviving top-K — the
//! full-matrix pass and an isolated-pair recount are kept as two separate
//! checks and a mate failing the recount is discarded.

use crate::panel::Panel;
use std::cmp::Ordering;
use std::fmt;

/// Correlation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrMethod {
    Pearson,
    /// Pearson over average-rank-transformed joint samples.
    Spearman,
}

/// Parameters for a ranking query.
#[derive(Debug, Clone)]
pub struct RankParams {
    /// Base tickers to rank mates for.
    pub targets: Vec<String>,
    /// Candidate mates; defaults to every panel column.
    pub candidates: Option<Vec<String>>,
    pub method: CorrMethod,
    /// Minimum jointly observed dates for a pair to be defined.
    pub min_overlap: usize,
    pub top_k: usize,
    /// Also compute beta = cov(base, mate) / var(base).
    pub with_beta: bool,
}

impl RankParams {
    /// Defaults matching the scan CLI: pearson, overlap ≥ 30, top 10.
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            targets: targets
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_uppercase())
                .filter(|t| !t.is_empty())
                .collect(),
            candidates: None,
            method: CorrMethod::Pearson,
            min_overlap: 30,
            top_k: 10,
            with_beta: false,
        }
    }
}

/// One ranked row of the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMate {
    pub base: String,
    pub mate: String,
    pub corr: f64,
    pub overlap: usize,
    /// Position in the sorted top-K before the overlap recount; discarded
    /// mates leave gaps.
    pub rank: usize,
    pub beta: Option<f64>,
}

/// Non-fatal data-quality warnings raised during ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A requested base ticker has no column in the return panel.
    BaseNotInPanel { ticker: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::BaseNotInPanel { ticker } => {
                write!(f, "{ticker} not in data columns (skipped)")
            }
        }
    }
}

/// Ranked rows plus warnings. Empty `rows` is a normal outcome,
/// distinguishable from a failure.
#[derive(Debug, Default)]
pub struct RankOutcome {
    pub rows: Vec<RankedMate>,
    pub warnings: Vec<Warning>,
}

// ── Pairwise statistics ─────────────────────────────────────────────

/// Jointly observed samples of two equal-length series.
fn joint_samples(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (a, b) in x.iter().zip(y) {
        if a.is_finite() && b.is_finite() {
            xs.push(*a);
            ys.push(*b);
        }
    }
    (xs, ys)
}

/// Count of dates where both series are observed.
pub fn overlap_count(x: &[f64], y: &[f64]) -> usize {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .count()
}

/// Pearson correlation over equal-length, fully observed samples.
/// NaN when fewer than two samples or either variance is zero.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    let denom = (vx * vy).sqrt();
    if denom == 0.0 {
        f64::NAN
    } else {
        cov / denom
    }
}

/// Average ranks (1-based), ties sharing the mean of their positions.
fn average_ranks(v: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..v.len()).collect();
    order.sort_by(|&a, &b| v[a].partial_cmp(&v[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; v.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && v[order[j + 1]] == v[order[i]] {
            j += 1;
        }
        // Positions i..=j (0-based) share the average 1-based rank
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Correlation of a pair on its jointly observed samples.
///
/// Returns `(corr, overlap)`, or `None` when the overlap is below
/// `min_overlap` or the correlation is degenerate.
pub fn pair_correlation(
    x: &[f64],
    y: &[f64],
    method: CorrMethod,
    min_overlap: usize,
) -> Option<(f64, usize)> {
    let (xs, ys) = joint_samples(x, y);
    let overlap = xs.len();
    if overlap < min_overlap {
        return None;
    }
    let corr = match method {
        CorrMethod::Pearson => pearson(&xs, &ys),
        CorrMethod::Spearman => pearson(&average_ranks(&xs), &average_ranks(&ys)),
    };
    if corr.is_finite() {
        Some((corr, overlap))
    } else {
        None
    }
}

/// Sample beta = cov(x, y) / var(x), `None` when var(x) is zero or the
/// joint sample is too small.
fn pair_beta(x: &[f64], y: &[f64]) -> Option<f64> {
    let (xs, ys) = joint_samples(x, y);
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mx = xs.iter().sum::<f64>() / nf;
    let my = ys.iter().sum::<f64>() / nf;
    let mut cov = 0.0;
    let mut vx = 0.0;
    for (a, b) in xs.iter().zip(&ys) {
        cov += (a - mx) * (b - my);
        vx += (a - mx) * (a - mx);
    }
    // Sample (ddof = 1) denominators cancel in the ratio
    if vx == 0.0 {
        None
    } else {
        Some(cov / vx)
    }
}

// ── Ranking ─────────────────────────────────────────────────────────

/// Rank the top-K most correlated mates for each target.
///
/// 1. Targets absent from the panel are skipped with a warning.
/// 2. The full pairwise matrix is computed over the candidate columns;
///    pairs below `min_overlap` are undefined.
/// 3. Per base: self excluded, undefined dropped, sorted descending by
///    correlation with ties broken by column order, first K kept.
/// 4. Each kept mate's overlap is recounted from the pair's own series and
///    the mate is discarded if the recount is still below the threshold.
/// 5. Optionally, beta over the pair's joint samples.
pub fn rank_mates(returns: &Panel, params: &RankParams) -> RankOutcome {
    let mut outcome = RankOutcome::default();

    // Candidate columns in panel (lexicographic) order
    let cand_cols: Vec<usize> = match &params.candidates {
        None => (0..returns.tickers().len()).collect(),
        Some(cands) => {
            let wanted: Vec<String> = cands
                .iter()
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect();
            (0..returns.tickers().len())
                .filter(|&c| wanted.iter().any(|w| w == &returns.tickers()[c]))
                .collect()
        }
    };

    // Full pairwise matrix, symmetric, None = undefined
    let k = cand_cols.len();
    let mut matrix: Vec<Option<f64>> = vec![None; k * k];
    for i in 0..k {
        for j in i..k {
            let cell = pair_correlation(
                returns.col(cand_cols[i]),
                returns.col(cand_cols[j]),
                params.method,
                params.min_overlap,
            )
            .map(|(corr, _)| corr);
            matrix[i * k + j] = cell;
            matrix[j * k + i] = cell;
        }
    }

    for base in &params.targets {
        let Some(bi) = cand_cols
            .iter()
            .position(|&c| &returns.tickers()[c] == base)
        else {
            outcome.warnings.push(Warning::BaseNotInPanel {
                ticker: base.clone(),
            });
            continue;
        };

        // Defined, non-self cells in column order
        let mut mates: Vec<(usize, f64)> = (0..k)
            .filter(|&j| j != bi)
            .filter_map(|j| matrix[bi * k + j].map(|corr| (j, corr)))
            .collect();
        mates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        mates.truncate(params.top_k);

        let base_col = returns.col(cand_cols[bi]);
        for (rank, (j, corr)) in mates.into_iter().enumerate() {
            let mate_col = returns.col(cand_cols[j]);
            // Second check: recount this pair's overlap in isolation
            let overlap = overlap_count(base_col, mate_col);
            if overlap < params.min_overlap {
                continue;
            }
            let beta = params.with_beta.then(|| pair_beta(base_col, mate_col)).flatten();
            outcome.rows.push(RankedMate {
                base: base.clone(),
                mate: returns.tickers()[cand_cols[j]].clone(),
                corr,
                overlap,
                rank: rank + 1,
                beta,
            });
        }
    }

    outcome
        .rows
        .sort_by(|a, b| a.base.cmp(&b.base).then(a.rank.cmp(&b.rank)));
    outcome
}
