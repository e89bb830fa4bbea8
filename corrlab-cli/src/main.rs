//! corrlab CLI — scan for correlation mates over the cached daily panel.
//!
//! Commands:
//! - `scan` — fetch/cache the recent window, build the return panel, and
//!   print the top-K most correlated mates per target ticker
//! - `download` — warm the day cache only
//! - `cache status` — report cached day artifacts and their date range

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use corrlab_core::data::{FsStore, PolygonProvider, QuotaPacer, StdoutProgress};
use corrlab_core::{
    fetch_close_panel, fetch_days, last_business_days, panel_returns, rank_mates, CorrMethod,
    FetchConfig, RankOutcome, RankParams, ReturnKind, Universe,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "corrlab",
    about = "corrlab CLI — top correlated tickers from cached daily closes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Pearson,
    Spearman,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the top correlated mates for each target ticker.
    Scan {
        /// Target tickers (e.g., NVDA AMD TSLA).
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Number of recent business days to cover.
        #[arg(long, default_value_t = 90)]
        days: usize,

        /// Top-K mates per target.
        #[arg(long, default_value_t = 10)]
        topk: usize,

        /// Minimum overlapping days for a pair to count.
        #[arg(long, default_value_t = 30)]
        min_overlap: usize,

        /// Use simple percent returns instead of log returns.
        #[arg(long, default_value_t = false)]
        pct: bool,

        #[arg(long, value_enum, default_value_t = MethodArg::Pearson)]
        method: MethodArg,

        /// Also report beta = cov(base, mate) / var(base).
        #[arg(long, default_value_t = false)]
        beta: bool,

        /// Use unadjusted prices.
        #[arg(long, default_value_t = false)]
        no_adjusted: bool,

        /// Path to save the result as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Universe TOML file ([sectors] table of ticker lists).
        #[arg(long, default_value = "universe.toml")]
        universe: PathBuf,

        /// Cache directory.
        #[arg(long, default_value = "cache/polygon_grouped")]
        cache_dir: PathBuf,
    },
    /// Warm the day cache without running a scan.
    Download {
        /// Number of recent business days to fetch.
        #[arg(long, default_value_t = 90)]
        days: usize,

        /// Use unadjusted prices.
        #[arg(long, default_value_t = false)]
        no_adjusted: bool,

        /// Cache directory.
        #[arg(long, default_value = "cache/polygon_grouped")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached day artifacts per adjustment flag.
    Status {
        /// Cache directory.
        #[arg(long, default_value = "cache/polygon_grouped")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            tickers,
            days,
            topk,
            min_overlap,
            pct,
            method,
            beta,
            no_adjusted,
            csv,
            universe,
            cache_dir,
        } => run_scan(
            tickers,
            days,
            topk,
            min_overlap,
            pct,
            method,
            beta,
            !no_adjusted,
            csv,
            &universe,
            cache_dir,
        ),
        Commands::Download {
            days,
            no_adjusted,
            cache_dir,
        } => run_download(days, !no_adjusted, cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    tickers: Vec<String>,
    days: usize,
    topk: usize,
    min_overlap: usize,
    pct: bool,
    method: MethodArg,
    beta: bool,
    adjusted: bool,
    csv: Option<PathBuf>,
    universe_path: &Path,
    cache_dir: PathBuf,
) -> Result<()> {
    let cfg = FetchConfig::from_env(cache_dir, adjusted)
        .context("set POLYGON_API_KEY to your API credential")?;

    let mut universe = Universe::from_file(universe_path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("load universe from {}", universe_path.display()))?;
    // Requested bases are always eligible for the panel
    for t in &tickers {
        universe.insert(t);
    }

    let store = FsStore::new(&cfg.cache_dir)?;
    let provider = PolygonProvider::new(cfg.api_key.clone());
    let mut pacer = QuotaPacer::default();
    let today = Local::now().date_naive();

    let panel = fetch_close_panel(
        &store,
        &provider,
        &universe,
        days,
        today,
        cfg.adjusted,
        &mut pacer,
        Some(&StdoutProgress),
    )?;
    if panel.is_empty() {
        println!("[error] No data loaded. Check your cache or days range.");
        return Ok(());
    }

    let kind = if pct { ReturnKind::Simple } else { ReturnKind::Log };
    let rets = panel_returns(&panel, kind);

    let mut params = RankParams::new(tickers);
    params.method = match method {
        MethodArg::Pearson => CorrMethod::Pearson,
        MethodArg::Spearman => CorrMethod::Spearman,
    };
    params.min_overlap = min_overlap;
    params.top_k = topk;
    params.with_beta = beta;

    let outcome = rank_mates(&rets, &params);
    for warning in &outcome.warnings {
        eprintln!("[warn] {warning}");
    }
    if outcome.rows.is_empty() {
        println!("[info] No pairs met the criteria.");
        return Ok(());
    }

    print_grouped(&outcome, &params, days, adjusted);

    if let Some(path) = csv {
        write_csv(&path, &outcome, beta)
            .with_context(|| format!("write CSV to {}", path.display()))?;
        println!("\n[saved] {}", path.display());
    }
    Ok(())
}

fn print_grouped(outcome: &RankOutcome, params: &RankParams, days: usize, adjusted: bool) {
    let method = match params.method {
        CorrMethod::Pearson => "pearson",
        CorrMethod::Spearman => "spearman",
    };

    let mut i = 0;
    while i < outcome.rows.len() {
        let base = &outcome.rows[i].base;
        let group: Vec<_> = outcome.rows[i..]
            .iter()
            .take_while(|r| &r.base == base)
            .collect();

        println!(
            "\n=== {base} | top {} (method={method}, days={days}, adjusted={adjusted}) ===",
            group.len()
        );
        if params.with_beta {
            println!("{:>4}  {:<8} {:>8} {:>8} {:>8}", "rank", "mate", "corr", "overlap", "beta");
            for row in &group {
                let b = row
                    .beta
                    .map(|b| format!("{b:8.4}"))
                    .unwrap_or_else(|| format!("{:>8}", "n/a"));
                println!(
                    "{:>4}  {:<8} {:>8.4} {:>8} {b}",
                    row.rank, row.mate, row.corr, row.overlap
                );
            }
        } else {
            println!("{:>4}  {:<8} {:>8} {:>8}", "rank", "mate", "corr", "overlap");
            for row in &group {
                println!(
                    "{:>4}  {:<8} {:>8.4} {:>8}",
                    row.rank, row.mate, row.corr, row.overlap
                );
            }
        }
        i += group.len();
    }
}

fn write_csv(path: &Path, outcome: &RankOutcome, with_beta: bool) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if with_beta {
        writer.write_record(["base", "mate", "corr", "overlap", "rank", "beta"])?;
    } else {
        writer.write_record(["base", "mate", "corr", "overlap", "rank"])?;
    }
    for row in &outcome.rows {
        let mut record = vec![
            row.base.clone(),
            row.mate.clone(),
            row.corr.to_string(),
            row.overlap.to_string(),
            row.rank.to_string(),
        ];
        if with_beta {
            record.push(row.beta.map(|b| b.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn run_download(days: usize, adjusted: bool, cache_dir: PathBuf) -> Result<()> {
    let cfg = FetchConfig::from_env(cache_dir, adjusted)
        .context("set POLYGON_API_KEY to your API credential")?;

    let store = FsStore::new(&cfg.cache_dir)?;
    let provider = PolygonProvider::new(cfg.api_key.clone());
    let mut pacer = QuotaPacer::default();
    let dates = last_business_days(days, Local::now().date_naive());

    fetch_days(
        &store,
        &provider,
        &dates,
        cfg.adjusted,
        &mut pacer,
        Some(&StdoutProgress),
    )?;
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    let store = FsStore::new(cache_dir)?;
    let keys = store.cached_keys()?;
    if keys.is_empty() {
        println!("Cache at {} is empty.", cache_dir.display());
        return Ok(());
    }

    let adjusted = keys.iter().filter(|k| k.adjusted).count();
    let first = keys.first().map(|k| k.day).unwrap();
    let last = keys.last().map(|k| k.day).unwrap();
    println!("Cache at {}:", cache_dir.display());
    println!("  {} day artifacts ({adjusted} adjusted, {} unadjusted)", keys.len(), keys.len() - adjusted);
    println!("  date range {first} .. {last}");
    Ok(())
}
