//! FlowScan CLI: fetch, analyze and scan commands.
//!
//! Commands:
//! - `fetch`: pull bars through the provider fallback chain (or one named provider)
//! - `analyze`: run indicators and the selected signal flags for one symbol
//! - `scan`: analyze a batch of symbols and list the signaling ones
//! - `providers`: show the configured provider order and credential status

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use flowscan_core::data::{session, Credentials, FallbackFetcher, FetchRequest, ProviderId};
use flowscan_core::domain::{BarSeries, Resolution};
use flowscan_core::scan::{ScanError, ScanProgress, ScanRequest, Scanner, SymbolReport};
use flowscan_core::signals::{SignalKind, SignalMode};
use flowscan_core::{frame, FlowScanConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "flowscan",
    about = "FlowScan CLI: money-flow indicators and candlestick signals over free market-data APIs"
)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch bars through the provider fallback chain.
    Fetch {
        /// Ticker symbol (e.g., AAPL).
        symbol: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Query only this provider and surface its error directly.
        #[arg(long)]
        provider: Option<ProviderId>,

        /// Write the bars to a .parquet or .csv file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compute indicators and signal flags for one symbol.
    Analyze {
        symbol: String,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        signals: SignalArgs,

        /// Write the decorated series to a .parquet or .csv file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Analyze a batch of symbols and report the signaling ones.
    Scan {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        signals: SignalArgs,
    },
    /// Show provider order and credential status.
    Providers,
}

#[derive(Args)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD). Defaults to one year ago.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Fetch hourly bars instead of daily bars.
    #[arg(long, default_value_t = false)]
    hourly: bool,
}

impl RangeArgs {
    fn resolve(&self) -> Result<(NaiveDate, NaiveDate, Resolution)> {
        let today = chrono::Local::now().date_naive();
        let start = parse_date(self.start.as_deref())?
            .unwrap_or(today - chrono::Duration::days(365));
        let end = parse_date(self.end.as_deref())?.unwrap_or(today);
        if start > end {
            bail!("--start {start} is after --end {end}");
        }
        let resolution = if self.hourly {
            Resolution::Hourly
        } else {
            Resolution::Daily
        };
        Ok((start, end, resolution))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Buy,
    Sell,
}

impl From<ModeArg> for SignalMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Buy => SignalMode::Buy,
            ModeArg::Sell => SignalMode::Sell,
        }
    }
}

#[derive(Args)]
struct SignalArgs {
    /// Signal catalog.
    #[arg(long, value_enum, default_value = "buy")]
    mode: ModeArg,

    /// Comma-separated signal names. Defaults to the whole catalog.
    #[arg(long, value_delimiter = ',')]
    signals: Vec<SignalKind>,
}

impl SignalArgs {
    fn selected(&self) -> (SignalMode, Vec<SignalKind>) {
        let mode = SignalMode::from(self.mode);
        if self.signals.is_empty() {
            return (mode, mode.catalog().to_vec());
        }
        for kind in self.signals.iter().filter(|k| !mode.contains(**k)) {
            eprintln!("warning: {kind} is not in the {mode} catalog and will be ignored");
        }
        (mode, self.signals.clone())
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowscan=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FlowScanConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FlowScanConfig::default(),
    };
    let credentials = Credentials::from_env();

    match cli.command {
        Commands::Fetch {
            symbol,
            range,
            provider,
            output,
        } => run_fetch(&config, &credentials, &symbol, &range, provider, output.as_deref()),
        Commands::Analyze {
            symbol,
            range,
            signals,
            output,
        } => run_analyze(&config, &credentials, &symbol, &range, &signals, output.as_deref()),
        Commands::Scan {
            symbols,
            range,
            signals,
        } => run_scan(&config, &credentials, symbols, &range, &signals),
        Commands::Providers => run_providers(&config, &credentials),
    }
}

fn run_fetch(
    config: &FlowScanConfig,
    credentials: &Credentials,
    symbol: &str,
    range: &RangeArgs,
    provider: Option<ProviderId>,
    output: Option<&Path>,
) -> Result<()> {
    let (start, end, resolution) = range.resolve()?;
    let fetcher = FallbackFetcher::from_config(&config.providers, credentials)?;
    let request = FetchRequest::new(symbol, start, end, resolution);

    let (series, source) = match provider {
        Some(id) => (fetcher.fetch_from(id, &request)?, Some(id)),
        None => {
            let outcome = fetcher.fetch(&request);
            for attempt in &outcome.attempts {
                println!("  {attempt}");
            }
            (outcome.series, outcome.provider)
        }
    };

    let mut series = session::coerce(series);
    if resolution == Resolution::Hourly {
        series = session::restrict(series, config.session);
    }

    match source {
        Some(id) => println!("{symbol}: {} {resolution} bars from {id}", series.len()),
        None => {
            println!("{symbol}: no {resolution} data from any provider");
            if resolution == Resolution::Daily {
                std::process::exit(1);
            }
        }
    }
    print_tail(&series, 5);

    if let Some(path) = output {
        frame::write(&series, path)?;
        println!("Saved to: {}", path.display());
    }
    Ok(())
}

fn run_analyze(
    config: &FlowScanConfig,
    credentials: &Credentials,
    symbol: &str,
    range: &RangeArgs,
    signals: &SignalArgs,
    output: Option<&Path>,
) -> Result<()> {
    let (start, end, resolution) = range.resolve()?;
    let (mode, selected) = signals.selected();
    let fetcher = FallbackFetcher::from_config(&config.providers, credentials)?;
    let scanner = Scanner::new(&fetcher, config);

    let request = FetchRequest::new(symbol, start, end, resolution);
    let report = scanner.analyze(&request, mode, &selected)?;
    print_report(&report, &selected);

    if let Some(path) = output {
        frame::write(&report.series, path)?;
        println!("Saved to: {}", path.display());
    }
    Ok(())
}

fn run_scan(
    config: &FlowScanConfig,
    credentials: &Credentials,
    symbols: Vec<String>,
    range: &RangeArgs,
    signals: &SignalArgs,
) -> Result<()> {
    let (start, end, resolution) = range.resolve()?;
    let (mode, selected) = signals.selected();
    let fetcher = FallbackFetcher::from_config(&config.providers, credentials)?;
    let scanner = Scanner::new(&fetcher, config);

    let request = ScanRequest {
        symbols: symbols.into_iter().map(|s| s.trim().to_uppercase()).collect(),
        start,
        end,
        resolution,
        mode,
        selected,
    };
    let summary = scanner.scan(&request, &StdoutProgress);

    let signaling = summary.signaling();
    println!();
    if signaling.is_empty() {
        println!("No {mode} signals on the latest bar.");
    } else {
        println!("Signaling ({mode}): {}", signaling.join(", "));
    }

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_providers(config: &FlowScanConfig, credentials: &Credentials) -> Result<()> {
    let orders = [
        ("Daily", &config.providers.daily),
        ("Hourly", &config.providers.hourly),
    ];
    for (label, order) in orders {
        println!("{label} order:");
        for (i, id) in order.iter().enumerate() {
            let status = if credentials.has(*id) {
                "configured"
            } else {
                "missing credential"
            };
            let vars = match id.secret_var() {
                Some(secret) => format!("{} + {secret}", id.key_var()),
                None => id.key_var().to_string(),
            };
            println!("  {:>2}. {:<14} {:<20} {vars}", i + 1, id.as_str(), status);
        }
    }
    Ok(())
}

/// Prints one line per symbol.
struct StdoutProgress;

impl ScanProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        print!("[{}/{}] {symbol} ... ", index + 1, total);
        std::io::stdout().flush().ok();
    }

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<SymbolReport, ScanError>,
    ) {
        match result {
            Ok(report) if report.insufficient.is_some() => {
                println!("{} bars, too few for indicators", report.series.len());
            }
            Ok(report) => {
                let fired: Vec<&str> = report.fired.iter().map(|k| k.name()).collect();
                let mark = if report.signaling { " SIGNALING" } else { "" };
                println!(
                    "{} via {} [{}]{mark}",
                    report.series.len(),
                    report.provider,
                    fired.join(", ")
                );
            }
            Err(e) => println!("failed: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("Done: {succeeded}/{total} analyzed, {failed} failed.");
    }
}

fn print_report(report: &SymbolReport, selected: &[SignalKind]) {
    let series = &report.series;
    println!();
    println!("=== {} ({}) ===", report.symbol, series.resolution());
    println!("Provider:       {}", report.provider);
    println!("Bars fetched:   {}", report.rows_fetched);
    if let Some(e) = &report.insufficient {
        println!("WARNING: {e}; all flags are false");
        return;
    }
    println!("Bars analyzed:  {}", series.len());

    let Some(last) = series.bars().last() else {
        return;
    };
    println!("Latest bar:     {} close {:.2}", last.timestamp, last.close);
    for (column, values) in series.values() {
        if let Some(v) = values.last() {
            println!("  {:<16} {v:.4}", column.name());
        }
    }

    println!();
    println!("--- Signals (latest bar) ---");
    for kind in selected {
        let state = match series.signal(*kind).and_then(|f| f.last()) {
            Some(true) => "YES",
            Some(false) => "no",
            None => "n/a",
        };
        println!("  {:<26} {state}", kind.name());
    }
    println!();
    println!("Signaling:      {}", if report.signaling { "YES" } else { "no" });
}

fn print_tail(series: &BarSeries, n: usize) {
    let bars = series.bars();
    let from = bars.len().saturating_sub(n);
    if bars.is_empty() {
        return;
    }
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>14}",
        "Timestamp", "Open", "High", "Low", "Close", "Volume"
    );
    println!("{}", "-".repeat(79));
    for bar in &bars[from..] {
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14.0}",
            bar.timestamp.to_string(),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
    })
    .transpose()
}
