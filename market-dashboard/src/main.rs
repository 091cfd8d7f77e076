use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use market_dashboard::economic::{
    default_window, fetch_indicators, relevant_economic_indicators, CsvEconomicSource, Sector,
};
use market_dashboard::indicators::CROSSOVER_COLUMN;
use market_dashboard::news::{
    average_compound, latest_news, JsonNewsSource, JsonSentimentScorer, SentimentScorer,
};
use market_dashboard::pipeline::period;
use market_dashboard::{
    correlation_matrix, csv_file_name, parse_symbols, resolve, save_csv, to_csv,
    watchlist_signals, watchlist_snapshot, AugmentedTable, CorrelationMatrix, DashboardConfig, FileProvider,
    JsonWatchlist, MarketDataProvider, Pipeline, SyntheticProvider, WatchlistStore, YahooProvider,
    DEFAULT_COLUMNS,
};

#[derive(Parser, Debug)]
#[command(name = "market-dashboard")]
#[command(version = "0.1.0")]
#[command(about = "Stock price history with technical indicators", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read `<SYMBOL>.csv|json` files from this directory instead of Yahoo
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use deterministic synthetic data
    #[arg(long, global = true, conflicts_with = "data_dir")]
    synthetic: bool,

    /// Seed for synthetic data
    #[arg(long, global = true, default_value = "42")]
    seed: u64,

    /// Watchlist file (overrides the configured path)
    #[arg(long, global = true)]
    watchlist: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the indicator table for a symbol
    Analyze {
        symbol: String,

        /// Period label, see `periods`
        #[arg(short, long, default_value = "1mo")]
        period: String,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Write the output to a file; `-` picks `<SYMBOL>_stock_data.csv`
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty print JSON output
        #[arg(long)]
        pretty: bool,

        /// Fail when any indicator could not be computed
        #[arg(long)]
        strict: bool,
    },

    /// List accepted period labels
    Periods,

    /// Manage tracked symbols
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },

    /// Correlation matrix of price and indicator columns
    Correlate {
        symbol: String,

        #[arg(short, long, default_value = "1y")]
        period: String,

        /// Comma separated column names
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum WatchlistAction {
    /// Track comma separated symbols
    Add { symbols: String },
    /// Stop tracking a symbol
    Remove { symbol: String },
    /// Print tracked symbols
    List,
    /// Latest close and change for every tracked symbol
    Show,
    /// Latest RSI and SMA crossover for every tracked symbol
    Signals {
        #[arg(short, long, default_value = "1y")]
        period: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
    Csv,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.watchlist {
        config.watchlist_path = path.clone();
    }

    match &cli.command {
        Command::Periods => {
            for label in period::labels() {
                let spec = resolve(label)?;
                println!("{:<8} {:>6} {}", label, spec.span.as_yahoo_str(), spec.interval);
            }
        }
        Command::Analyze {
            symbol,
            period,
            format,
            output,
            pretty,
            strict,
        } => {
            let pipeline = Pipeline::new(make_provider(&cli, &config)?, config.indicators.clone())?;
            let table = pipeline.build(symbol, period)?;
            if let Err(e) = table.status() {
                if *strict {
                    return Err(e.into());
                }
                eprintln!("Warning: {}", e);
            }

            match format {
                Format::Text => print_text_report(&table, period, &config),
                Format::Json => {
                    let json = if *pretty {
                        serde_json::to_string_pretty(&table)?
                    } else {
                        serde_json::to_string(&table)?
                    };
                    write_output(output.as_deref(), &json)?;
                }
                Format::Csv => match output.as_deref() {
                    Some(path) => {
                        let path = if path == Path::new("-") {
                            PathBuf::from(csv_file_name(table.symbol()))
                        } else {
                            path.to_path_buf()
                        };
                        save_csv(&table, &path)?;
                        eprintln!("Saved {} rows to {}", table.len(), path.display());
                    }
                    None => print!("{}", to_csv(&table)?),
                },
            }
        }
        Command::Watchlist { action } => {
            let store = JsonWatchlist::open(&config.watchlist_path)?;
            run_watchlist(action, &store, &cli, &config)?;
        }
        Command::Correlate {
            symbol,
            period,
            columns,
        } => {
            let pipeline = Pipeline::new(make_provider(&cli, &config)?, config.indicators.clone())?;
            let table = pipeline.build(symbol, period)?;
            let columns: Vec<&str> = if columns.is_empty() {
                DEFAULT_COLUMNS.to_vec()
            } else {
                columns.iter().map(|c| c.trim()).collect()
            };
            let matrix = correlation_matrix(&table, &columns)?;
            print_matrix(&matrix);
        }
    }

    Ok(())
}

fn make_provider(cli: &Cli, config: &DashboardConfig) -> Result<Arc<dyn MarketDataProvider>> {
    if cli.synthetic {
        info!(seed = cli.seed, "using synthetic data");
        return Ok(Arc::new(SyntheticProvider::new(cli.seed)));
    }
    if let Some(dir) = &config.data_dir {
        info!(dir = %dir.display(), "using file data");
        return Ok(Arc::new(FileProvider::new(dir)));
    }
    let provider = YahooProvider::new(&config.provider).context("creating HTTP client")?;
    Ok(Arc::new(provider))
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn run_watchlist(
    action: &WatchlistAction,
    store: &dyn WatchlistStore,
    cli: &Cli,
    config: &DashboardConfig,
) -> Result<()> {
    match action {
        WatchlistAction::Add { symbols } => {
            for symbol in parse_symbols(symbols)? {
                if store.add(&symbol)? {
                    println!("Added {} to your tracked stocks", symbol);
                } else {
                    println!("{} is already tracked", symbol);
                }
            }
        }
        WatchlistAction::Remove { symbol } => {
            if store.remove(symbol)? {
                println!("Removed {}", symbol.trim().to_ascii_uppercase());
            } else {
                println!("{} was not tracked", symbol.trim().to_ascii_uppercase());
            }
        }
        WatchlistAction::List => {
            let symbols = store.list()?;
            if symbols.is_empty() {
                println!("No tracked stocks");
            } else {
                println!("{}", symbols.join(", "));
            }
        }
        WatchlistAction::Show => {
            let provider = make_provider(cli, config)?;
            let entries = watchlist_snapshot(provider.as_ref(), store)?;
            println!("  {:<10} {:<28} {:>12} {:>9}", "SYMBOL", "NAME", "LAST", "CHANGE");
            for entry in entries {
                let last = entry
                    .last_close
                    .map(|c| format!("{:.2}", c))
                    .unwrap_or_else(|| common::UNKNOWN.to_string());
                let change = entry
                    .change_pct
                    .map(|c| format!("{:+.2}%", c))
                    .unwrap_or_else(|| common::UNKNOWN.to_string());
                let name = entry.name.unwrap_or_default();
                println!(
                    "  {:<10} {:<28} {:>12} {:>9}",
                    entry.symbol,
                    truncate(&name, 28),
                    last,
                    change
                );
            }
        }
        WatchlistAction::Signals { period } => {
            let pipeline = Pipeline::new(make_provider(cli, config)?, config.indicators.clone())?;
            let signals = watchlist_signals(&pipeline, store, period)?;
            println!("  {:<10} {:>8}   {}", "SYMBOL", "RSI", "LAST CROSSOVER");
            for signal in signals {
                if let Some(error) = signal.error {
                    println!("  {:<10} {}", signal.symbol, error);
                    continue;
                }
                let cross = match signal.last_crossover {
                    Some((at, direction)) => format!("{} {}", direction, at.format("%Y-%m-%d")),
                    None => "none in this period".to_string(),
                };
                println!("  {:<10} {:>8}   {}", signal.symbol, fmt_value(signal.rsi), cross);
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn fmt_value(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => common::UNKNOWN.to_string(),
    }
}

fn print_text_report(table: &AugmentedTable, period: &str, config: &DashboardConfig) {
    let info = table.info();
    let (Some(first), Some(last)) = (table.bars().first(), table.bars().last()) else {
        return;
    };

    println!();
    println!("================================================================");
    println!(
        "  {} - {}",
        table.symbol(),
        info.name.as_deref().unwrap_or(common::UNKNOWN)
    );
    println!("================================================================");
    println!();
    println!(
        "  Period: {} ({} to {})",
        period,
        first.timestamp.format("%Y-%m-%d"),
        last.timestamp.format("%Y-%m-%d")
    );
    println!("  Bars:   {}", table.len());
    println!();
    println!("----------------------------------------------------------------");
    println!("  FINANCIAL METRICS");
    println!("----------------------------------------------------------------");
    println!("  Market Cap:      {:>20}", info.market_cap_display());
    println!("  P/E Ratio:       {:>20}", info.pe_display());
    println!("  EPS:             {:>20}", info.eps_display());
    println!("  Dividend Yield:  {:>20}", info.dividend_yield_display());
    println!();
    println!("----------------------------------------------------------------");
    println!("  LATEST VALUES ({})", last.timestamp.format("%Y-%m-%d %H:%M"));
    println!("----------------------------------------------------------------");
    let row = table.len() - 1;
    for name in table.column_names() {
        if name == CROSSOVER_COLUMN {
            continue;
        }
        let value = table.values(name).and_then(|v| v.get(row).copied());
        println!("  {:<16} {:>20}", name, fmt_value(value));
    }

    let crosses = table.crossover_points(CROSSOVER_COLUMN);
    println!();
    println!("----------------------------------------------------------------");
    println!(
        "  SMA CROSSOVERS ({} / {})",
        config.indicators.sma_short_name(),
        config.indicators.sma_long_name()
    );
    println!("----------------------------------------------------------------");
    if crosses.is_empty() {
        println!("  none in this period");
    }
    for (bar, direction) in crosses.iter().rev().take(5) {
        println!(
            "  {}  {:<5} close {:.2}",
            bar.timestamp.format("%Y-%m-%d"),
            direction,
            bar.close
        );
    }

    let sector = Sector::of(info);
    let codes = relevant_economic_indicators(sector);
    println!();
    println!("  Economic indicators to watch ({}): {}", sector, codes.join(", "));

    if let Some(dir) = &config.data_dir {
        print_economic_data(dir, codes, last.timestamp.date_naive());
        print_news(dir, table.symbol());
    }

    for failure in table.failures() {
        println!();
        println!("  ! {} not computed: {}", failure.indicator, failure.reason);
    }
    println!();
    println!("================================================================");
}

fn print_economic_data(dir: &Path, codes: &[&str], end: chrono::NaiveDate) {
    let (start, end) = default_window(end);
    match fetch_indicators(&CsvEconomicSource::new(dir), codes, start, end) {
        Ok(data) => {
            for (code, observations) in data {
                if let Some(latest) = observations.last() {
                    println!("    {:<14} {:>12.2}  ({})", code, latest.value, latest.date);
                }
            }
        }
        Err(e) => warn!(error = %e, "economic data unavailable"),
    }
}

fn print_news(dir: &Path, symbol: &str) {
    let scorer = match JsonSentimentScorer::open(dir) {
        Ok(scorer) => scorer,
        Err(e) => {
            warn!(error = %e, "sentiment scores unreadable");
            None
        }
    };
    let scorer = scorer.as_ref().map(|s| s as &dyn SentimentScorer);

    let news = match latest_news(&JsonNewsSource::new(dir), scorer, symbol) {
        Ok(news) if !news.is_empty() => news,
        Ok(_) => return,
        Err(e) => {
            warn!(error = %e, "news unavailable");
            return;
        }
    };

    println!();
    println!("----------------------------------------------------------------");
    println!("  RECENT NEWS");
    println!("----------------------------------------------------------------");
    for scored in &news {
        let article = &scored.article;
        match scored.sentiment {
            Some(s) => println!("  [{} {:+.2}] {}", s.label(), s.compound, article.title),
            None => println!("  {}", article.title),
        }
        println!("    {}", article.url);
        if !article.description.is_empty() {
            println!("    {}", article.description);
        }
    }
    if let Some(mean) = average_compound(&news) {
        println!();
        println!("  Average sentiment: {:+.2}", mean);
    }
}

fn print_matrix(matrix: &CorrelationMatrix) {
    print!("  {:<10}", "");
    for name in &matrix.columns {
        print!(" {:>10}", truncate(name, 10));
    }
    println!();
    for (name, row) in matrix.columns.iter().zip(&matrix.values) {
        print!("  {:<10}", truncate(name, 10));
        for v in row {
            if v.is_finite() {
                print!(" {:>10.3}", v);
            } else {
                print!(" {:>10}", common::UNKNOWN);
            }
        }
        println!();
    }
}
