//! dualtrend CLI: paper sessions, candle evaluation and configuration.
//!
//! Commands:
//! - `run`: trade one session against the built-in paper market, live or replayed
//! - `evaluate`: print indicators and entry (or exit) conditions for a candle CSV
//! - `config`: print the default configuration as TOML

mod paper;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use dualtrend_core::config::TraderConfig;
use dualtrend_core::domain::{Candle, CandleInterval, CandleSeries, TradeRecord};
use dualtrend_core::expiry::parse_expiry_date;
use dualtrend_core::session::{
    Clock, CycleState, CycleStatus, ManualClock, SessionObserver, SessionSummary, StopHandle,
    SystemClock, TradeLedger, Trader,
};
use dualtrend_core::signals::SignalEvaluator;
use paper::{PaperBroker, PaperMarket, PaperSelector};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "dualtrend",
    about = "dualtrend: dual-timeframe double-confirmation options trader"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trade one session against the paper market.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Option expiry, e.g. "Jan 27", "27 Jan 2026", "2026-01-27".
        #[arg(long)]
        expiry: String,

        /// Starting paper cash balance.
        #[arg(long, default_value_t = 500_000.0)]
        balance: f64,

        /// Starting level of the underlying index.
        #[arg(long, default_value_t = 25_500.0)]
        spot: f64,

        /// Underlying name used in option symbols.
        #[arg(long, default_value = "NIFTY")]
        underlying: String,

        /// Seed for the paper market's random walk.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Replay a whole session date (YYYY-MM-DD) on a simulated clock
        /// instead of trading in real time.
        #[arg(long)]
        replay: Option<String>,

        /// Write the trade tape as CSV when the session ends.
        #[arg(long)]
        trades_csv: Option<PathBuf>,

        /// Print the session summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Evaluate entry (or exit) conditions on a candle CSV.
    Evaluate {
        /// CSV with columns timestamp,open,high,low,close,volume.
        #[arg(long)]
        candles: PathBuf,

        /// Candle interval of the file (minute, 2minute, 5minute, ...).
        #[arg(long, default_value = "2minute")]
        interval: String,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Evaluate the exit triggers instead of the entry conditions.
        #[arg(long, default_value_t = false)]
        exit: bool,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            expiry,
            balance,
            spot,
            underlying,
            seed,
            replay,
            trades_csv,
            json,
        } => run_session_cmd(RunArgs {
            config,
            expiry,
            balance,
            spot,
            underlying,
            seed,
            replay,
            trades_csv,
            json,
        }),
        Commands::Evaluate {
            candles,
            interval,
            config,
            exit,
        } => run_evaluate(&candles, &interval, config.as_deref(), exit),
        Commands::Config => {
            print!("{}", TraderConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TraderConfig> {
    match path {
        Some(path) => TraderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(TraderConfig::default()),
    }
}

// ── run ──────────────────────────────────────────────────────────────

struct RunArgs {
    config: Option<PathBuf>,
    expiry: String,
    balance: f64,
    spot: f64,
    underlying: String,
    seed: u64,
    replay: Option<String>,
    trades_csv: Option<PathBuf>,
    json: bool,
}

fn run_session_cmd(args: RunArgs) -> Result<()> {
    if !(args.balance.is_finite() && args.balance >= 0.0) {
        bail!("--balance must be a non-negative number");
    }
    if !(args.spot.is_finite() && args.spot > 0.0) {
        bail!("--spot must be positive");
    }

    let config = load_config(args.config.as_deref())?;
    let replay_date = args
        .replay
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--replay expects YYYY-MM-DD")?;

    let session_year = replay_date.map_or_else(|| Local::now().year(), |d| d.year());
    let expiry = parse_expiry_date(&args.expiry, session_year)?;
    info!(%expiry, underlying = %args.underlying, seed = args.seed, "paper session");

    let market = PaperMarket::new(args.seed, args.spot, args.balance, &config.market).shared();
    let broker = PaperBroker::new(market.clone());
    let selector = PaperSelector::new(market, args.underlying.clone(), expiry);

    let summary = match replay_date {
        Some(date) => {
            let offset = config.market.offset()?;
            // Start a few minutes early so the session waits for the open.
            let start = date
                .and_time(config.market.open)
                .checked_sub_signed(chrono::Duration::minutes(5))
                .context("replay start out of range")?;
            let start = offset
                .from_local_datetime(&start)
                .single()
                .context("replay start is ambiguous")?
                .with_timezone(&Utc);
            run_session(config, broker, selector, ManualClock::new(start), false)?
        }
        None => run_session(config, broker, selector, SystemClock, true)?,
    };

    print_summary(&summary);
    if args.json {
        println!("{}", summary.to_json()?);
    }
    if let Some(path) = &args.trades_csv {
        write_trades_csv(&summary, path)?;
        println!("Trades written to: {}", path.display());
    }
    Ok(())
}

fn run_session<C: Clock>(
    config: TraderConfig,
    broker: PaperBroker,
    selector: PaperSelector,
    clock: C,
    listen_for_ctrl_c: bool,
) -> Result<SessionSummary> {
    let trader = Trader::new(config, broker, selector, clock)?;
    if listen_for_ctrl_c {
        install_ctrl_c(trader.stop_handle())?;
    }
    let mut trader = trader.with_observer(ConsoleObserver::default());
    Ok(trader.run()?)
}

/// Requests a stop on Ctrl-C. The session finishes its current iteration and
/// closes any open position before returning.
fn install_ctrl_c(handle: StopHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("stop requested, closing any open position");
                    handle.stop();
                }
            });
        })
        .context("spawning signal listener")?;
    Ok(())
}

/// Prints state changes, a status line about once a minute, and every trade.
#[derive(Default)]
struct ConsoleObserver {
    last_state: Option<CycleState>,
    since_print: u32,
}

const STATUS_EVERY: u32 = 12;

impl SessionObserver for ConsoleObserver {
    fn on_status(&mut self, status: &CycleStatus) {
        self.since_print += 1;
        if self.last_state != Some(status.state) || self.since_print >= STATUS_EVERY {
            println!("{}", status.line());
            self.last_state = Some(status.state);
            self.since_print = 0;
        }
    }

    fn on_trade(&mut self, trade: &TradeRecord) {
        println!(
            "TRADE #{} {} qty {} {:.2} -> {:.2} pnl {:+.2} [{}]",
            trade.trade_number,
            trade.symbol,
            trade.quantity,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.exit_reason
        );
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("=== Session Summary ===");
    println!("Stopped:        {:?}", summary.stop_reason);
    println!("Trades:         {}", summary.total_trades);
    println!("Winners:        {}", summary.winners);
    println!("Losers:         {}", summary.losers);
    println!("Total P&L:      {:+.2}", summary.total_pnl);
    if !summary.trades.is_empty() {
        println!();
        println!("--- Trades ---");
        for line in summary.lines() {
            println!("{line}");
        }
    }
    if let Some(open) = &summary.open_position {
        println!();
        println!(
            "WARNING: position still open: {} qty {} entry {:.2}",
            open.symbol, open.quantity, open.entry_price
        );
    }
    println!();
}

fn write_trades_csv(summary: &SessionSummary, path: &Path) -> Result<()> {
    let mut ledger = TradeLedger::new();
    for trade in &summary.trades {
        ledger.record(trade.clone());
    }
    std::fs::write(path, ledger.export_csv()?)
        .with_context(|| format!("writing {}", path.display()))
}

// ── evaluate ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    // Broker exports carry an offset suffix; keep exchange-local wall time.
    if let Ok(with_offset) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .with_context(|| format!("unrecognised timestamp '{raw}'"))
}

fn load_candles(path: &Path, interval: CandleInterval) -> Result<Vec<Candle>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut candles = Vec::new();
    for (line, row) in reader.deserialize::<CandleRow>().enumerate() {
        let row = row.with_context(|| format!("row {}", line + 2))?;
        candles.push(Candle {
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            open_interest: None,
        });
    }
    let series = CandleSeries::from_candles(interval, candles)?;
    Ok(series.candles().to_vec())
}

fn run_evaluate(path: &Path, interval: &str, config: Option<&Path>, exit: bool) -> Result<()> {
    let config = load_config(config)?;
    let interval: CandleInterval = interval.parse()?;
    let candles = load_candles(path, interval)?;
    let evaluator = SignalEvaluator::from_config(&config);

    let Some(snap) = evaluator.engine().latest(&candles, 1).pop() else {
        bail!("{} has no candles", path.display());
    };

    println!();
    println!("=== {} ({} bars, {}) ===", path.display(), candles.len(), interval);
    println!("Last bar:       {}", snap.timestamp);
    println!("Close:          {:.2}", snap.close);
    println!(
        "SuperTrend:     {:.2} ({})",
        snap.supertrend_value,
        snap.supertrend_direction
            .map_or("undefined", |d| if d.is_bullish() { "bullish" } else { "bearish" })
    );
    println!(
        "EMA low:        {:.2} (offset {:.2})",
        snap.ema_low, snap.ema_low_offset
    );
    println!("EMA fast/slow:  {:.2} / {:.2}", snap.ema_fast, snap.ema_slow);
    println!("RSI:            {:.2}", snap.rsi);
    println!("Stoch RSI K/D:  {:.2} / {:.2}", snap.stoch_rsi_k, snap.stoch_rsi_d);
    println!(
        "MACD:           {:.3} signal {:.3} hist {:.3}",
        snap.macd_line, snap.macd_signal, snap.macd_histogram
    );
    println!();

    if exit {
        let eval = evaluator.analyze_exit(&candles)?;
        println!("--- Exit ---");
        println!("ema_low_falling  {}", mark(eval.ema_low_falling));
        println!("strong_bearish   {}", mark(eval.strong_bearish));
        match eval.trigger {
            Some(reason) => println!("EXIT: {reason}"),
            None => println!("HOLD"),
        }
    } else {
        let set = evaluator.analyze_entry(&candles)?;
        println!("--- Entry ({}/7) ---", set.passed_count());
        for (name, ok) in set.named() {
            println!("{name:<24} {}", mark(ok));
        }
        if set.is_entry_eligible() {
            println!("ELIGIBLE");
        } else {
            println!("NOT ELIGIBLE: {}", set.failing().join(", "));
        }
    }
    println!();
    Ok(())
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}
