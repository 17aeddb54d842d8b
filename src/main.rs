//! Risk Reversal - Main Entry Point
//!
//! Runs daily backtests of the risk reversal strategy and inspects persisted state.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use risk_reversal::backtest::{BacktestConfig, BacktestEngine, CsvDataLoader, DataLoader};
use risk_reversal::config::Config;
use risk_reversal::persistence::{PersistedState, StateStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Risk Reversal CLI
#[derive(Parser)]
#[command(name = "risk-reversal")]
#[command(version, about = "15-delta SPY risk reversal strategy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest simulation on historical option chain data
    Backtest {
        /// Path to CSV data file
        #[arg(short, long)]
        data: String,

        /// Start date (YYYY-MM-DD), defaults to the configured start
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD), defaults to the configured end
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Initial cash, defaults to the configured amount
        #[arg(short, long)]
        cash: Option<Decimal>,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<String>,

        /// SQLite database to store the final state and daily performance
        #[arg(long)]
        db: Option<String>,
    },

    /// Show persisted strategy state
    Status {
        /// Path to SQLite database
        #[arg(short, long, default_value = "data/risk_reversal.db")]
        db: String,

        /// Number of recent performance rows to show
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logging()?;

    match cli.command {
        Commands::Backtest {
            data,
            start,
            end,
            cash,
            output,
            db,
        } => run_backtest(&data, start, end, cash, output.as_deref(), db.as_deref()).await,
        Commands::Status { db, limit } => show_status(&db, limit),
        Commands::Config => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // File appender for detailed logs
    let file_appender = tracing_appender::rolling::daily("logs", "risk-reversal.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("risk_reversal=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    let s = &config.strategy;
    info!("📋 Configuration:");
    info!("   Underlying:       {}", s.underlying);
    info!("   Target Delta:     {:.2}", s.delta_target);
    info!(
        "   Delta Band:       {:.2} to {:.2}",
        s.delta_band.lower, s.delta_band.upper
    );
    info!(
        "   Expiry Window:    {} to {} days",
        s.expiry_window.min_days, s.expiry_window.max_days
    );
    info!("   Strike Range:     ±{} strikes", s.strike_range);
    info!(
        "   Hold Limit:       {} days ({} - {})",
        s.days_to_expiry.saturating_sub(s.days_to_close),
        s.days_to_expiry,
        s.days_to_close
    );
    info!(
        "   Quantities:       {} contracts, {} {} hedge",
        s.contract_quantity, s.hedge_quantity, s.underlying
    );
    info!(
        "   Commission:       ${} per contract",
        config.execution.option_commission
    );
}

/// Show persisted strategy state.
fn show_status(db_path: &str, limit: usize) -> Result<()> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              RISK REVERSAL STATUS                          ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    if !Path::new(db_path).exists() {
        println!("\n❌ Database not found: {}", db_path);
        println!("   No run has been stored yet, or the database path is incorrect.");
        return Ok(());
    }

    let store = StateStore::new(db_path)?;

    let Some(state) = store.load_state()? else {
        println!("\n❌ No saved state found in database.");
        return Ok(());
    };

    println!("\n📊 Strategy State");
    println!("   ├─ As Of:            {}", state.as_of);
    println!("   ├─ Days Held:        {}", state.days_held);
    match state.last_value {
        Some(value) => println!("   ├─ Last Value:       ${:.2}", value),
        None => println!("   ├─ Last Value:       n/a"),
    }
    if let Some(price) = state.underlying_price {
        println!("   ├─ Underlying:       ${:.2}", price);
    }
    println!(
        "   └─ Saved:            {}",
        state.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    match &state.position {
        Some(position) => {
            println!("\n🔓 Open Risk Reversal");
            println!("   ├─ Short Put:        {}", position.put_symbol);
            println!("   ├─ Long Call:        {}", position.call_symbol);
            println!("   ├─ Expiry:           {}", position.expiry);
            println!("   └─ Opened:           {}", position.opened_on);
        }
        None => println!("\n🔒 No open position"),
    }

    let recent = store.recent_performance(limit)?;
    if !recent.is_empty() {
        println!("\n📉 Recent Performance");
        for record in &recent {
            println!(
                "   ├─ {}: ${:.2} ({:+.4}%) sharpe {:.3} [{}]",
                record.date,
                record.portfolio_value,
                record.daily_return * dec!(100),
                record.sharpe_ratio,
                record.action
            );
        }
    }

    println!();
    Ok(())
}

/// Run a single backtest with the given parameters.
async fn run_backtest(
    data_path: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    cash: Option<Decimal>,
    output_dir: Option<&str>,
    db_path: Option<&str>,
) -> Result<()> {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║              BACKTEST MODE                                 ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    // Load strategy config, CLI flags take precedence
    let mut config = Config::load()?;
    if let Some(cash) = cash {
        config.account.initial_cash = cash;
    }
    if let Some(start) = start {
        config.account.start_date = start;
    }
    if let Some(end) = end {
        config.account.end_date = end;
    }
    config.validate().context("Invalid configuration")?;
    log_config(&config);

    info!("📊 Loading data from: {}", data_path);
    let data_loader = CsvDataLoader::new(data_path, &config.strategy.underlying)?;

    if let Some((data_start, data_end)) = data_loader.available_range() {
        info!("   Data range: {} to {}", data_start, data_end);
    }
    info!("   Trading days: {}", data_loader.len());

    let backtest_config = BacktestConfig {
        output_path: output_dir.map(String::from),
        ..BacktestConfig::from_config(&config)
    };

    let (start, end) = (config.account.start_date, config.account.end_date);
    info!("💰 Initial cash: ${:.2}", backtest_config.initial_cash);
    info!("📅 Period: {} to {}", start, end);

    // Run backtest
    let mut engine = BacktestEngine::new(data_loader, config, backtest_config);
    let result = engine.run(start, end).await?;

    // Print results
    println!("\n{}", result.summary());

    // Save results if output directory specified
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir))?;

        let equity_path = Path::new(dir).join("equity_curve.csv");
        result.equity_to_csv(&equity_path)?;
        info!("📁 Equity curve saved to: {}", equity_path.display());

        let json_path = Path::new(dir).join("backtest_result.json");
        result.save_json(&json_path)?;
        info!("📁 Full result saved to: {}", json_path.display());
    }

    if let Some(db_path) = db_path {
        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }

        let store = StateStore::new(db_path)?;
        if store.has_state()? {
            warn!(db = %db_path, "Replacing previously stored run");
        }
        store.clear_all()?;

        let as_of = result
            .daily_performance
            .last()
            .map(|r| r.date)
            .unwrap_or(result.end_date);
        store.save_state(&PersistedState::from_strategy(as_of, &result.final_state))?;
        store.record_performance_batch(&result.daily_performance)?;
        info!(
            db = %db_path,
            rows = result.daily_performance.len(),
            "💾 Strategy state stored"
        );
    }

    Ok(())
}
