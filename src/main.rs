use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use perpbot::api::{BinanceFuturesClient, TelegramNotifier};
use perpbot::execution::{
    CycleContext, CycleReport, MarketGateway, PaperGateway, Scheduler, SymbolOutcome,
};
use perpbot::notify::{LogNotifier, Notifier};
use perpbot::AppConfig;

#[derive(Parser)]
#[command(name = "perpbot", about = "Periodic bracket-order bot for Binance USD-M perpetuals")]
struct Cli {
    /// Path to a TOML config file. Defaults to ./perpbot.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log order writes instead of sending them.
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,

    /// Restrict trading to these symbols (comma separated).
    #[arg(long, global = true, value_delimiter = ',')]
    symbols: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run cycles on the configured interval until Ctrl+C (default).
    Run,
    /// Run a single cycle and print what happened.
    Once,
    /// Print the symbols that would be traded.
    Universe,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if !cli.symbols.is_empty() {
        config.universe.allow_list = cli.symbols.clone();
    }

    let gateway = build_gateway(&config, cli.dry_run)?;
    let notifier = build_notifier(&config)?;
    let driver = config.build_driver();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Universe => {
            let symbols = driver
                .universe()
                .resolve(gateway.as_ref(), driver.call_timeout())
                .await
                .context("Failed to resolve symbol universe")?;
            for symbol in &symbols {
                println!("{}", symbol);
            }
            tracing::info!("✅ {} eligible symbols", symbols.len());
        }
        Commands::Once => {
            let report = driver.run_cycle(&CycleContext::new(gateway, notifier)).await;
            print_report(&report);
            if let Some(e) = report.universe_error {
                return Err(e).context("Cycle aborted");
            }
        }
        Commands::Run => {
            tracing::info!("🚀 PerpBot starting");
            tracing::info!("\n📊 Configuration:");
            tracing::info!("  Timeframe: {}", config.trading.timeframe);
            tracing::info!("  Rule set: {:?}", config.strategy.kind);
            tracing::info!("  Notional per entry: {:.2}", config.orders.notional);
            tracing::info!("  Interval: every {}s", config.scheduler.interval_secs);
            tracing::info!("  Dry run: {}", cli.dry_run);

            let scheduler = Scheduler::new(driver, config.scheduler.clone());
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            let scheduler_task = tokio::spawn(async move {
                scheduler.run(gateway, notifier, shutdown_rx).await;
            });

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");

            shutdown_tx.send(true).ok();
            scheduler_task.await.context("Scheduler task panicked")?;
            tracing::info!("👋 PerpBot stopped");
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("perpbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_gateway(config: &AppConfig, dry_run: bool) -> Result<Arc<dyn MarketGateway>> {
    let client = BinanceFuturesClient::new(config.exchange.clone())?;

    if dry_run {
        tracing::info!("[DRY RUN] Orders will be logged, not sent");
        return Ok(Arc::new(PaperGateway::new(Arc::new(client))));
    }

    if !client.has_credentials() {
        anyhow::bail!("BINANCE_API_KEY and BINANCE_API_SECRET are required unless --dry-run is set");
    }
    Ok(Arc::new(client))
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    if config.telegram.is_configured() {
        tracing::info!("Telegram notifications enabled");
        return Ok(Arc::new(TelegramNotifier::new(&config.telegram)?));
    }
    tracing::warn!("Telegram not configured, notifications go to the log only");
    Ok(Arc::new(LogNotifier))
}

fn print_report(report: &CycleReport) {
    if let Some(e) = &report.universe_error {
        println!("Universe unavailable: {}", e);
        return;
    }

    for entry in &report.symbols {
        match &entry.outcome {
            SymbolOutcome::NoSignal => println!("{:<14} no signal", entry.symbol),
            SymbolOutcome::Bracket(outcome) => {
                println!("{:<14} {:?}", entry.symbol, outcome.state());
                println!("{}", outcome.summary());
            }
            SymbolOutcome::Skipped(reason) => println!("{:<14} skipped: {}", entry.symbol, reason),
            SymbolOutcome::Failed(e) => println!("{:<14} failed: {}", entry.symbol, e),
        }
    }
    println!(
        "{} symbols, {} brackets, {} failures",
        report.symbols.len(),
        report.brackets(),
        report.failures()
    );
}
