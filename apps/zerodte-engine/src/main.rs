//! zerodte-engine Binary
//!
//! Runs a backtest over a JSON market-data file, or a paper session driving
//! the live loop against the paper broker.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin zerodte-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ZERODTE_CONFIG`: config file path (default: config.yaml)
//! - `RUST_LOG`: extra filter directives
//!
//! # Paper control commands (stdin)
//!
//! `approve <id>`, `reject <id> [reason]`, `cancel <id>`, `kill [reason]`,
//! `resume`, `cancel-orders`, `status`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zerodte_engine::application::services::{
    BacktestRunner, ControlCommand, LiveOrchestrator, LiveSettings, TradePipeline,
};
use zerodte_engine::config::{Config, load_config};
use zerodte_engine::domain::guardrails::GuardrailSystem;
use zerodte_engine::domain::shared::SystemClock;
use zerodte_engine::infrastructure::broker::PaperBroker;
use zerodte_engine::infrastructure::market_data::InMemoryMarketData;
use zerodte_engine::observability::init_tracing;

/// Default configuration path.
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    let path = std::env::var("ZERODTE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Some(&path)).with_context(|| format!("loading {path}"))?;
    init_tracing(&config.observability.logging)?;

    tracing::info!(
        config = %path,
        mode = %config.environment.mode,
        underlying = %config.underlying.symbol,
        steps = config.strategies.len(),
        "Starting zerodte-engine"
    );

    let market = Arc::new(
        InMemoryMarketData::from_file(&config.backtest.data_path)
            .with_context(|| format!("loading market data from {}", config.backtest.data_path))?,
    );

    if config.environment.is_backtest() {
        run_backtest(&config, market).await
    } else {
        run_paper(&config, market).await
    }
}

/// Load .env from the working directory, if present.
fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("ignoring unreadable .env: {e}");
    }
}

fn pipeline(config: &Config, market: Arc<InMemoryMarketData>) -> TradePipeline {
    TradePipeline::new(
        market,
        config.underlying.clone(),
        Duration::from_millis(config.session.quote_timeout_ms),
    )
}

async fn run_backtest(config: &Config, market: Arc<InMemoryMarketData>) -> Result<()> {
    let dates = market.dates(&config.underlying.symbol);
    let (Some(first), Some(last)) = (dates.first().copied(), dates.last().copied()) else {
        bail!("no {} bars in {}", config.underlying.symbol, config.backtest.data_path);
    };
    let start = config.backtest.start_date.unwrap_or(first);
    let end = config.backtest.end_date.unwrap_or(last);

    let runner = BacktestRunner::new(
        pipeline(config, market),
        config.strategies.clone(),
        config.sequence_dependent,
        config.session.calendar(),
        config.session.hours(),
        config.backtest.starting_capital,
        config.backtest.commission,
    );
    let report = runner.run(start, end).await;

    let stats = &report.statistics;
    tracing::info!(
        days_run = report.days_run,
        days_skipped = report.days_skipped.len(),
        trades = stats.total_trades,
        win_rate = ?stats.win_rate,
        profit_factor = ?stats.profit_factor,
        total_pnl = %stats.total_pnl,
        max_drawdown = %stats.max_drawdown,
        sharpe = ?stats.sharpe_ratio,
        final_equity = %report.final_equity,
        "Backtest complete"
    );

    if let Some(report_path) = &config.backtest.report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_path, json).with_context(|| format!("writing {report_path}"))?;
        tracing::info!(path = %report_path, "Backtest report written");
    }
    Ok(())
}

async fn run_paper(config: &Config, market: Arc<InMemoryMarketData>) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let broker = Arc::new(PaperBroker::new());
    let (guardrails, approval_events) = GuardrailSystem::new(config.risk_limits(), config.approval.to_mode(), clock.clone());

    let settings = LiveSettings {
        strategies: config.strategies.clone(),
        sequence_dependent: config.sequence_dependent,
        hours: config.session.hours(),
        calendar: config.session.calendar(),
        poll_interval: Duration::from_secs(config.session.poll_interval_secs),
        reconnect_delay: config.connection.reconnect_delay(),
        max_reconnect_attempts: config.connection.max_reconnect_attempts,
        starting_capital: config.backtest.starting_capital,
        commission: config.backtest.commission,
    };
    let orchestrator = LiveOrchestrator::new(settings, pipeline(config, market), broker, guardrails, approval_events, clock);

    let shutdown = CancellationToken::new();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_control(control_tx, shutdown.clone()));
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    tracing::warn!("Kill switch starts engaged; send 'resume' to begin trading");
    let summary = orchestrator.run(control_rx, shutdown).await?;

    tracing::info!(
        ticks = summary.ticks,
        trades = summary.statistics.total_trades,
        total_pnl = %summary.statistics.total_pnl,
        kill_switch_engaged = summary.kill_switch.engaged,
        "Paper session stopped"
    );
    Ok(())
}

/// Forward parsed stdin lines to the live loop.
async fn read_control(tx: mpsc::UnboundedSender<ControlCommand>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match ControlCommand::parse(&line) {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        return;
                    }
                }
                Err(e) => tracing::warn!(input = %line, error = %e, "Bad control command"),
            },
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Control input failed");
                return;
            }
        }
    }
}

/// Cancel on Ctrl-C.
async fn shutdown_on_signal(shutdown: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
    shutdown.cancel();
}
