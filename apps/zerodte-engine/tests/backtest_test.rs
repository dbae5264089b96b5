//! Backtest Integration Tests
//!
//! Replays the `fly_session.json` fixture through the in-memory market data
//! adapter and the backtest runner.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use zerodte_engine::application::services::{BacktestRunner, TradePipeline};
use zerodte_engine::config::{StrategyConfig, UnderlyingConfig};
use zerodte_engine::domain::ledger::{CommissionModel, TradeStatus};
use zerodte_engine::domain::session::{SessionHours, TradingCalendar};
use zerodte_engine::domain::signal::SignalParams;
use zerodte_engine::domain::trade::StructureKind;
use zerodte_engine::infrastructure::market_data::InMemoryMarketData;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

fn market() -> Arc<InMemoryMarketData> {
    Arc::new(InMemoryMarketData::from_file(fixture_path("fly_session.json")).expect("fixture loads"))
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
}

fn fly_step() -> StrategyConfig {
    StrategyConfig {
        name: "fly".to_string(),
        kind: StructureKind::IronButterfly,
        quantity: 1,
        signal: SignalParams {
            consecutive_candles: 3,
            volume_threshold_fraction: 0.5,
            lookback_candles: 4,
            avg_range_candles: 3,
            range_threshold_fraction: 0.8,
            ..SignalParams::default()
        },
        min_distance: dec!(10),
        max_distance: dec!(50),
        distance_step: dec!(10),
        target_ratio: dec!(1),
        ratio_tolerance: dec!(0.05),
        short_offset: Decimal::ZERO,
        wing_floor: None,
        max_spread_pct: None,
        hedge_exit: None,
    }
}

fn runner(steps: Vec<StrategyConfig>, commission: CommissionModel) -> BacktestRunner {
    let pipeline = TradePipeline::new(market(), UnderlyingConfig::default(), Duration::from_millis(500));
    BacktestRunner::new(
        pipeline,
        steps,
        true,
        TradingCalendar::default(),
        SessionHours::default(),
        dec!(100000),
        commission,
    )
}

#[tokio::test]
async fn test_fly_settles_at_intrinsic_value() {
    let report = runner(vec![fly_step()], CommissionModel::default())
        .run(date(17), date(20))
        .await;

    // 17th has data, 18th-19th are a weekend, 20th has no bars
    assert_eq!(report.days_run, 1);
    assert_eq!(report.days_skipped.len(), 1);
    assert_eq!(report.days_skipped[0].date, date(20));

    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!(trade.structure, StructureKind::IronButterfly);
    assert_eq!(trade.status, TradeStatus::Closed);
    assert_eq!(trade.legs.len(), 4);
    assert!(trade.legs.contains_key("SPXW251017P05970000"));
    assert!(trade.legs.contains_key("SPXW251017C06030000"));

    // credit 15.80 at distance 30, short call 1.00 in the money at 6001,
    // four legs of entry commission
    assert_eq!(trade.realized_pnl, dec!(1477.40));
    assert_eq!(report.final_equity, dec!(101477.40));
    assert_eq!(report.statistics.total_trades, 1);
    assert_eq!(report.statistics.winning_trades, 1);
    assert_eq!(report.statistics.total_commissions, dec!(2.60));
    assert_eq!(report.daily_pnl.len(), 1);
    assert_eq!(report.daily_pnl[0].pnl, dec!(1477.40));
}

#[tokio::test]
async fn test_zero_commission_books_gross_pnl() {
    let report = runner(vec![fly_step()], CommissionModel::zero()).run(date(17), date(17)).await;
    assert_eq!(report.trades[0].realized_pnl, dec!(1480));
}

#[tokio::test]
async fn test_dependent_step_waits_for_predecessor() {
    // the condor never finds quotes, so the dependent fly never runs
    let mut condor = fly_step();
    condor.name = "condor".to_string();
    condor.kind = StructureKind::IronCondor;
    condor.short_offset = dec!(500);

    let report = runner(vec![condor, fly_step()], CommissionModel::default())
        .run(date(17), date(17))
        .await;
    assert!(report.trades.is_empty());
    assert_eq!(report.final_equity, dec!(100000));
}

#[tokio::test]
async fn test_report_serializes() {
    let report = runner(vec![fly_step()], CommissionModel::default())
        .run(date(17), date(17))
        .await;
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["trades"][0]["structure"], "iron_butterfly");
    assert_eq!(json["trades"][0]["status"], "CLOSED");
}
