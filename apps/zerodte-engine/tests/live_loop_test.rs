//! Live Loop Integration Tests
//!
//! Drives `LiveOrchestrator::tick` by hand with a manual clock, the paper
//! broker and the `fly_session.json` fixture.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zerodte_engine::application::ports::BrokerPort;
use zerodte_engine::application::services::{
    ControlCommand, ExecutionOutcome, LiveOrchestrator, LiveSettings, TickOutcome, TradePipeline,
};
use zerodte_engine::config::{HedgeExitConfig, StrategyConfig, UnderlyingConfig};
use zerodte_engine::domain::guardrails::{ApprovalMode, ApprovalStatus, GuardrailSystem, KillReason, RiskLimits};
use zerodte_engine::domain::ledger::{CommissionModel, TradeStatus};
use zerodte_engine::domain::market_data::{OptionContract, OptionRight, Quote};
use zerodte_engine::domain::session::{SessionHours, TradingCalendar};
use zerodte_engine::domain::shared::ManualClock;
use zerodte_engine::domain::signal::SignalParams;
use zerodte_engine::domain::trade::StructureKind;
use zerodte_engine::error::ErrorCode;
use zerodte_engine::infrastructure::broker::PaperBroker;
use zerodte_engine::infrastructure::market_data::InMemoryMarketData;

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 17)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
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

struct Harness {
    clock: Arc<ManualClock>,
    broker: Arc<PaperBroker>,
    orchestrator: LiveOrchestrator,
}

fn harness(mode: ApprovalMode, limits: RiskLimits, max_reconnect_attempts: u32) -> Harness {
    harness_with(vec![fly_step()], mode, limits, max_reconnect_attempts).0
}

fn harness_with(
    strategies: Vec<StrategyConfig>,
    mode: ApprovalMode,
    limits: RiskLimits,
    max_reconnect_attempts: u32,
) -> (Harness, Arc<InMemoryMarketData>) {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures/fly_session.json");
    let market = Arc::new(InMemoryMarketData::from_file(path).expect("fixture loads"));

    let clock = Arc::new(ManualClock::new(at(9, 34, 30)));
    let broker = Arc::new(PaperBroker::new());
    let (guardrails, events) = GuardrailSystem::new(limits, mode, clock.clone());

    let settings = LiveSettings {
        strategies,
        sequence_dependent: true,
        hours: SessionHours::default(),
        calendar: TradingCalendar::default(),
        poll_interval: Duration::from_millis(10),
        reconnect_delay: Duration::from_millis(1),
        max_reconnect_attempts,
        starting_capital: dec!(100000),
        commission: CommissionModel::default(),
    };
    let pipeline = TradePipeline::new(market.clone(), UnderlyingConfig::default(), Duration::from_millis(500));
    let orchestrator =
        LiveOrchestrator::new(settings, pipeline, broker.clone(), guardrails, events, clock.clone());

    let harness = Harness {
        clock,
        broker,
        orchestrator,
    };
    (harness, market)
}

fn timed_auto() -> ApprovalMode {
    ApprovalMode::TimedAuto {
        delay: chrono::Duration::seconds(30),
    }
}

fn fly_limits() -> RiskLimits {
    RiskLimits {
        sequence: vec!["fly".to_string()],
        ..RiskLimits::default()
    }
}

#[tokio::test]
async fn test_full_session_with_timed_auto_approval() {
    let Harness {
        clock,
        broker,
        mut orchestrator,
    } = harness(timed_auto(), fly_limits(), 3);

    // kill switch starts engaged
    let outcome = orchestrator.tick().await.unwrap();
    assert!(matches!(outcome, TickOutcome::Skipped { ref reason } if reason.contains("kill switch")));

    orchestrator.handle_command(ControlCommand::Resume).await;
    let TickOutcome::Submitted { step, approval_id } = orchestrator.tick().await.unwrap() else {
        panic!("expected a submission");
    };
    assert_eq!(step, "fly");

    // step is in flight, nothing new is submitted
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::NoTrade);

    clock.advance(chrono::Duration::seconds(10));
    assert_eq!(orchestrator.guardrails().approvals.tick(), 0);
    assert!(orchestrator.drain_approval_events().await.is_empty());

    clock.advance(chrono::Duration::seconds(20));
    assert_eq!(orchestrator.guardrails().approvals.tick(), 1);
    let outcomes = orchestrator.drain_approval_events().await;
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], ExecutionOutcome::Filled { .. }));
    assert_eq!(
        orchestrator.guardrails().approvals.get(approval_id).unwrap().status,
        ApprovalStatus::AutoSent
    );

    let orders = broker.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].combo.legs.len(), 4);
    assert_eq!(orders[0].order.limit_price, dec!(15.80));

    let counters = orchestrator.guardrails().risk_limits.snapshot();
    assert_eq!(counters.trade_count, 1);
    assert_eq!(counters.contracts_traded, 4);
    assert_eq!(counters.open_positions, 1);
    assert_eq!(orchestrator.ledger().open_count(), 1);

    // executed steps are not evaluated again
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::NoTrade);

    clock.set(at(16, 0, 0));
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::SessionClosed);

    let trade = &orchestrator.ledger().trades()[0];
    assert_eq!(trade.status, TradeStatus::Closed);
    assert_eq!(trade.realized_pnl(), dec!(1477.40));

    let counters = orchestrator.guardrails().risk_limits.snapshot();
    assert_eq!(counters.open_positions, 0);
    assert_eq!(counters.realized_pnl, dec!(1477.40));
}

#[tokio::test]
async fn test_hedge_partial_exit_reaches_risk_counters() {
    let hedge = StrategyConfig {
        name: "hedge".to_string(),
        kind: StructureKind::Straddle,
        quantity: 2,
        hedge_exit: Some(HedgeExitConfig {
            profit_multiple: dec!(1.5),
            exit_fraction: dec!(0.5),
        }),
        ..fly_step()
    };
    let limits = RiskLimits {
        sequence: vec!["hedge".to_string()],
        ..RiskLimits::default()
    };
    let (
        Harness {
            clock,
            broker,
            mut orchestrator,
        },
        market,
    ) = harness_with(vec![hedge], ApprovalMode::Immediate, limits, 3);
    orchestrator.handle_command(ControlCommand::Resume).await;

    assert!(matches!(orchestrator.tick().await.unwrap(), TickOutcome::Submitted { .. }));
    let outcomes = orchestrator.drain_approval_events().await;
    assert!(matches!(outcomes.as_slice(), [ExecutionOutcome::Filled { .. }]));
    assert_eq!(orchestrator.guardrails().risk_limits.snapshot().realized_pnl, Decimal::ZERO);

    // The 6000 call doubles; half of its two contracts sell at the bid.
    clock.set(at(10, 0, 0));
    let call = OptionContract::new("SPXW", at(10, 0, 0).date(), OptionRight::Call, dec!(6000));
    market.insert_quote(
        call.symbol(),
        Quote::new(dec!(20.00), dec!(20.20), dec!(20.10), 0, at(10, 0, 0)),
    );
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::NoTrade);

    let orders = broker.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1].order.quantity, 1);

    let trade = &orchestrator.ledger().trades()[0];
    assert_eq!(trade.status, TradeStatus::Open);
    assert_eq!(trade.gross_pnl, dec!(990));
    let counters = orchestrator.guardrails().risk_limits.snapshot();
    assert_eq!(counters.realized_pnl, trade.realized_pnl());
    assert_eq!(counters.open_positions, 1);

    // Settlement reports only the remainder.
    clock.set(at(16, 0, 0));
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::SessionClosed);
    let trade = &orchestrator.ledger().trades()[0];
    assert_eq!(trade.status, TradeStatus::Closed);
    let counters = orchestrator.guardrails().risk_limits.snapshot();
    assert_eq!(counters.realized_pnl, trade.realized_pnl());
    assert_eq!(counters.open_positions, 0);
}

#[tokio::test]
async fn test_cancel_before_deadline_never_sends() {
    let Harness {
        clock,
        broker,
        mut orchestrator,
    } = harness(timed_auto(), fly_limits(), 3);
    orchestrator.handle_command(ControlCommand::Resume).await;

    let TickOutcome::Submitted { approval_id, .. } = orchestrator.tick().await.unwrap() else {
        panic!("expected a submission");
    };

    clock.advance(chrono::Duration::seconds(10));
    orchestrator.handle_command(ControlCommand::Cancel(approval_id)).await;
    assert!(orchestrator.drain_approval_events().await.is_empty());

    clock.advance(chrono::Duration::seconds(30));
    assert_eq!(orchestrator.guardrails().approvals.tick(), 0);
    assert!(broker.orders().is_empty());

    // cancelled step is eligible again
    assert!(matches!(orchestrator.tick().await.unwrap(), TickOutcome::Submitted { .. }));
}

#[tokio::test]
async fn test_kill_switch_checked_again_before_send() {
    let Harness {
        broker,
        mut orchestrator,
        ..
    } = harness(ApprovalMode::Manual { timeout: None }, fly_limits(), 3);
    orchestrator.handle_command(ControlCommand::Resume).await;

    let TickOutcome::Submitted { approval_id, .. } = orchestrator.tick().await.unwrap() else {
        panic!("expected a submission");
    };

    orchestrator
        .handle_command(ControlCommand::Kill("operator halt".to_string()))
        .await;
    orchestrator.handle_command(ControlCommand::Approve(approval_id)).await;

    let outcomes = orchestrator.drain_approval_events().await;
    assert!(matches!(outcomes.as_slice(), [ExecutionOutcome::Blocked { .. }]));
    assert!(broker.orders().is_empty());
    assert_eq!(orchestrator.guardrails().risk_limits.snapshot().trade_count, 0);
}

#[tokio::test]
async fn test_guardrail_refusal_is_declined_with_reasons() {
    let limits = RiskLimits {
        max_contracts_per_trade: 2,
        ..fly_limits()
    };
    let Harness { mut orchestrator, .. } = harness(ApprovalMode::Immediate, limits, 3);
    orchestrator.handle_command(ControlCommand::Resume).await;

    let TickOutcome::Declined { step, reasons } = orchestrator.tick().await.unwrap() else {
        panic!("expected a decline");
    };
    assert_eq!(step, "fly");
    assert_eq!(reasons.len(), 1);
    assert!(orchestrator.guardrails().approvals.pending().is_empty());
}

#[tokio::test]
async fn test_broker_rejection_leaves_counters_untouched() {
    let Harness {
        broker,
        mut orchestrator,
        ..
    } = harness(ApprovalMode::Immediate, fly_limits(), 3);
    orchestrator.handle_command(ControlCommand::Resume).await;
    broker.reject_next("insufficient buying power");

    assert!(matches!(orchestrator.tick().await.unwrap(), TickOutcome::Submitted { .. }));
    let outcomes = orchestrator.drain_approval_events().await;
    assert_eq!(
        outcomes,
        vec![ExecutionOutcome::Rejected {
            reason: "insufficient buying power".to_string()
        }]
    );

    let counters = orchestrator.guardrails().risk_limits.snapshot();
    assert_eq!(counters.trade_count, 0);
    assert_eq!(counters.contracts_traded, 0);
    assert_eq!(orchestrator.ledger().open_count(), 0);
}

#[tokio::test]
async fn test_disconnect_recovers_with_switch_engaged() {
    let Harness {
        broker,
        mut orchestrator,
        ..
    } = harness(ApprovalMode::Immediate, fly_limits(), 3);
    orchestrator.handle_command(ControlCommand::Resume).await;

    broker.set_reconnect_failures(1);
    broker.disconnect("socket reset");

    let outcome = orchestrator.tick().await.unwrap();
    assert!(matches!(outcome, TickOutcome::Skipped { .. }));
    assert!(broker.is_connected());

    let switch = orchestrator.guardrails().kill_switch.snapshot();
    assert!(switch.engaged);
    assert_eq!(switch.reason, Some(KillReason::Disconnect));
}

#[tokio::test]
async fn test_reconnect_exhaustion_is_fatal() {
    let Harness {
        broker,
        mut orchestrator,
        ..
    } = harness(ApprovalMode::Immediate, fly_limits(), 2);
    orchestrator.handle_command(ControlCommand::Resume).await;

    broker.set_reconnect_failures(5);
    broker.disconnect("socket reset");

    let err = orchestrator.tick().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConnectionLost);
    assert!(orchestrator.guardrails().kill_switch.is_engaged());
}

#[tokio::test]
async fn test_cancel_orders_allowed_while_engaged() {
    let Harness {
        broker,
        mut orchestrator,
        ..
    } = harness(ApprovalMode::Immediate, fly_limits(), 3);
    orchestrator.handle_command(ControlCommand::Resume).await;
    broker.hold_orders(true);

    assert!(matches!(orchestrator.tick().await.unwrap(), TickOutcome::Submitted { .. }));
    orchestrator.drain_approval_events().await;

    orchestrator
        .handle_command(ControlCommand::Kill("flatten".to_string()))
        .await;
    orchestrator.handle_command(ControlCommand::CancelOrders).await;

    assert!(broker.orders().iter().all(|o| o.status.to_string() == "CANCELLED"));
}

#[tokio::test]
async fn test_run_stops_at_session_close() {
    let Harness {
        clock,
        mut orchestrator,
        ..
    } = harness(ApprovalMode::Immediate, fly_limits(), 3);
    orchestrator.handle_command(ControlCommand::Resume).await;
    assert!(matches!(orchestrator.tick().await.unwrap(), TickOutcome::Submitted { .. }));
    orchestrator.drain_approval_events().await;
    clock.set(at(16, 0, 0));

    let (_tx, rx) = mpsc::unbounded_channel();
    let summary = tokio::time::timeout(Duration::from_secs(5), orchestrator.run(rx, CancellationToken::new()))
        .await
        .expect("loop stops at close")
        .unwrap();

    assert_eq!(summary.trades.len(), 1);
    assert_eq!(summary.statistics.total_pnl, dec!(1477.40));
}

#[tokio::test]
async fn test_run_stops_on_cancellation() {
    let Harness { orchestrator, .. } = harness(timed_auto(), fly_limits(), 3);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let (_tx, rx) = mpsc::unbounded_channel();
    let summary = orchestrator.run(rx, shutdown).await.unwrap();
    assert!(summary.trades.is_empty());
    assert!(summary.kill_switch.engaged);
}
