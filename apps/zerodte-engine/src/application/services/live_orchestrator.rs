//! Live polling loop.
//!
//! One owned task drives everything through `tokio::select!`: the poll
//! interval, a 1 Hz approval tick, approval gate events, operator commands,
//! broker notifications and a cancellation token. Each poll runs preflight
//! (connected, kill switch disengaged, within hours), loads today's bars, and
//! walks the eligible sequence steps through the pipeline, `check_all` and
//! the approval gate. Orders go out only when the gate emits an execution
//! event, after one more kill switch check.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::connection_supervisor::ConnectionSupervisor;
use super::hedge::HedgeMonitor;
use super::pipeline::TradePipeline;
use super::sequence::SequenceState;
use crate::application::ports::{BrokerEvent, BrokerPort, ComboContract, ComboOrder};
use crate::config::StrategyConfig;
use crate::domain::guardrails::{
    ApprovalEvent, GuardrailSystem, KillReason, KillSwitchState, PendingApproval, PositionExit, RiskCounters,
};
use crate::domain::ledger::{CommissionModel, LedgerStatistics, PositionLedger, TradeRecord};
use crate::domain::market_data::OptionAction;
use crate::domain::session::{SessionHours, TradingCalendar};
use crate::domain::shared::Clock;
use crate::error::EngineError;

/// Actor recorded for control-surface transitions.
pub const OPERATOR_ACTOR: &str = "operator";

/// Approval gate tick period.
const APPROVAL_TICK: Duration = Duration::from_secs(1);

/// Operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Approve a pending trade.
    Approve(Uuid),
    /// Reject a pending trade.
    Reject {
        /// Approval id.
        id: Uuid,
        /// Reason recorded on the entry.
        reason: String,
    },
    /// Cancel a pending trade.
    Cancel(Uuid),
    /// Engage the kill switch.
    Kill(String),
    /// Disengage the kill switch.
    Resume,
    /// Cancel every working broker order. Allowed while the switch is engaged.
    CancelOrders,
    /// Log a status summary.
    Status,
}

impl ControlCommand {
    /// Parse one command line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| "empty command".to_string())?;
        let rest: Vec<&str> = parts.collect();
        let id = |s: Option<&&str>| -> Result<Uuid, String> {
            let s = s.ok_or_else(|| format!("{verb} needs an approval id"))?;
            Uuid::parse_str(s).map_err(|e| format!("bad approval id {s}: {e}"))
        };

        match verb.to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve(id(rest.first())?)),
            "reject" => Ok(Self::Reject {
                id: id(rest.first())?,
                reason: if rest.len() > 1 {
                    rest[1..].join(" ")
                } else {
                    "rejected by operator".to_string()
                },
            }),
            "cancel" => Ok(Self::Cancel(id(rest.first())?)),
            "kill" => Ok(Self::Kill(if rest.is_empty() {
                "manual".to_string()
            } else {
                rest.join(" ")
            })),
            "resume" => Ok(Self::Resume),
            "cancel-orders" => Ok(Self::CancelOrders),
            "status" => Ok(Self::Status),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Preflight failed or data was missing.
    Skipped {
        /// Why.
        reason: String,
    },
    /// No step produced a trade.
    NoTrade,
    /// A trade was built but a guardrail refused it.
    Declined {
        /// Step name.
        step: String,
        /// Failed check messages.
        reasons: Vec<String>,
    },
    /// A trade went to the approval gate.
    Submitted {
        /// Step name.
        step: String,
        /// Approval id.
        approval_id: Uuid,
    },
    /// Session close actions ran; the loop stops.
    SessionClosed,
}

/// Result of an approved trade reaching the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Filled and recorded.
    Filled {
        /// Ledger trade id.
        ledger_id: Uuid,
        /// Broker order id.
        order_id: Option<String>,
    },
    /// Kill switch engaged at send time.
    Blocked {
        /// Why.
        reason: String,
    },
    /// Broker refused the order. Counters untouched.
    Rejected {
        /// Broker text.
        reason: String,
    },
    /// Broker call failed.
    Failed {
        /// Error text.
        error: String,
    },
}

/// Static settings for the live loop.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// Ordered strategy steps.
    pub strategies: Vec<StrategyConfig>,
    /// Step k requires step k-1.
    pub sequence_dependent: bool,
    /// Session hours.
    pub hours: SessionHours,
    /// Trading calendar.
    pub calendar: TradingCalendar,
    /// Poll interval.
    pub poll_interval: Duration,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Reconnect attempts before halting.
    pub max_reconnect_attempts: u32,
    /// Ledger starting capital.
    pub starting_capital: Decimal,
    /// Ledger commissions.
    pub commission: CommissionModel,
}

/// State at loop exit.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSummary {
    /// Polls run.
    pub ticks: u64,
    /// Ledger trades.
    pub trades: Vec<TradeRecord>,
    /// Ledger statistics.
    pub statistics: LedgerStatistics,
    /// Kill switch at exit.
    pub kill_switch: KillSwitchState,
    /// Risk counters at exit.
    pub counters: RiskCounters,
}

/// The live orchestration task.
pub struct LiveOrchestrator {
    pipeline: TradePipeline,
    broker: Arc<dyn BrokerPort>,
    guardrails: GuardrailSystem,
    approval_events: mpsc::UnboundedReceiver<ApprovalEvent>,
    clock: Arc<dyn Clock>,
    supervisor: ConnectionSupervisor,
    strategies: Vec<StrategyConfig>,
    hours: SessionHours,
    calendar: TradingCalendar,
    poll_interval: Duration,
    sequence: SequenceState,
    ledger: PositionLedger,
    hedges: HedgeMonitor,
    // Realized P&L already sent to the risk counters, per open ledger trade.
    reported_pnl: HashMap<Uuid, Decimal>,
    session_closed: bool,
    ticks: u64,
}

impl std::fmt::Debug for LiveOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveOrchestrator")
            .field("pipeline", &self.pipeline)
            .field("poll_interval", &self.poll_interval)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl LiveOrchestrator {
    /// Wire the loop. `approval_events` is the receiver returned with `guardrails`.
    #[must_use]
    pub fn new(
        settings: LiveSettings,
        pipeline: TradePipeline,
        broker: Arc<dyn BrokerPort>,
        guardrails: GuardrailSystem,
        approval_events: mpsc::UnboundedReceiver<ApprovalEvent>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&broker),
            Arc::clone(&guardrails.kill_switch),
            settings.reconnect_delay,
            settings.max_reconnect_attempts,
        );
        let steps = settings.strategies.iter().map(|s| s.name.clone()).collect();
        Self {
            pipeline: pipeline.with_wing_narrowing(true),
            broker,
            guardrails,
            approval_events,
            clock,
            supervisor,
            sequence: SequenceState::new(steps, settings.sequence_dependent),
            strategies: settings.strategies,
            hours: settings.hours,
            calendar: settings.calendar,
            poll_interval: settings.poll_interval,
            ledger: PositionLedger::new(settings.starting_capital, settings.commission),
            hedges: HedgeMonitor::new(),
            reported_pnl: HashMap::new(),
            session_closed: false,
            ticks: 0,
        }
    }

    /// Run until session close, cancellation or a fatal error.
    pub async fn run(
        mut self,
        mut control: mpsc::UnboundedReceiver<ControlCommand>,
        shutdown: CancellationToken,
    ) -> Result<LiveSummary, EngineError> {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut approval_tick = tokio::time::interval(APPROVAL_TICK);
        approval_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broker_events = self.broker.events();
        let mut control_open = true;
        let mut broker_open = true;

        tracing::info!(
            steps = self.strategies.len(),
            poll_interval_secs = self.poll_interval.as_secs(),
            mode = ?self.guardrails.approvals.mode(),
            "Live loop started"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = poll.tick() => {
                    if self.tick().await? == TickOutcome::SessionClosed {
                        break;
                    }
                }
                _ = approval_tick.tick() => {
                    self.guardrails.approvals.tick();
                }
                Some(event) = self.approval_events.recv() => {
                    self.handle_approval(event).await;
                }
                cmd = control.recv(), if control_open => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => control_open = false,
                },
                event = broker_events.recv(), if broker_open => match event {
                    Ok(BrokerEvent::Disconnected { reason }) => {
                        self.supervisor.recover(&reason).await?;
                    }
                    Ok(other) => tracing::debug!(event = ?other, "Broker event"),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Broker events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Broker event stream closed");
                        broker_open = false;
                    }
                },
            }
        }

        Ok(self.summary())
    }

    /// One poll of the decision pipeline.
    pub async fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        self.ticks += 1;
        let now = self.clock.now();

        if self.hours.is_closed_for_day(now) {
            self.close_session(now).await;
            return Ok(TickOutcome::SessionClosed);
        }

        if !self.broker.is_connected() {
            self.supervisor.recover("broker reported disconnected").await?;
            return Ok(skipped("broker reconnected, kill switch engaged"));
        }
        if self.guardrails.kill_switch.is_engaged() {
            let reason = self
                .guardrails
                .kill_switch
                .reason()
                .map_or_else(|| "unknown".to_string(), |r| r.to_string());
            return Ok(skipped(format!("kill switch engaged ({reason})")));
        }
        if !self.calendar.is_trading_day(now.date()) || !self.hours.contains(now) {
            return Ok(skipped("outside trading hours"));
        }

        self.sequence.reset_for(now.date());
        let session = match self.pipeline.load_session(now.date()).await {
            Ok(session) => session.until(now),
            Err(e) => {
                let err = EngineError::from(e);
                tracing::warn!(error = %err, "Bars unavailable, skipping tick");
                return Ok(skipped(err.to_string()));
            }
        };
        let Some(index) = session.len().checked_sub(1) else {
            return Ok(skipped("no bars yet"));
        };

        if !self.hedges.is_empty() {
            self.check_hedges(now).await;
        }

        let eligible: Vec<String> = self.sequence.eligible().into_iter().map(str::to_string).collect();
        let mut outcome = TickOutcome::NoTrade;
        for name in eligible {
            let Some(step) = self.strategies.iter().find(|s| s.name == name) else {
                continue;
            };
            if index < step.signal.warmup_bars() {
                continue;
            }
            let Some(intent) = self.pipeline.evaluate_tick(step, &session, index).await else {
                continue;
            };

            let descriptor = intent.descriptor;
            let vix = self.pipeline.vix(now).await;
            let report = self.guardrails.risk_limits.check_all(
                descriptor.total_contracts(),
                descriptor.max_loss(),
                &step.name,
                vix,
            );
            if !report.passed {
                outcome = TickOutcome::Declined {
                    step: name,
                    reasons: report.reasons(),
                };
                continue;
            }

            let approval_id = self.guardrails.approvals.submit(descriptor, name.clone());
            self.sequence.mark_in_flight(&name);
            tracing::info!(step = %name, approval_id = %approval_id, "Trade submitted for approval");
            return Ok(TickOutcome::Submitted { step: name, approval_id });
        }

        Ok(outcome)
    }

    /// Handle every approval event already queued.
    pub async fn drain_approval_events(&mut self) -> Vec<ExecutionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.approval_events.try_recv() {
            if let Some(outcome) = self.handle_approval(event).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn handle_approval(&mut self, event: ApprovalEvent) -> Option<ExecutionOutcome> {
        match event {
            ApprovalEvent::Execute(pending) => Some(self.execute(pending).await),
            ApprovalEvent::Resolved(pending) => {
                self.sequence.clear_in_flight(&pending.step);
                tracing::info!(
                    approval_id = %pending.id,
                    step = %pending.step,
                    status = %pending.status,
                    reason = ?pending.reason,
                    "Approval resolved without execution"
                );
                None
            }
        }
    }

    async fn execute(&mut self, pending: PendingApproval) -> ExecutionOutcome {
        self.sequence.clear_in_flight(&pending.step);

        if self.guardrails.kill_switch.is_engaged() {
            tracing::warn!(approval_id = %pending.id, step = %pending.step, "Kill switch engaged at send time, order dropped");
            return ExecutionOutcome::Blocked {
                reason: "kill switch engaged".to_string(),
            };
        }

        let descriptor = &pending.descriptor;
        let combo = ComboContract::opening(&self.pipeline.underlying().symbol, descriptor);
        let order = ComboOrder {
            quantity: descriptor.quantity(),
            limit_price: descriptor.net_premium(),
            order_ref: pending.id.to_string(),
        };

        match self.broker.place_order(&combo, &order).await {
            Ok(result) if result.success => {
                let now = self.clock.now();
                self.sequence.mark_executed(&pending.step);
                self.guardrails
                    .risk_limits
                    .record_trade(&pending.step, descriptor.total_contracts());
                let ledger_id = self.ledger.open_trade(descriptor, &pending.step, now);
                if let Some(rule) = self
                    .strategies
                    .iter()
                    .find(|s| s.name == pending.step)
                    .and_then(|s| s.hedge_exit)
                {
                    self.hedges.watch(ledger_id, rule);
                }
                tracing::info!(
                    approval_id = %pending.id,
                    ledger_id = %ledger_id,
                    order_id = ?result.order_id,
                    strikes = %descriptor.strikes_repr(),
                    "Order filled"
                );
                ExecutionOutcome::Filled {
                    ledger_id,
                    order_id: result.order_id,
                }
            }
            Ok(result) => {
                let err = EngineError::order_rejected(&pending.id.to_string(), result.message.clone());
                tracing::warn!(error = %err, step = %pending.step, "Order rejected");
                ExecutionOutcome::Rejected { reason: result.message }
            }
            Err(e) => {
                let err = EngineError::from(e);
                tracing::error!(error = %err, step = %pending.step, "Order placement failed");
                ExecutionOutcome::Failed { error: err.to_string() }
            }
        }
    }

    /// Apply one operator command.
    pub async fn handle_command(&mut self, command: ControlCommand) {
        let approvals = &self.guardrails.approvals;
        match command {
            ControlCommand::Approve(id) => match approvals.approve(id) {
                Ok(()) => tracing::info!(approval_id = %id, "Approved"),
                Err(e) => tracing::warn!(error = %e, "Approve failed"),
            },
            ControlCommand::Reject { id, reason } => match approvals.reject(id, reason) {
                Ok(()) => tracing::info!(approval_id = %id, "Rejected"),
                Err(e) => tracing::warn!(error = %e, "Reject failed"),
            },
            ControlCommand::Cancel(id) => {
                let cancelled = approvals.cancel(id);
                tracing::info!(approval_id = %id, cancelled, "Cancel requested");
            }
            ControlCommand::Kill(reason) => {
                self.guardrails.kill_switch.engage(KillReason::Manual, reason, OPERATOR_ACTOR);
            }
            ControlCommand::Resume => {
                if !self.guardrails.kill_switch.disengage(OPERATOR_ACTOR) {
                    tracing::info!("Kill switch already disengaged");
                }
            }
            ControlCommand::CancelOrders => match self.broker.cancel_all_orders().await {
                Ok(count) => tracing::warn!(count, "Cancelled all working orders"),
                Err(e) => tracing::error!(error = %e, "Cancel all orders failed"),
            },
            ControlCommand::Status => {
                let switch = self.guardrails.kill_switch.snapshot();
                let counters = self.guardrails.risk_limits.snapshot();
                let pending: Vec<String> = approvals.pending().iter().map(|p| format!("{} {}", p.id, p.step)).collect();
                tracing::info!(
                    kill_switch_engaged = switch.engaged,
                    kill_reason = ?switch.reason,
                    trades_today = counters.trade_count,
                    contracts_today = counters.contracts_traded,
                    realized_today = %counters.realized_pnl,
                    open_positions = counters.open_positions,
                    pending = ?pending,
                    ledger_open = self.ledger.open_count(),
                    equity = %self.ledger.equity(),
                    "Status"
                );
            }
        }
    }

    async fn check_hedges(&mut self, now: NaiveDateTime) {
        let symbols = self.hedges.symbols(&self.ledger);
        if symbols.is_empty() {
            return;
        }
        let board = self.pipeline.fetch_board(&symbols, now).await;
        for exit in self.hedges.due_exits(&self.ledger, &board) {
            if self.guardrails.kill_switch.is_engaged() {
                tracing::warn!(symbol = %exit.symbol, "Kill switch engaged, hedge exit held");
                return;
            }
            let combo = ComboContract::single(&self.pipeline.underlying().symbol, &exit.symbol, OptionAction::Sell);
            let order = ComboOrder {
                quantity: exit.contracts,
                limit_price: exit.price,
                order_ref: format!("{}-{}", exit.trade_id, exit.symbol),
            };
            match self.broker.place_order(&combo, &order).await {
                Ok(result) if result.success => {
                    match self.ledger.partial_exit(exit.trade_id, &exit.symbol, exit.fraction, exit.price, now) {
                        Ok(pnl) => {
                            tracing::info!(trade_id = %exit.trade_id, symbol = %exit.symbol, contracts = exit.contracts, pnl = %pnl, "Hedge partial exit");
                            self.hedges.complete(&exit);
                            self.report_realized(exit.trade_id);
                        }
                        Err(e) => {
                            let err = EngineError::from(e);
                            tracing::error!(error = %err, "Ledger rejected hedge exit");
                        }
                    }
                }
                Ok(result) => tracing::warn!(symbol = %exit.symbol, reason = %result.message, "Hedge exit rejected"),
                Err(e) => tracing::error!(symbol = %exit.symbol, error = %e, "Hedge exit failed"),
            }
        }
    }

    async fn close_session(&mut self, now: NaiveDateTime) {
        if self.session_closed {
            return;
        }
        self.session_closed = true;

        let expired = self.guardrails.approvals.expire_all_pending("session closed");
        let close_at = self.hours.close_at(now);
        let close_price = match self.pipeline.load_session(now.date()).await {
            Ok(session) => session.until(close_at).last_bar().map(|b| b.close),
            Err(e) => {
                tracing::warn!(error = %e, "No bars for settlement");
                None
            }
        };

        let mut settled = 0;
        if let Some(price) = close_price {
            for (id, _) in self.ledger.settle_all_open(price, close_at) {
                self.report_realized(id);
                settled += 1;
            }
        } else if self.ledger.open_count() > 0 {
            tracing::error!(open = self.ledger.open_count(), "Open trades left unsettled without a closing price");
        }
        self.hedges.prune(&self.ledger);

        tracing::info!(expired, settled, close_price = ?close_price, equity = %self.ledger.equity(), "Session closed");
    }

    /// Send the ledger trade's unreported realized P&L to the risk counters.
    fn report_realized(&mut self, ledger_id: Uuid) {
        let Some((realized, open)) = self.ledger.trade(ledger_id).map(|t| (t.realized_pnl(), t.is_open())) else {
            return;
        };
        let reported = self.reported_pnl.remove(&ledger_id).unwrap_or_default();
        let exit = if open {
            self.reported_pnl.insert(ledger_id, realized);
            PositionExit::Partial
        } else {
            PositionExit::Full
        };
        self.guardrails.risk_limits.close_position(realized - reported, exit);
    }

    /// Ledger.
    #[must_use]
    pub const fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Guardrails.
    #[must_use]
    pub const fn guardrails(&self) -> &GuardrailSystem {
        &self.guardrails
    }

    /// Exit summary.
    #[must_use]
    pub fn summary(&self) -> LiveSummary {
        LiveSummary {
            ticks: self.ticks,
            trades: self.ledger.records(),
            statistics: self.ledger.statistics(),
            kill_switch: self.guardrails.kill_switch.snapshot(),
            counters: self.guardrails.risk_limits.snapshot(),
        }
    }
}

fn skipped(reason: impl Into<String>) -> TickOutcome {
    TickOutcome::Skipped { reason: reason.into() }
}
