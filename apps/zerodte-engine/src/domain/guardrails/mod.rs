//! Guardrails Bounded Context
//!
//! Three layers stand between a constructed trade and the broker:
//!
//! - [`KillSwitch`]: fail-safe gate, engaged at startup
//! - [`RiskLimitsManager`]: per-day limits over today's counters
//! - [`ApprovalGate`]: manual, timed-auto or immediate approval queue
//!
//! All three are shared by `Arc` between the orchestration task, the
//! control surface and broker event handling. Each serializes its own
//! mutations and hands out snapshots for reads.

mod approval;
mod errors;
mod kill_switch;
mod risk_check;
mod risk_limits;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use approval::{ApprovalEvent, ApprovalGate, ApprovalMode, ApprovalStatus, PendingApproval};
pub use errors::ApprovalError;
pub use kill_switch::{KillReason, KillSwitch, KillSwitchState, KillSwitchTransition, SYSTEM_ACTOR};
pub use risk_check::{CheckResult, RiskCheck, RiskCheckReport};
pub use risk_limits::{PositionExit, RiskCounters, RiskLimits, RiskLimitsManager};

use crate::domain::shared::Clock;

/// The three guardrail layers, wired to one clock and one kill switch.
#[derive(Debug, Clone)]
pub struct GuardrailSystem {
    /// Order gate.
    pub kill_switch: Arc<KillSwitch>,
    /// Pre-trade limits.
    pub risk_limits: Arc<RiskLimitsManager>,
    /// Approval queue.
    pub approvals: Arc<ApprovalGate>,
}

impl GuardrailSystem {
    /// Build all three layers. The kill switch starts engaged.
    #[must_use]
    pub fn new(
        limits: RiskLimits,
        mode: ApprovalMode,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<ApprovalEvent>) {
        let kill_switch = Arc::new(KillSwitch::new(Arc::clone(&clock)));
        let risk_limits = Arc::new(RiskLimitsManager::new(
            limits,
            Arc::clone(&kill_switch),
            Arc::clone(&clock),
        ));
        let (approvals, events) = ApprovalGate::new(mode, clock);
        (
            Self {
                kill_switch,
                risk_limits,
                approvals: Arc::new(approvals),
            },
            events,
        )
    }
}
