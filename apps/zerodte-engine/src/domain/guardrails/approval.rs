//! Human-in-the-loop approval queue.
//!
//! Every trade the live loop wants to send is submitted here first. An entry
//! starts PENDING and resolves to exactly one terminal status. APPROVED and
//! AUTO_SENT emit one [`ApprovalEvent::Execute`]; every other resolution emits
//! [`ApprovalEvent::Resolved`]. Events are sent while the gate lock is held,
//! so an entry can never execute twice. Resolved entries are archived for the
//! current day only; the first access on a new date drops older ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::errors::ApprovalError;
use crate::domain::shared::Clock;
use crate::domain::trade::TradeDescriptor;

/// How submitted trades resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    /// Operator must approve. Optionally expires after `timeout`.
    Manual {
        /// Time after which a pending entry expires.
        timeout: Option<Duration>,
    },
    /// Sends automatically `delay` after submission unless cancelled.
    TimedAuto {
        /// Delay before auto-send.
        delay: Duration,
    },
    /// Sends on submission.
    Immediate,
}

/// Entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting resolution.
    Pending,
    /// Approved by an operator.
    Approved,
    /// Rejected by an operator.
    Rejected,
    /// Cancelled before resolution.
    Cancelled,
    /// Sent after the auto-send delay.
    AutoSent,
    /// Timed out or closed at session end.
    Expired,
}

impl ApprovalStatus {
    /// Whether this status sends the order.
    #[must_use]
    pub const fn executes(self) -> bool {
        matches!(self, Self::Approved | Self::AutoSent)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::AutoSent => "AUTO_SENT",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// One queued trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Approval id.
    pub id: Uuid,
    /// Sequence step that produced the trade.
    pub step: String,
    /// The trade.
    pub descriptor: TradeDescriptor,
    /// Current status.
    pub status: ApprovalStatus,
    /// Submission time.
    pub submitted_at: NaiveDateTime,
    /// Auto-send or expiry deadline.
    pub deadline: Option<NaiveDateTime>,
    /// Resolution time.
    pub resolved_at: Option<NaiveDateTime>,
    /// Rejection or expiry reason.
    pub reason: Option<String>,
}

/// Gate output consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalEvent {
    /// Send this trade to the broker.
    Execute(PendingApproval),
    /// Entry resolved without execution.
    Resolved(PendingApproval),
}

#[derive(Debug)]
struct GateState {
    day: NaiveDate,
    pending: BTreeMap<Uuid, PendingApproval>,
    archive: Vec<PendingApproval>,
}

impl GateState {
    fn new(day: NaiveDate) -> Self {
        Self {
            day,
            pending: BTreeMap::new(),
            archive: Vec::new(),
        }
    }
}

/// Approval queue shared by the orchestrator and the control surface.
pub struct ApprovalGate {
    mode: ApprovalMode,
    clock: Arc<dyn Clock>,
    state: Mutex<GateState>,
    events: mpsc::UnboundedSender<ApprovalEvent>,
}

impl std::fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("mode", &self.mode)
            .field("pending", &self.state.lock().pending.len())
            .finish_non_exhaustive()
    }
}

impl ApprovalGate {
    /// Create a gate and the receiver for its events.
    #[must_use]
    pub fn new(mode: ApprovalMode, clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<ApprovalEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let today = clock.now().date();
        (
            Self {
                mode,
                clock,
                state: Mutex::new(GateState::new(today)),
                events,
            },
            rx,
        )
    }

    /// Configured mode.
    #[must_use]
    pub const fn mode(&self) -> ApprovalMode {
        self.mode
    }

    /// Queue a trade and return its approval id.
    pub fn submit(&self, descriptor: TradeDescriptor, step: impl Into<String>) -> Uuid {
        let now = self.clock.now();
        let deadline = match self.mode {
            ApprovalMode::Manual { timeout } => timeout.map(|t| now + t),
            ApprovalMode::TimedAuto { delay } => Some(now + delay),
            ApprovalMode::Immediate => None,
        };
        let entry = PendingApproval {
            id: Uuid::new_v4(),
            step: step.into(),
            descriptor,
            status: ApprovalStatus::Pending,
            submitted_at: now,
            deadline,
            resolved_at: None,
            reason: None,
        };
        let id = entry.id;

        tracing::info!(
            approval_id = %id,
            step = %entry.step,
            structure = %entry.descriptor.kind(),
            strikes = %entry.descriptor.strikes_repr(),
            deadline = ?deadline,
            "Trade submitted for approval"
        );

        let mut state = self.lock_current();
        state.pending.insert(id, entry);
        if self.mode == ApprovalMode::Immediate {
            self.resolve(&mut state, id, ApprovalStatus::AutoSent, None, now);
        }
        id
    }

    /// Approve a pending entry.
    pub fn approve(&self, id: Uuid) -> Result<(), ApprovalError> {
        self.transition(id, ApprovalStatus::Approved, None)
    }

    /// Reject a pending entry.
    pub fn reject(&self, id: Uuid, reason: impl Into<String>) -> Result<(), ApprovalError> {
        self.transition(id, ApprovalStatus::Rejected, Some(reason.into()))
    }

    /// Cancel a pending entry. Returns `false` if it already resolved.
    pub fn cancel(&self, id: Uuid) -> bool {
        self.transition(id, ApprovalStatus::Cancelled, None).is_ok()
    }

    /// Resolve overdue entries. Call at least once per second.
    ///
    /// Timed-auto entries past their deadline become AUTO_SENT. Manual
    /// entries past their timeout become EXPIRED. Returns the number
    /// resolved.
    pub fn tick(&self) -> usize {
        let now = self.clock.now();
        let target = match self.mode {
            ApprovalMode::TimedAuto { .. } => ApprovalStatus::AutoSent,
            ApprovalMode::Manual { .. } => ApprovalStatus::Expired,
            ApprovalMode::Immediate => return 0,
        };

        let mut state = self.lock_current();
        let due: Vec<Uuid> = state
            .pending
            .values()
            .filter(|e| e.deadline.is_some_and(|d| d <= now))
            .map(|e| e.id)
            .collect();
        let reason = (target == ApprovalStatus::Expired).then(|| "approval timed out".to_string());
        for id in &due {
            self.resolve(&mut state, *id, target, reason.clone(), now);
        }
        due.len()
    }

    /// Expire every pending entry, e.g. at session close.
    pub fn expire_all_pending(&self, reason: &str) -> usize {
        let now = self.clock.now();
        let mut state = self.lock_current();
        let ids: Vec<Uuid> = state.pending.keys().copied().collect();
        for id in &ids {
            self.resolve(&mut state, *id, ApprovalStatus::Expired, Some(reason.to_string()), now);
        }
        ids.len()
    }

    /// Copy of every pending entry.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.lock_current().pending.values().cloned().collect()
    }

    /// Copy of an entry, pending or resolved.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<PendingApproval> {
        let state = self.lock_current();
        state
            .pending
            .get(&id)
            .or_else(|| state.archive.iter().find(|e| e.id == id))
            .cloned()
    }

    /// Copy of every resolved entry, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<PendingApproval> {
        self.lock_current().archive.clone()
    }

    fn transition(&self, id: Uuid, status: ApprovalStatus, reason: Option<String>) -> Result<(), ApprovalError> {
        let now = self.clock.now();
        let mut state = self.lock_current();
        if !state.pending.contains_key(&id) {
            return Err(match state.archive.iter().find(|e| e.id == id) {
                Some(resolved) => ApprovalError::NotPending {
                    id,
                    status: resolved.status,
                },
                None => ApprovalError::NotFound { id },
            });
        }
        self.resolve(&mut state, id, status, reason, now);
        Ok(())
    }

    fn lock_current(&self) -> MutexGuard<'_, GateState> {
        let today = self.clock.now().date();
        let mut state = self.state.lock();
        if state.day != today {
            let before = state.archive.len();
            state.archive.retain(|e| e.resolved_at.is_some_and(|t| t.date() >= today));
            tracing::info!(
                from = %state.day,
                to = %today,
                pruned = before - state.archive.len(),
                "Approval archive rolled to new day"
            );
            state.day = today;
        }
        state
    }

    fn resolve(
        &self,
        state: &mut GateState,
        id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
        now: NaiveDateTime,
    ) {
        let Some(mut entry) = state.pending.remove(&id) else {
            return;
        };
        entry.status = status;
        entry.resolved_at = Some(now);
        entry.reason = reason;

        tracing::info!(approval_id = %id, status = %status, reason = ?entry.reason, "Approval resolved");

        state.archive.push(entry.clone());
        let event = if status.executes() {
            ApprovalEvent::Execute(entry)
        } else {
            ApprovalEvent::Resolved(entry)
        };
        if self.events.send(event).is_err() {
            tracing::warn!(approval_id = %id, "Approval event receiver dropped");
        }
    }
}
