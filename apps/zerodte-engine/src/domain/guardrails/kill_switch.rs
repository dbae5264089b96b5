//! Fail-safe kill switch.
//!
//! Two states, ENGAGED and DISENGAGED, starting ENGAGED so nothing trades
//! until an operator explicitly disengages. While engaged no new order may
//! be sent. Order cancellation is never gated by the switch.
//!
//! State and history live behind one `RwLock` so a reader never sees a
//! transition half applied. Every transition is appended to the history
//! and broadcast to subscribers.

use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::shared::Clock;

/// Broadcast buffer for transition notifications.
const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Actor recorded for transitions the engine makes on its own.
pub const SYSTEM_ACTOR: &str = "system";

/// Why the switch was engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KillReason {
    /// Initial state at construction.
    Startup,
    /// Operator request.
    Manual,
    /// Daily realized loss limit breached.
    DailyLossLimit,
    /// Broker connection lost.
    Disconnect,
    /// Reconnect attempts exhausted.
    ReconnectExhausted,
    /// Unexpected engine error.
    Error,
}

impl std::fmt::Display for KillReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Startup => "STARTUP",
            Self::Manual => "MANUAL",
            Self::DailyLossLimit => "DAILY_LOSS_LIMIT",
            Self::Disconnect => "DISCONNECT",
            Self::ReconnectExhausted => "RECONNECT_EXHAUSTED",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchTransition {
    /// State after the transition.
    pub engaged: bool,
    /// Engage reason. `None` for a disengage.
    pub reason: Option<KillReason>,
    /// Free-form details.
    pub details: String,
    /// Who made the change.
    pub actor: String,
    /// When it happened.
    pub at: NaiveDateTime,
}

/// Immutable view of the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchState {
    /// Whether new orders are blocked.
    pub engaged: bool,
    /// Reason of the last engage, cleared on disengage.
    pub reason: Option<KillReason>,
    /// Details of the last transition.
    pub details: String,
    /// Actor of the last transition.
    pub actor: String,
    /// Time of the last transition.
    pub changed_at: NaiveDateTime,
}

#[derive(Debug)]
struct Inner {
    state: KillSwitchState,
    history: Vec<KillSwitchTransition>,
}

impl Inner {
    fn apply(&mut self, transition: KillSwitchTransition) {
        self.state = KillSwitchState {
            engaged: transition.engaged,
            reason: transition.reason,
            details: transition.details.clone(),
            actor: transition.actor.clone(),
            changed_at: transition.at,
        };
        self.history.push(transition);
    }
}

/// Process-wide order gate, shared by `Arc`.
pub struct KillSwitch {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
    transitions: broadcast::Sender<KillSwitchTransition>,
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillSwitch")
            .field("state", &self.inner.read().state)
            .finish_non_exhaustive()
    }
}

impl KillSwitch {
    /// Create an engaged switch.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let initial = KillSwitchTransition {
            engaged: true,
            reason: Some(KillReason::Startup),
            details: "engaged at startup".to_string(),
            actor: SYSTEM_ACTOR.to_string(),
            at: now,
        };
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(Inner {
                state: KillSwitchState {
                    engaged: true,
                    reason: initial.reason,
                    details: initial.details.clone(),
                    actor: initial.actor.clone(),
                    changed_at: now,
                },
                history: vec![initial],
            }),
            clock,
            transitions,
        }
    }

    /// Engage the switch.
    ///
    /// Returns `false` without recording anything when already engaged.
    pub fn engage(&self, reason: KillReason, details: impl Into<String>, actor: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        if inner.state.engaged {
            return false;
        }
        let transition = KillSwitchTransition {
            engaged: true,
            reason: Some(reason),
            details: details.into(),
            actor: actor.into(),
            at: self.clock.now(),
        };
        tracing::warn!(
            reason = %reason,
            details = %transition.details,
            actor = %transition.actor,
            "Kill switch engaged"
        );
        inner.apply(transition.clone());
        let _ = self.transitions.send(transition);
        true
    }

    /// Disengage the switch.
    ///
    /// Returns `false` when not engaged.
    pub fn disengage(&self, actor: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        if !inner.state.engaged {
            return false;
        }
        let transition = KillSwitchTransition {
            engaged: false,
            reason: None,
            details: format!("cleared {}", inner.state.reason.map_or_else(String::new, |r| r.to_string())),
            actor: actor.into(),
            at: self.clock.now(),
        };
        tracing::info!(actor = %transition.actor, "Kill switch disengaged");
        inner.apply(transition.clone());
        let _ = self.transitions.send(transition);
        true
    }

    /// Whether new orders are blocked.
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.inner.read().state.engaged
    }

    /// Reason of the current engagement.
    #[must_use]
    pub fn reason(&self) -> Option<KillReason> {
        let inner = self.inner.read();
        inner.state.engaged.then_some(inner.state.reason).flatten()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> KillSwitchState {
        self.inner.read().state.clone()
    }

    /// Copy of every transition so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<KillSwitchTransition> {
        self.inner.read().history.clone()
    }

    /// Receive future transitions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<KillSwitchTransition> {
        self.transitions.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::ManualClock;
    use chrono::NaiveDate;

    fn switch() -> KillSwitch {
        let start = NaiveDate::from_ymd_opt(2025, 10, 17)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        KillSwitch::new(Arc::new(ManualClock::new(start)))
    }

    #[test]
    fn starts_engaged() {
        let ks = switch();
        assert!(ks.is_engaged());
        assert_eq!(ks.reason(), Some(KillReason::Startup));
        assert_eq!(ks.history().len(), 1);
    }

    #[test]
    fn engage_when_engaged_is_noop() {
        let ks = switch();
        assert!(!ks.engage(KillReason::Manual, "again", "ops"));
        assert_eq!(ks.history().len(), 1);
        assert_eq!(ks.reason(), Some(KillReason::Startup));
    }

    #[test]
    fn disengage_when_disengaged_is_noop() {
        let ks = switch();
        assert!(ks.disengage("ops"));
        assert!(!ks.disengage("ops"));
        assert_eq!(ks.history().len(), 2);
        assert!(!ks.is_engaged());
        assert_eq!(ks.reason(), None);
    }

    #[test]
    fn full_cycle_records_history() {
        let ks = switch();
        assert!(ks.disengage("ops"));
        assert!(ks.engage(KillReason::DailyLossLimit, "loss 10500", SYSTEM_ACTOR));
        assert!(!ks.engage(KillReason::Disconnect, "socket", SYSTEM_ACTOR));

        let history = ks.history();
        assert_eq!(history.len(), 3);
        assert!(!history[1].engaged);
        assert_eq!(history[2].reason, Some(KillReason::DailyLossLimit));

        let snapshot = ks.snapshot();
        assert!(snapshot.engaged);
        assert_eq!(snapshot.details, "loss 10500");
    }

    #[test]
    fn subscribers_see_transitions() {
        let ks = switch();
        let mut rx = ks.subscribe();
        ks.disengage("ops");
        ks.engage(KillReason::Manual, "halt", "ops");

        assert!(!rx.try_recv().unwrap().engaged);
        let engaged = rx.try_recv().unwrap();
        assert_eq!(engaged.reason, Some(KillReason::Manual));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn concurrent_engage_records_once() {
        let ks = Arc::new(switch());
        ks.disengage("ops");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ks = Arc::clone(&ks);
                std::thread::spawn(move || ks.engage(KillReason::Manual, "race", "ops"))
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(ks.history().len(), 3);
    }
}
