//! Broker disconnect handling.
//!
//! A disconnect engages the kill switch with reason DISCONNECT, then runs a
//! bounded reconnect sequence with a fixed delay. Exhaustion returns
//! `ConnectionLost`, which halts the live loop, and leaves the switch engaged
//! (RECONNECT_EXHAUSTED if it was cleared meanwhile). A successful reconnect
//! also leaves the switch engaged for an operator to resume.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::BrokerPort;
use crate::domain::guardrails::{KillReason, KillSwitch, SYSTEM_ACTOR};
use crate::error::EngineError;

/// Reconnect driver bound to one broker and one kill switch.
pub struct ConnectionSupervisor {
    broker: Arc<dyn BrokerPort>,
    kill_switch: Arc<KillSwitch>,
    delay: Duration,
    max_attempts: u32,
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("delay", &self.delay)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ConnectionSupervisor {
    /// Create a supervisor.
    #[must_use]
    pub fn new(broker: Arc<dyn BrokerPort>, kill_switch: Arc<KillSwitch>, delay: Duration, max_attempts: u32) -> Self {
        Self {
            broker,
            kill_switch,
            delay,
            max_attempts,
        }
    }

    /// Handle a lost connection. Returns the attempt that succeeded.
    pub async fn recover(&self, reason: &str) -> Result<u32, EngineError> {
        self.kill_switch.engage(KillReason::Disconnect, reason, SYSTEM_ACTOR);
        tracing::error!(reason, max_attempts = self.max_attempts, "Broker disconnected, kill switch engaged");

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.delay).await;
            match self.broker.reconnect().await {
                Ok(()) if self.broker.is_connected() => {
                    tracing::info!(attempt, "Broker reconnected, kill switch stays engaged until resumed");
                    return Ok(attempt);
                }
                Ok(()) => tracing::warn!(attempt, "Reconnect returned but broker still disconnected"),
                Err(e) => tracing::warn!(attempt, error = %e, "Reconnect attempt failed"),
            }
        }

        self.kill_switch.engage(
            KillReason::ReconnectExhausted,
            format!("{} reconnect attempts failed", self.max_attempts),
            SYSTEM_ACTOR,
        );
        Err(EngineError::connection_lost(self.max_attempts))
    }
}
