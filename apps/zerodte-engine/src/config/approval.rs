//! Approval gate configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::guardrails::ApprovalMode;

/// Approval style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalModeKind {
    /// Operator approves every trade.
    Manual,
    /// Trades send after a delay unless cancelled.
    #[default]
    TimedAuto,
    /// Trades send on submission.
    Immediate,
}

/// Approval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Approval style.
    #[serde(default)]
    pub mode: ApprovalModeKind,
    /// Auto-send delay for `TIMED_AUTO`.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    /// Optional expiry for `MANUAL`.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            mode: ApprovalModeKind::default(),
            delay_seconds: default_delay_seconds(),
            timeout_seconds: None,
        }
    }
}

impl ApprovalConfig {
    /// Gate mode.
    #[must_use]
    pub fn to_mode(&self) -> ApprovalMode {
        match self.mode {
            ApprovalModeKind::Manual => ApprovalMode::Manual {
                timeout: self.timeout_seconds.map(|s| Duration::seconds(s as i64)),
            },
            ApprovalModeKind::TimedAuto => ApprovalMode::TimedAuto {
                delay: Duration::seconds(self.delay_seconds as i64),
            },
            ApprovalModeKind::Immediate => ApprovalMode::Immediate,
        }
    }
}

const fn default_delay_seconds() -> u64 {
    30
}
