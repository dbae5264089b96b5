//! Engine-level error type.
//!
//! Layer-specific errors (`ConfigError`, `MarketDataError`, `BrokerError`,
//! `ApprovalError`, `LedgerError`) convert into [`EngineError`] at the
//! orchestration boundary. Each carries an [`ErrorCode`] so callers and logs
//! can classify failures without string matching.
//!
//! | Code | Handling |
//! |------|----------|
//! | `DATA_UNAVAILABLE` | Skip the attempt, log, continue the loop |
//! | `SEARCH_EXHAUSTED` | Decline entry silently |
//! | `GUARDRAIL_BLOCKED` | Declined result with reasons |
//! | `CONNECTION_LOST` | Kill switch engaged, bounded reconnect, fatal when exhausted |
//! | `ORDER_REJECTED` | Failed result, risk counters untouched |
//! | `CONFIG_INVALID` | Startup failure |
//! | `INTERNAL` | Unexpected state |
//!
//! Guardrail refusals are normally surfaced as values (`RiskCheckReport`,
//! `TickOutcome`); the `GuardrailBlocked` code exists for callers that need
//! to fold a refusal into an error chain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::{BrokerError, MarketDataError};
use crate::config::ConfigError;
use crate::domain::ledger::LedgerError;

/// Error codes for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing bar or quote data.
    DataUnavailable,
    /// Strike search produced no valid probe.
    SearchExhausted,
    /// A guardrail refused the trade.
    GuardrailBlocked,
    /// Broker connection lost and not recovered.
    ConnectionLost,
    /// Broker rejected an order.
    OrderRejected,
    /// Configuration failed to load or validate.
    ConfigInvalid,
    /// Unexpected internal state.
    Internal,
}

impl ErrorCode {
    /// Stable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::DataUnavailable => "DATA_UNAVAILABLE",
            Self::SearchExhausted => "SEARCH_EXHAUSTED",
            Self::GuardrailBlocked => "GUARDRAIL_BLOCKED",
            Self::ConnectionLost => "CONNECTION_LOST",
            Self::OrderRejected => "ORDER_REJECTED",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether the live loop must halt on this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionLost | Self::ConfigInvalid | Self::Internal)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// An engine error with a code, a message and key/value context.
#[derive(Debug, Error)]
pub struct EngineError {
    code: ErrorCode,
    message: String,
    context: Vec<(String, String)>,
}

impl EngineError {
    /// Create a new engine error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

/// Convenience constructors for common errors.
impl EngineError {
    /// Market data missing for a symbol.
    #[must_use]
    pub fn data_unavailable(symbol: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataUnavailable, message).with_context("symbol", symbol)
    }

    /// Reconnect attempts exhausted.
    #[must_use]
    pub fn connection_lost(attempts: u32) -> Self {
        Self::new(
            ErrorCode::ConnectionLost,
            format!("broker connection lost after {attempts} reconnect attempts"),
        )
        .with_context("attempts", attempts.to_string())
    }

    /// Order rejected by broker.
    #[must_use]
    pub fn order_rejected(trade_id: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::OrderRejected, reason).with_context("trade_id", trade_id)
    }

    /// Guardrail refusal folded into an error.
    #[must_use]
    pub fn guardrail_blocked(reasons: &[String]) -> Self {
        Self::new(ErrorCode::GuardrailBlocked, reasons.join("; "))
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorCode::ConfigInvalid, err.to_string())
    }
}

impl From<MarketDataError> for EngineError {
    fn from(err: MarketDataError) -> Self {
        Self::new(ErrorCode::DataUnavailable, err.to_string())
    }
}

impl From<BrokerError> for EngineError {
    fn from(err: BrokerError) -> Self {
        let code = match err {
            BrokerError::ConnectionError { .. } => ErrorCode::ConnectionLost,
            BrokerError::OrderRejected { .. } => ErrorCode::OrderRejected,
            BrokerError::Unknown { .. } => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        Self::new(ErrorCode::Internal, err.to_string()).with_context("component", "ledger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EngineError::new(ErrorCode::DataUnavailable, "no bars for SPX");
        assert_eq!(error.to_string(), "[DATA_UNAVAILABLE] no bars for SPX");
    }

    #[test]
    fn test_error_context() {
        let error = EngineError::order_rejected("t-1", "margin")
            .with_context("step", "iron_butterfly");

        assert_eq!(error.code(), ErrorCode::OrderRejected);
        assert_eq!(error.message(), "margin");
        assert_eq!(error.context().len(), 2);
    }

    #[test]
    fn test_fatal_codes() {
        assert!(ErrorCode::ConnectionLost.is_fatal());
        assert!(ErrorCode::ConfigInvalid.is_fatal());
        assert!(!ErrorCode::DataUnavailable.is_fatal());
        assert!(!ErrorCode::SearchExhausted.is_fatal());
        assert!(!ErrorCode::OrderRejected.is_fatal());
    }

    #[test]
    fn test_broker_error_mapping() {
        let err: EngineError = BrokerError::OrderRejected {
            reason: "bad price".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::OrderRejected);

        let err: EngineError = BrokerError::ConnectionError {
            message: "socket closed".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ConnectionLost);
    }

    #[test]
    fn test_connection_lost_message() {
        let err = EngineError::connection_lost(5);
        assert!(err.to_string().contains("5 reconnect attempts"));
        assert_eq!(err.code().reason(), "CONNECTION_LOST");
    }

    #[test]
    fn test_guardrail_blocked_joins_reasons() {
        let err = EngineError::guardrail_blocked(&["a".to_string(), "b".to_string()]);
        assert_eq!(err.message(), "a; b");
    }
}
