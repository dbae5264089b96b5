//! Broker Port (Driven Port)
//!
//! Combo order placement, cancellation and connection state.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::market_data::OptionAction;
use crate::domain::trade::TradeDescriptor;

/// One leg of a combo contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboLeg {
    /// Option contract symbol.
    pub symbol: String,
    /// Leg action.
    pub action: OptionAction,
    /// Contracts per combo unit.
    pub ratio: u32,
}

/// Multi-leg contract sent as one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboContract {
    /// Underlying symbol.
    pub underlying: String,
    /// Legs.
    pub legs: Vec<ComboLeg>,
}

impl ComboContract {
    /// Combo opening every leg of `descriptor`.
    #[must_use]
    pub fn opening(underlying: &str, descriptor: &TradeDescriptor) -> Self {
        Self {
            underlying: underlying.to_string(),
            legs: descriptor
                .legs()
                .iter()
                .map(|l| ComboLeg {
                    symbol: l.symbol().to_string(),
                    action: l.action(),
                    ratio: l.quantity(),
                })
                .collect(),
        }
    }

    /// Single-leg contract.
    #[must_use]
    pub fn single(underlying: &str, symbol: &str, action: OptionAction) -> Self {
        Self {
            underlying: underlying.to_string(),
            legs: vec![ComboLeg {
                symbol: symbol.to_string(),
                action,
                ratio: 1,
            }],
        }
    }
}

/// Order terms for a combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboOrder {
    /// Combo units.
    pub quantity: u32,
    /// Net limit per share. Positive for a credit, negative for a debit.
    pub limit_price: Decimal,
    /// Client reference.
    pub order_ref: String,
}

/// Broker answer to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Whether the broker accepted the order.
    pub success: bool,
    /// Broker order id.
    pub order_id: Option<String>,
    /// Status or rejection text.
    pub message: String,
}

/// Asynchronous broker notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// Connection dropped.
    Disconnected {
        /// Provider reason.
        reason: String,
    },
    /// Connection restored.
    Reconnected,
    /// Order status change.
    OrderStatus {
        /// Broker order id.
        order_id: String,
        /// Provider status text.
        status: String,
    },
}

/// Broker port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Connection error.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Order rejected by broker.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Unknown error.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Whether the session is connected.
    fn is_connected(&self) -> bool;

    /// Try to restore the connection once.
    async fn reconnect(&self) -> Result<(), BrokerError>;

    /// Place a combo order.
    async fn place_order(&self, combo: &ComboContract, order: &ComboOrder) -> Result<OrderResult, BrokerError>;

    /// Cancel every working order. Returns the number cancelled.
    async fn cancel_all_orders(&self) -> Result<usize, BrokerError>;

    /// Subscribe to broker notifications.
    fn events(&self) -> broadcast::Receiver<BrokerEvent>;
}
