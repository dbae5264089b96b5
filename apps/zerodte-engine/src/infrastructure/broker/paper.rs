//! Paper broker.
//!
//! Fills every accepted combo at its limit price unless orders are held,
//! in which case they stay working until cancelled. Connection loss,
//! failed reconnects and rejections can be injected for drills and tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::application::ports::{BrokerError, BrokerEvent, BrokerPort, ComboContract, ComboOrder, OrderResult};

const EVENT_CAPACITY: usize = 64;

/// Paper order state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperOrderStatus {
    /// Filled on placement.
    Filled,
    /// Held open.
    Working,
    /// Cancelled while working.
    Cancelled,
}

impl std::fmt::Display for PaperOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Filled => "FILLED",
            Self::Working => "WORKING",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One order seen by the paper broker.
#[derive(Debug, Clone, Serialize)]
pub struct PaperOrder {
    /// Broker id, `PAPER-<n>`.
    pub order_id: String,
    /// Contract.
    pub combo: ComboContract,
    /// Terms.
    pub order: ComboOrder,
    /// State.
    pub status: PaperOrderStatus,
}

#[derive(Debug, Default)]
struct PaperState {
    orders: Vec<PaperOrder>,
    reconnect_failures: u32,
    reject_next: Option<String>,
    hold_orders: bool,
}

/// In-process broker.
#[derive(Debug)]
pub struct PaperBroker {
    connected: AtomicBool,
    next_id: AtomicU64,
    state: Mutex<PaperState>,
    events: broadcast::Sender<BrokerEvent>,
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperBroker {
    /// Create a connected broker.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connected: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            state: Mutex::new(PaperState::default()),
            events,
        }
    }

    /// Drop the connection and notify subscribers.
    pub fn disconnect(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.connected.store(false, Ordering::SeqCst);
        tracing::warn!(reason = %reason, "Paper broker disconnected");
        let _ = self.events.send(BrokerEvent::Disconnected { reason });
    }

    /// Make the next `n` reconnect attempts fail.
    pub fn set_reconnect_failures(&self, n: u32) {
        self.state.lock().reconnect_failures = n;
    }

    /// Reject the next order with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().reject_next = Some(reason.into());
    }

    /// Keep new orders working instead of filling them.
    pub fn hold_orders(&self, hold: bool) {
        self.state.lock().hold_orders = hold;
    }

    /// Every order placed so far.
    #[must_use]
    pub fn orders(&self) -> Vec<PaperOrder> {
        self.state.lock().orders.clone()
    }
}

#[async_trait]
impl BrokerPort for PaperBroker {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock();
            if state.reconnect_failures > 0 {
                state.reconnect_failures -= 1;
                return Err(BrokerError::ConnectionError {
                    message: "paper reconnect refused".to_string(),
                });
            }
        }
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(BrokerEvent::Reconnected);
        Ok(())
    }

    async fn place_order(&self, combo: &ComboContract, order: &ComboOrder) -> Result<OrderResult, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::ConnectionError {
                message: "paper broker disconnected".to_string(),
            });
        }

        let mut state = self.state.lock();
        if let Some(reason) = state.reject_next.take() {
            return Ok(OrderResult {
                success: false,
                order_id: None,
                message: reason,
            });
        }

        let order_id = format!("PAPER-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let status = if state.hold_orders {
            PaperOrderStatus::Working
        } else {
            PaperOrderStatus::Filled
        };
        state.orders.push(PaperOrder {
            order_id: order_id.clone(),
            combo: combo.clone(),
            order: order.clone(),
            status,
        });
        drop(state);

        tracing::debug!(order_id = %order_id, legs = combo.legs.len(), quantity = order.quantity, limit = %order.limit_price, "Paper order placed");
        let _ = self.events.send(BrokerEvent::OrderStatus {
            order_id: order_id.clone(),
            status: status.to_string(),
        });

        Ok(OrderResult {
            success: true,
            order_id: Some(order_id),
            message: status.to_string(),
        })
    }

    async fn cancel_all_orders(&self) -> Result<usize, BrokerError> {
        let mut state = self.state.lock();
        let mut cancelled = 0;
        for order in state.orders.iter_mut().filter(|o| o.status == PaperOrderStatus::Working) {
            order.status = PaperOrderStatus::Cancelled;
            cancelled += 1;
        }
        Ok(cancelled)
    }

    fn events(&self) -> broadcast::Receiver<BrokerEvent> {
        self.events.subscribe()
    }
}
