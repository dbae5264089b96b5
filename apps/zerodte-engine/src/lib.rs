// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! zerodte-engine - Rust Core Library
//!
//! Decides when and how to enter same-day-expiry index option structures,
//! gates every live order through a three-layer guardrail system, and
//! replays or drives the decision pipeline offline or on a live loop.
//!
//! # Architecture
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: pure decision logic and state machines
//!   - `signal`: entry signal over intraday bars
//!   - `strike_selection`: strike-distance search for a target credit/risk ratio
//!   - `trade`: structure templates, trade descriptors, liquidity checks
//!   - `guardrails`: kill switch, risk limits, approval gate
//!   - `ledger`: position ledger, commissions, performance statistics
//!   - `session`: trading calendar and session hours
//!
//! - **Application**: ports and orchestration
//!   - `ports`: `MarketDataPort`, `BrokerPort`
//!   - `services`: `TradePipeline`, `BacktestRunner`, `LiveOrchestrator`
//!
//! - **Infrastructure**: in-memory market data and a paper broker

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - decision logic with no I/O.
pub mod domain;

/// Application layer - ports and orchestration services.
pub mod application;

/// Infrastructure layer - port adapters.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Typed YAML configuration.
pub mod config;

/// Engine error type and codes.
pub mod error;

/// Logging setup.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{BrokerError, BrokerPort, MarketDataError, MarketDataPort};
pub use application::services::{
    BacktestReport, BacktestRunner, ControlCommand, LiveOrchestrator, LiveSettings, TickOutcome, TradePipeline,
};
pub use config::{Config, ConfigError, load_config};
pub use domain::guardrails::{ApprovalGate, GuardrailSystem, KillSwitch, RiskLimitsManager};
pub use domain::ledger::PositionLedger;
pub use domain::trade::{StructureKind, TradeDescriptor};
pub use error::{EngineError, ErrorCode};
pub use infrastructure::broker::PaperBroker;
pub use infrastructure::market_data::InMemoryMarketData;
