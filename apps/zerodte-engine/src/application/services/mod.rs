//! Application Services
//!
//! The decision pipeline and the two orchestrators that drive it: an
//! offline backtest runner and a live polling loop. Both share
//! [`TradePipeline`] and [`SequenceState`].

mod backtest_runner;
mod connection_supervisor;
mod hedge;
mod live_orchestrator;
mod pipeline;
mod sequence;

pub use backtest_runner::{BacktestReport, BacktestRunner, SkippedDay};
pub use connection_supervisor::ConnectionSupervisor;
pub use hedge::{HedgeExit, HedgeMonitor};
pub use live_orchestrator::{
    ControlCommand, ExecutionOutcome, LiveOrchestrator, LiveSettings, LiveSummary, OPERATOR_ACTOR, TickOutcome,
};
pub use pipeline::{SessionData, TradeIntent, TradePipeline};
pub use sequence::SequenceState;
