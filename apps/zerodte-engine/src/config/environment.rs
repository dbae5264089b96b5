//! Environment configuration for run mode.

use serde::{Deserialize, Serialize};

/// Run modes accepted by `environment.mode`.
pub const VALID_MODES: [&str; 2] = ["BACKTEST", "PAPER"];

/// Environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Run mode: `BACKTEST` replays a data file, `PAPER` drives the live loop
    /// against the paper broker.
    #[serde(default = "default_environment_mode")]
    pub mode: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            mode: default_environment_mode(),
        }
    }
}

impl EnvironmentConfig {
    /// Whether this is a backtest run.
    #[must_use]
    pub fn is_backtest(&self) -> bool {
        self.mode == "BACKTEST"
    }
}

fn default_environment_mode() -> String {
    "BACKTEST".to_string()
}
