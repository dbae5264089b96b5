//! Configuration for the engine.
//!
//! One typed tree loaded from YAML with `${VAR}` / `${VAR:-default}`
//! environment interpolation. Every option has a serde default, so a minimal
//! file only lists the strategy sequence.
//!
//! # Usage
//!
//! ```rust,ignore
//! use zerodte_engine::config::load_config;
//!
//! let config = load_config(Some("config.yaml"))?;
//! println!("steps: {}", config.strategies.len());
//! ```

mod approval;
mod backtest;
mod connection;
mod environment;
mod observability;
mod session;
mod strategies;
mod underlying;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use approval::{ApprovalConfig, ApprovalModeKind};
pub use backtest::BacktestConfig;
pub use connection::ConnectionConfig;
pub use environment::{EnvironmentConfig, VALID_MODES};
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use session::SessionConfig;
pub use strategies::{HedgeExitConfig, StrategyConfig};
pub use underlying::UnderlyingConfig;

use crate::domain::guardrails::RiskLimits;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Run mode.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Traded index.
    #[serde(default)]
    pub underlying: UnderlyingConfig,
    /// Session hours and calendar.
    #[serde(default)]
    pub session: SessionConfig,
    /// Ordered strategy sequence.
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    /// When true, each step requires the previous one to have traded today.
    #[serde(default = "default_sequence_dependent")]
    pub sequence_dependent: bool,
    /// Risk limits.
    #[serde(default)]
    pub risk: RiskLimits,
    /// Approval gate.
    #[serde(default)]
    pub approval: ApprovalConfig,
    /// Broker reconnect policy.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Backtest replay.
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Logging.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

const fn default_sequence_dependent() -> bool {
    true
}

impl Config {
    /// Risk limits with the strategy order as the sequence when none is set.
    #[must_use]
    pub fn risk_limits(&self) -> RiskLimits {
        let mut limits = self.risk.clone();
        if limits.sequence.is_empty() && self.sequence_dependent {
            limits.sequence = self.strategies.iter().map(|s| s.name.clone()).collect();
        }
        limits
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// `path` defaults to `config.yaml`.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = cap.get(1).map_or("", |m| m.as_str());
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if !VALID_MODES.contains(&config.environment.mode.as_str()) {
        return invalid(format!("environment.mode must be one of: {VALID_MODES:?}"));
    }

    if config.underlying.strike_increment <= rust_decimal::Decimal::ZERO
        || config.underlying.multiplier <= rust_decimal::Decimal::ZERO
    {
        return invalid("underlying.strike_increment and multiplier must be positive".to_string());
    }

    if config.session.open >= config.session.close {
        return invalid("session.open must be before session.close".to_string());
    }
    if config.session.poll_interval_secs == 0 || config.session.quote_timeout_ms == 0 {
        return invalid("session.poll_interval_secs and quote_timeout_ms must be positive".to_string());
    }

    if config.strategies.is_empty() {
        return invalid("at least one strategy is required".to_string());
    }
    let mut names = HashSet::new();
    for strategy in &config.strategies {
        strategy.validate().map_err(ConfigError::ValidationError)?;
        if !names.insert(strategy.name.as_str()) {
            return invalid(format!("duplicate strategy name '{}'", strategy.name));
        }
    }

    let limits = config.risk_limits();
    limits.validate().map_err(|e| ConfigError::ValidationError(format!("risk: {e}")))?;
    if let Some(unknown) = limits.sequence.iter().find(|s| !names.contains(s.as_str())) {
        return invalid(format!("risk.sequence names unknown strategy '{unknown}'"));
    }

    if config.connection.max_reconnect_attempts == 0 {
        return invalid("connection.max_reconnect_attempts must be positive".to_string());
    }

    if config.backtest.starting_capital <= rust_decimal::Decimal::ZERO {
        return invalid("backtest.starting_capital must be positive".to_string());
    }
    if let (Some(start), Some(end)) = (config.backtest.start_date, config.backtest.end_date)
        && start > end
    {
        return invalid("backtest.start_date must not be after end_date".to_string());
    }

    if !["json", "pretty"].contains(&config.observability.logging.format.as_str()) {
        return invalid("observability.logging.format must be json or pretty".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::guardrails::ApprovalMode;
    use crate::domain::trade::StructureKind;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r"
strategies:
  - name: iron_butterfly
    kind: iron_butterfly
    min_distance: 20
    max_distance: 100
";

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = match load_config_from_string(MINIMAL) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };

        assert_eq!(config.environment.mode, "BACKTEST");
        assert_eq!(config.underlying.option_prefix, "SPXW");
        assert_eq!(config.underlying.strike_increment, dec!(5));
        assert_eq!(config.session.poll_interval_secs, 60);
        assert_eq!(config.risk.max_contracts_per_trade, 40);
        assert_eq!(config.connection.max_reconnect_attempts, 5);
        assert_eq!(config.backtest.starting_capital, dec!(100000));
        assert_eq!(config.observability.logging.format, "json");

        let step = &config.strategies[0];
        assert_eq!(step.kind, StructureKind::IronButterfly);
        assert_eq!(step.quantity, 1);
        assert_eq!(step.distance_step, dec!(5));
        assert_eq!(step.signal.consecutive_candles, 3);
        assert!(matches!(config.approval.to_mode(), ApprovalMode::TimedAuto { .. }));
    }

    #[test]
    fn test_sequence_defaults_to_strategy_order() {
        let yaml = r"
strategies:
  - name: fly
    kind: iron_butterfly
    min_distance: 20
    max_distance: 100
  - name: hedge
    kind: strangle
    min_distance: 10
    max_distance: 10
";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.risk_limits().sequence, vec!["fly".to_string(), "hedge".to_string()]);

        let independent = format!("sequence_dependent: false\n{yaml}");
        let config = load_config_from_string(&independent).unwrap();
        assert!(config.risk_limits().sequence.is_empty());
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "mode: ${ZERODTE_CONFIG_TEST_NONEXISTENT_VAR:-PAPER}";
        assert_eq!(interpolate_env_vars(input), "mode: PAPER");
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "path: ${ZERODTE_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "path: ");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let result = interpolate_env_vars("path: ${PATH:-default}");
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_validation_requires_strategies() {
        let Err(err) = load_config_from_string("environment:\n  mode: PAPER\n") else {
            panic!("expected error without strategies");
        };
        assert!(err.to_string().contains("at least one strategy"));
    }

    #[test]
    fn test_validation_invalid_environment_mode() {
        let yaml = format!("environment:\n  mode: LIVE\n{MINIMAL}");
        let Err(err) = load_config_from_string(&yaml) else {
            panic!("expected error for invalid mode");
        };
        assert!(err.to_string().contains("mode"));
    }

    #[test]
    fn test_validation_rejects_inverted_distances() {
        let yaml = r"
strategies:
  - name: fly
    kind: iron_butterfly
    min_distance: 100
    max_distance: 20
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for inverted distances");
        };
        assert!(err.to_string().contains("min_distance"));
    }

    #[test]
    fn test_validation_rejects_duplicate_names() {
        let yaml = format!("{MINIMAL}  - name: iron_butterfly\n    kind: iron_condor\n    min_distance: 10\n    max_distance: 50\n");
        let Err(err) = load_config_from_string(&yaml) else {
            panic!("expected error for duplicate names");
        };
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
environment:
  mode: PAPER
underlying:
  symbol: SPX
  volume_proxy: SPY
  option_prefix: SPXW
  vix_symbol: null
session:
  open: "09:30:00"
  close: "16:00:00"
  poll_interval_secs: 30
  holidays: ["2025-11-27", "2025-12-25"]
strategies:
  - name: iron_butterfly
    kind: iron_butterfly
    quantity: 2
    min_distance: 20
    max_distance: 100
    target_ratio: 1.5
    wing_floor: 20
    max_spread_pct: 0.25
    signal:
      consecutive_candles: 4
      range_baseline: since_open
  - name: hedge
    kind: strangle
    min_distance: 10
    max_distance: 10
    hedge_exit:
      profit_multiple: 3
      exit_fraction: 0.5
risk:
  max_daily_loss: 8000
  vix_ceiling: 30.0
approval:
  mode: MANUAL
  timeout_seconds: 120
connection:
  reconnect_delay_ms: 1000
  max_reconnect_attempts: 3
observability:
  logging:
    level: debug
    format: pretty
"#;
        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert_eq!(config.underlying.vix_symbol, None);
        assert_eq!(config.session.holidays.len(), 2);
        assert!(!config.session.calendar().is_trading_day(chrono::NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()));
        assert_eq!(config.strategies[0].quantity, 2);
        assert_eq!(config.strategies[0].target_ratio, dec!(1.5));
        assert_eq!(config.strategies[0].signal.consecutive_candles, 4);
        assert_eq!(config.strategies[1].hedge_exit.unwrap().profit_multiple, dec!(3));
        assert_eq!(config.risk.max_daily_loss, dec!(8000));
        assert_eq!(config.risk.vix_ceiling, Some(30.0));
        assert_eq!(
            config.approval.to_mode(),
            ApprovalMode::Manual {
                timeout: Some(chrono::Duration::seconds(120))
            }
        );
        assert_eq!(config.connection.reconnect_delay(), std::time::Duration::from_secs(1));
        assert_eq!(config.observability.logging.level, "debug");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.strategies.len(), 1);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let Err(err) = load_config(path.to_str()) else {
            panic!("expected read error");
        };
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
