//! Runtime configuration
//!
//! Loaded from a `key=value` text file (`#` comments and blank lines
//! allowed). Unknown keys are ignored and every key has a default, so an
//! empty or absent file yields a complete demo configuration.

use crate::orderbook::MAX_DEPTH;
use crate::risk::RiskLimits;
use anyhow::{Context, Result};
use config::{Config as ConfigLoader, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Network.
    pub market_data_multicast_ip: String,
    pub market_data_port: u16,
    pub order_gateway_ip: String,
    pub order_gateway_port: u16,

    // CPU affinity.
    pub market_data_cpu: i32,
    pub strategy_cpu: i32,
    pub order_manager_cpu: i32,

    // Risk limits.
    pub max_position_size: f64,
    pub max_order_size: f64,
    pub max_notional: f64,
    pub max_orders_per_second: u32,

    // Strategy parameters.
    pub spread_threshold: f64,
    pub quote_size: f64,
    pub skew_factor: f64,
    pub edge: f64,
    pub tick_size: f64,

    // Instruments, comma separated.
    pub symbols: String,

    // Performance.
    pub order_book_depth: usize,
    pub enable_kernel_bypass: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market_data_multicast_ip: "239.1.1.1".to_string(),
            market_data_port: 9000,
            order_gateway_ip: "127.0.0.1".to_string(),
            order_gateway_port: 8000,
            market_data_cpu: 1,
            strategy_cpu: 2,
            order_manager_cpu: 3,
            max_position_size: 1000.0,
            max_order_size: 100.0,
            max_notional: 1_000_000.0,
            max_orders_per_second: 100,
            spread_threshold: 0.0001,
            quote_size: 100.0,
            skew_factor: 0.5,
            edge: 0.0001,
            tick_size: 0.01,
            symbols: "AAPL,MSFT,GOOGL".to_string(),
            order_book_depth: MAX_DEPTH,
            enable_kernel_bypass: false,
        }
    }
}

impl Config {
    /// Load configuration from a `key=value` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = Config::default();

        let loader = ConfigLoader::builder()
            .set_default("market_data_multicast_ip", defaults.market_data_multicast_ip)?
            .set_default("market_data_port", defaults.market_data_port as i64)?
            .set_default("order_gateway_ip", defaults.order_gateway_ip)?
            .set_default("order_gateway_port", defaults.order_gateway_port as i64)?
            .set_default("market_data_cpu", defaults.market_data_cpu as i64)?
            .set_default("strategy_cpu", defaults.strategy_cpu as i64)?
            .set_default("order_manager_cpu", defaults.order_manager_cpu as i64)?
            .set_default("max_position_size", defaults.max_position_size)?
            .set_default("max_order_size", defaults.max_order_size)?
            .set_default("max_notional", defaults.max_notional)?
            .set_default(
                "max_orders_per_second",
                defaults.max_orders_per_second as i64,
            )?
            .set_default("spread_threshold", defaults.spread_threshold)?
            .set_default("quote_size", defaults.quote_size)?
            .set_default("skew_factor", defaults.skew_factor)?
            .set_default("edge", defaults.edge)?
            .set_default("tick_size", defaults.tick_size)?
            .set_default("symbols", defaults.symbols)?
            .set_default("order_book_depth", defaults.order_book_depth as i64)?
            .set_default("enable_kernel_bypass", defaults.enable_kernel_bypass)?
            .add_source(File::from(path.as_ref()).format(FileFormat::Ini))
            .build()
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;

        let cfg: Config = loader
            .try_deserialize()
            .context("failed to parse configuration values")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.market_data_port == 0 {
            anyhow::bail!("market_data_port must be nonzero");
        }
        if self.order_gateway_port == 0 {
            anyhow::bail!("order_gateway_port must be nonzero");
        }
        if self.max_position_size <= 0.0 {
            anyhow::bail!("max_position_size must be positive");
        }
        if self.max_order_size <= 0.0 {
            anyhow::bail!("max_order_size must be positive");
        }
        if self.max_notional <= 0.0 {
            anyhow::bail!("max_notional must be positive");
        }
        if self.max_orders_per_second == 0 {
            anyhow::bail!("max_orders_per_second must be nonzero");
        }
        if self.quote_size <= 0.0 {
            anyhow::bail!("quote_size must be positive");
        }
        if self.tick_size <= 0.0 {
            anyhow::bail!("tick_size must be positive");
        }
        if self.spread_threshold < 0.0 {
            anyhow::bail!("spread_threshold must not be negative");
        }
        if !(0.0..=1.0).contains(&self.skew_factor) {
            anyhow::bail!(
                "skew_factor {} out of range [0, 1]",
                self.skew_factor
            );
        }
        if self.order_book_depth == 0 || self.order_book_depth > MAX_DEPTH {
            anyhow::bail!(
                "order_book_depth {} out of range [1, {}]",
                self.order_book_depth,
                MAX_DEPTH
            );
        }
        if self.symbol_list().is_empty() {
            anyhow::bail!("symbols must name at least one instrument");
        }
        Ok(())
    }

    /// The configured symbols, trimmed and without empties.
    pub fn symbol_list(&self) -> Vec<&str> {
        self.symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Risk limits derived from the configured values.
    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            max_order_size: self.max_order_size,
            max_position: self.max_position_size,
            max_notional: self.max_notional,
            max_orders_per_second: self.max_orders_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn loads_key_value_file_with_comments() {
        let file = write_config(
            "# network\n\
             market_data_port=9100\n\
             \n\
             max_position_size=500\n\
             enable_kernel_bypass=true\n",
        );
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.market_data_port, 9100);
        assert_eq!(cfg.max_position_size, 500.0);
        assert!(cfg.enable_kernel_bypass);
        // Untouched keys keep their defaults.
        assert_eq!(cfg.order_gateway_port, 8000);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let file = write_config("some_future_option=7\nmarket_data_port=9001\n");
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.market_data_port, 9001);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let file = write_config("max_order_size=-5\n");
        assert!(Config::load(file.path()).is_err());

        let file = write_config("order_book_depth=99\n");
        assert!(Config::load(file.path()).is_err());

        let file = write_config("skew_factor=1.5\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn symbol_list_splits_and_trims() {
        let file = write_config("symbols=AAPL, MSFT ,GOOGL\n");
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.symbol_list(), vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/mako.conf").is_err());
    }
}
