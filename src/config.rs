//! Service configuration from environment variables

use chrono_tz::Tz;
use std::env::VarError;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use crate::domain::value_objects::CurrencyFormat;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Merchant civil timezone used for availability verdicts.
    pub timezone: Tz,
    pub messaging_host: String,
    pub currency: CurrencyFormat,
    pub presence_ttl: Duration,
    pub presence_sweep_interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Load configuration, reading `.env` first when present.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Parse configuration through `lookup` so tests can supply a plain map.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).map(|v| v.trim().to_string()).unwrap_or_else(|_| default.to_string())
    };
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar { var: var.to_string(), reason };

    let parse_secs = |var: &str, default: &str| -> Result<Duration, ConfigError> {
        let secs = or_default(var, default).parse::<u64>().map_err(|e| invalid(var, e.to_string()))?;
        if secs == 0 {
            return Err(invalid(var, "must be greater than zero".into()));
        }
        Ok(Duration::from_secs(secs))
    };

    let bind_addr = or_default("STOREFRONT_BIND_ADDR", "0.0.0.0:8083")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("STOREFRONT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("STOREFRONT_LOG_LEVEL", "info");
    let timezone = or_default("STOREFRONT_TIMEZONE", "America/Sao_Paulo")
        .parse::<Tz>()
        .map_err(|e| invalid("STOREFRONT_TIMEZONE", e.to_string()))?;

    let messaging_host = or_default("STOREFRONT_MESSAGING_HOST", "wa.me");
    if messaging_host.is_empty() || messaging_host.contains('/') {
        return Err(invalid("STOREFRONT_MESSAGING_HOST", "expected a bare host name".into()));
    }

    let currency_code = or_default("STOREFRONT_CURRENCY", "BRL");
    let currency = CurrencyFormat::from_code(&currency_code)
        .ok_or_else(|| invalid("STOREFRONT_CURRENCY", format!("unsupported currency {currency_code:?}, expected BRL or USD")))?;

    let presence_ttl = parse_secs("STOREFRONT_PRESENCE_TTL_SECS", "60")?;
    let presence_sweep_interval = parse_secs("STOREFRONT_PRESENCE_SWEEP_SECS", "30")?;

    Ok(AppConfig { bind_addr, log_level, timezone, messaging_host, currency, presence_ttl, presence_sweep_interval })
}
