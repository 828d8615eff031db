// config.rs
use dotenv::dotenv;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, Result};

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.mercadopago.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEnvironment {
    Sandbox,
    Production,
}

impl FromStr for ProviderEnvironment {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" => Ok(ProviderEnvironment::Sandbox),
            "production" | "live" => Ok(ProviderEnvironment::Production),
            other => Err(AppError::configuration(format!(
                "PAYMENT_ENVIRONMENT must be sandbox or production, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub provider_base_url: String,
    pub access_token: String,
    pub environment: ProviderEnvironment,
    pub deep_link_scheme: String,
    pub return_url: Option<String>,
    pub tax_rate: Decimal,
    pub shipping_cost: Decimal,
    pub poll_interval: Duration,
    pub session_timeout: Option<Duration>,
    pub request_timeout: Duration,
    pub database_url: Option<String>,
    pub database_name: String,
    pub log_level: tracing::Level,
}

impl CheckoutConfig {
    /// Config with defaults for everything except the provider endpoint and token.
    pub fn new(provider_base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        CheckoutConfig {
            provider_base_url: provider_base_url.into(),
            access_token: access_token.into(),
            environment: ProviderEnvironment::Sandbox,
            deep_link_scheme: "grocer".to_string(),
            return_url: None,
            tax_rate: dec!(0.19),
            shipping_cost: Decimal::ZERO,
            poll_interval: Duration::from_millis(1000),
            session_timeout: Some(Duration::from_secs(900)),
            request_timeout: Duration::from_secs(30),
            database_url: None,
            database_name: "grocer".to_string(),
            log_level: tracing::Level::INFO,
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;

        info!("Payment environment: {:?}", config.environment);
        info!("Payment provider: {}", config.provider_base_url);

        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let access_token = get("PAYMENT_ACCESS_TOKEN")
            .ok_or_else(|| AppError::configuration("PAYMENT_ACCESS_TOKEN must be set"))?;
        let provider_base_url = get("PAYMENT_PROVIDER_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string());

        let mut config = CheckoutConfig::new(provider_base_url.trim_end_matches('/'), access_token);

        if let Some(environment) = get("PAYMENT_ENVIRONMENT") {
            config.environment = environment.parse()?;
        }
        if let Some(scheme) = get("CHECKOUT_DEEP_LINK_SCHEME") {
            config.deep_link_scheme = scheme.trim_end_matches("://").to_string();
        }
        config.return_url = get("CHECKOUT_RETURN_URL");
        if let Some(rate) = get("CHECKOUT_TAX_RATE") {
            config.tax_rate = Decimal::from_str(rate.trim())?;
            if config.tax_rate.is_sign_negative() || config.tax_rate >= Decimal::ONE {
                return Err(AppError::configuration("CHECKOUT_TAX_RATE must be in [0, 1)"));
            }
        }
        if let Some(shipping) = get("CHECKOUT_SHIPPING_COST") {
            config.shipping_cost = Decimal::from_str(shipping.trim())?;
        }
        if let Some(millis) = get("CHECKOUT_POLL_INTERVAL_MS") {
            let millis: u64 = millis.trim().parse()?;
            if millis == 0 {
                return Err(AppError::configuration("CHECKOUT_POLL_INTERVAL_MS must be positive"));
            }
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(secs) = get("CHECKOUT_SESSION_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse()?;
            config.session_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = get("PAYMENT_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse()?;
            if secs == 0 {
                return Err(AppError::configuration("PAYMENT_REQUEST_TIMEOUT_SECS must be positive"));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        config.database_url = get("DATABASE_URL");
        if let Some(name) = get("DATABASE_NAME") {
            config.database_name = name;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = tracing::Level::from_str(level.trim())
                .map_err(|_| AppError::configuration(format!("Unknown LOG_LEVEL {}", level)))?;
        }

        Ok(config)
    }

    pub fn preferences_url(&self) -> String {
        format!("{}/checkout/preferences", self.provider_base_url)
    }

    pub fn deep_link(&self, target: &str) -> String {
        format!("{}://{}", self.deep_link_scheme, target)
    }

    pub fn is_production(&self) -> bool {
        self.environment == ProviderEnvironment::Production
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": if self.is_production() { "production" } else { "sandbox" },
            "provider_base_url": self.provider_base_url,
            "access_token_set": !self.access_token.is_empty(),
            "deep_link_scheme": self.deep_link_scheme,
            "return_url": self.return_url,
            "tax_rate": self.tax_rate.to_string(),
            "shipping_cost": self.shipping_cost.to_string(),
            "poll_interval_ms": self.poll_interval.as_millis() as u64,
            "session_timeout_secs": self.session_timeout.map(|t| t.as_secs()),
            "database_configured": self.database_url.is_some(),
            "database_name": self.database_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = CheckoutConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn defaults_apply() {
        let config = CheckoutConfig::from_lookup(lookup(&[("PAYMENT_ACCESS_TOKEN", "TEST-123")])).unwrap();
        assert_eq!(config.tax_rate, dec!(0.19));
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.environment, ProviderEnvironment::Sandbox);
        assert_eq!(config.preferences_url(), "https://api.mercadopago.com/checkout/preferences");
        assert_eq!(config.deep_link("payment-success"), "grocer://payment-success");
    }

    #[test]
    fn overrides_are_parsed() {
        let config = CheckoutConfig::from_lookup(lookup(&[
            ("PAYMENT_ACCESS_TOKEN", "APP-1"),
            ("PAYMENT_PROVIDER_BASE_URL", "http://localhost:9000/"),
            ("PAYMENT_ENVIRONMENT", "production"),
            ("CHECKOUT_DEEP_LINK_SCHEME", "shop://"),
            ("CHECKOUT_TAX_RATE", "0.16"),
            ("CHECKOUT_SESSION_TIMEOUT_SECS", "0"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.provider_base_url, "http://localhost:9000");
        assert!(config.is_production());
        assert_eq!(config.deep_link_scheme, "shop");
        assert_eq!(config.tax_rate, dec!(0.16));
        assert_eq!(config.session_timeout, None);
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn rejects_bad_tax_rate() {
        let result = CheckoutConfig::from_lookup(lookup(&[
            ("PAYMENT_ACCESS_TOKEN", "APP-1"),
            ("CHECKOUT_TAX_RATE", "1.5"),
        ]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn rejects_zero_intervals() {
        for key in ["PAYMENT_REQUEST_TIMEOUT_SECS", "CHECKOUT_POLL_INTERVAL_MS"] {
            let result = CheckoutConfig::from_lookup(lookup(&[("PAYMENT_ACCESS_TOKEN", "APP-1"), (key, "0")]));
            assert!(matches!(result, Err(AppError::Configuration(_))), "{} = 0", key);
        }

        let config = CheckoutConfig::from_lookup(lookup(&[
            ("PAYMENT_ACCESS_TOKEN", "APP-1"),
            ("PAYMENT_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn summary_masks_token() {
        let config = CheckoutConfig::new("http://localhost", "secret-token");
        let summary = config.summary().to_string();
        assert!(!summary.contains("secret-token"));
        assert!(summary.contains("access_token_set"));
    }
}
