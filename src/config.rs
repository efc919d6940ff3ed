//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API credentials, the anti-bot cookie) are referenced by env-var
//! name in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

use crate::types::RepricerError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub pricing: PricingConfig,
    pub api: ApiConfig,
    pub market: MarketConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Seller name of the merchant as the aggregator prints it.
    pub shop_name: String,
    pub price_update_enabled: bool,
    /// Fixed pause before every aggregator request.
    pub request_delay_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Evaluate only the first N catalog products.
    #[serde(default)]
    pub max_products: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    pub vat_rate: Decimal,
    pub minimum_discount: Decimal,
    /// Amount subtracted from a competitor's price when undercutting.
    pub under_best_price_amount: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub login_path: String,
    pub product_list_path: String,
    pub product_update_path: String,
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    pub search_url: String,
    pub search_param: String,
    /// Exact `<title>` of the aggregator's bot challenge page.
    pub challenge_title: String,
    pub user_agents: Vec<String>,
    /// Pin the TLS version for all connections ("1.2" or "1.3").
    #[serde(default)]
    pub tls_version: Option<String>,
    #[serde(default = "default_challenge_cookie_name")]
    pub challenge_cookie_name: String,
    #[serde(default)]
    pub challenge_cookie_domain: Option<String>,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// CSS selectors describing the aggregator's markup.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorConfig {
    /// Product links on the search result page.
    pub search_result_link: String,
    /// One competing offer on the detail page.
    pub offer: String,
    /// Price node, relative to `offer`.
    pub offer_price: String,
    /// Seller name node, relative to `offer`.
    pub offer_seller: String,
    pub product_name: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            search_result_link: "div.c-product-list a.c-product__link".into(),
            offer: "div.c-offer".into(),
            offer_price: ".c-offer__price".into(),
            offer_seller: ".c-offer__shop-name".into(),
            product_name: "h1.e-heading".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    pub username_env: String,
    pub password_env: String,
    /// Env var holding a pre-issued anti-bot cookie value, if any.
    #[serde(default)]
    pub challenge_cookie_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily-rotated log file. Stdout only when unset.
    pub file_dir: Option<String>,
    pub file_name: String,
    /// Rotated files kept on disk, the current one included.
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file_dir: None,
            file_name: "repricer.log".into(),
            max_log_files: 7,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_challenge_cookie_name() -> String {
    "bothunter".into()
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything serde cannot, reporting all problems at once.
    pub fn validate(&self) -> Result<(), RepricerError> {
        let mut issues: Vec<String> = Vec::new();

        if self.general.shop_name.trim().is_empty() {
            issues.push("general.shop_name must not be empty".into());
        }
        if self.general.request_timeout_secs == 0 {
            issues.push("general.request_timeout_secs must be > 0".into());
        }
        if self.general.max_products == Some(0) {
            issues.push("general.max_products must be > 0 when set".into());
        }

        if self.pricing.vat_rate < Decimal::ZERO {
            issues.push("pricing.vat_rate must be >= 0".into());
        }
        if self.pricing.minimum_discount <= Decimal::NEGATIVE_ONE {
            issues.push("pricing.minimum_discount must be > -1".into());
        }
        if self.pricing.under_best_price_amount < Decimal::ZERO {
            issues.push("pricing.under_best_price_amount must be >= 0".into());
        }

        if Url::parse(&self.api.base_url).is_err() {
            issues.push(format!("api.base_url is not a valid URL: {}", self.api.base_url));
        }
        if Url::parse(&self.market.search_url).is_err() {
            issues.push(format!(
                "market.search_url is not a valid URL: {}",
                self.market.search_url
            ));
        }
        if self.market.search_param.trim().is_empty() {
            issues.push("market.search_param must not be empty".into());
        }
        if self.market.challenge_title.trim().is_empty() {
            issues.push("market.challenge_title must not be empty".into());
        }
        if self.market.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            issues.push("market.user_agents must contain at least one user agent".into());
        }
        if let Some(ref version) = self.market.tls_version {
            if !matches!(version.as_str(), "1.2" | "1.3") {
                issues.push(format!("market.tls_version must be \"1.2\" or \"1.3\", got {version:?}"));
            }
        }

        if self.logging.file_dir.is_some() {
            if self.logging.file_name.trim().is_empty() {
                issues.push("logging.file_name must not be empty".into());
            }
            if self.logging.max_log_files == 0 {
                issues.push("logging.max_log_files must be > 0".into());
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(RepricerError::Config(issues.join("; ")))
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
