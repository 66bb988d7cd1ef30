use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PaystackSettings {
    pub secret_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Where the hosted checkout redirects the payer after payment.
    #[serde(default)]
    pub callback_url: String,
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PaystackSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            api_base: default_api_base(),
            currency: default_currency(),
            callback_url: String::new(),
            timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paystack: PaystackSettings,
    pub server_port: u16,
    pub database_path: String,
    /// Bearer token gating the /internal endpoints. Empty disables them.
    #[serde(default)]
    pub admin_token: String,
    /// Hosted email API endpoint for contact notifications. Empty disables the relay.
    #[serde(default)]
    pub contact_notify_url: String,
    #[serde(default = "default_contact_rate_limit")]
    pub contact_rate_limit: u32,
    #[serde(default = "default_contact_rate_window", with = "humantime_serde")]
    pub contact_rate_window: Duration,
    #[serde(default = "default_reset_interval", with = "humantime_serde")]
    pub availability_reset_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paystack: PaystackSettings::default(),
            server_port: 8080,
            database_path: "data/bookings.redb".to_string(),
            admin_token: String::new(),
            contact_notify_url: String::new(),
            contact_rate_limit: default_contact_rate_limit(),
            contact_rate_window: default_contact_rate_window(),
            availability_reset_interval: default_reset_interval(),
        }
    }
}

impl Config {
    /// Load from config.toml (if present) and environment variables.
    /// Environment variables override file values.
    /// Supported env keys: PAYSTACK_SECRET_KEY, PAYSTACK_API_BASE, PAYSTACK_CURRENCY,
    /// PAYSTACK_CALLBACK_URL, PAYSTACK_TIMEOUT_MS, SERVER_PORT, DATABASE_PATH,
    /// ADMIN_TOKEN, CONTACT_NOTIFY_URL, CONTACT_RATE_LIMIT, CONTACT_RATE_WINDOW,
    /// AVAILABILITY_RESET_INTERVAL
    pub fn load() -> Self {
        // 1) Start with defaults + config.toml only if it exists
        let base: Config = Default::default();
        let mut fig = Figment::from(Serialized::defaults(base));
        if std::path::Path::new("config.toml").exists() {
            fig = fig.merge(Toml::file("config.toml"));
        }
        let mut cfg: Config = fig.extract().unwrap_or_default();

        // 2) Overlay environment variables explicitly
        if let Ok(v) = std::env::var("PAYSTACK_SECRET_KEY") {
            cfg.paystack.secret_key = v;
        }
        if let Ok(v) = std::env::var("PAYSTACK_API_BASE") {
            cfg.paystack.api_base = v;
        }
        if let Ok(v) = std::env::var("PAYSTACK_CURRENCY") {
            cfg.paystack.currency = v;
        }
        if let Ok(v) = std::env::var("PAYSTACK_CALLBACK_URL") {
            cfg.paystack.callback_url = v;
        }
        if let Ok(v) = std::env::var("PAYSTACK_TIMEOUT_MS") {
            cfg.paystack.timeout_ms = v.parse().unwrap_or(cfg.paystack.timeout_ms);
        }
        if let Ok(v) = std::env::var("SERVER_PORT") {
            cfg.server_port = v.parse().unwrap_or(cfg.server_port);
        }
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            cfg.database_path = v;
        }
        if let Ok(v) = std::env::var("ADMIN_TOKEN") {
            cfg.admin_token = v;
        }
        if let Ok(v) = std::env::var("CONTACT_NOTIFY_URL") {
            cfg.contact_notify_url = v;
        }
        if let Ok(v) = std::env::var("CONTACT_RATE_LIMIT") {
            cfg.contact_rate_limit = v.parse().unwrap_or(cfg.contact_rate_limit);
        }
        if let Ok(v) = std::env::var("CONTACT_RATE_WINDOW") {
            cfg.contact_rate_window = parse_duration_env(&v, cfg.contact_rate_window);
        }
        if let Ok(v) = std::env::var("AVAILABILITY_RESET_INTERVAL") {
            cfg.availability_reset_interval =
                parse_duration_env(&v, cfg.availability_reset_interval);
        }

        cfg
    }

    pub fn from_env() -> Self {
        Self::load()
    }
}

fn parse_duration_env(value: &str, current: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or(current)
}

fn default_api_base() -> String {
    "https://api.paystack.co".to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_gateway_timeout_ms() -> u64 {
    15_000
}

fn default_contact_rate_limit() -> u32 {
    5
}

fn default_contact_rate_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_reset_interval() -> Duration {
    Duration::from_secs(3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.server_port, 8080);
        assert_eq!(cfg.contact_rate_limit, 5);
        assert_eq!(cfg.contact_rate_window, Duration::from_secs(900));
        assert_eq!(cfg.paystack.currency, "NGN");
        assert!(cfg.paystack.api_base.starts_with("https://"));
    }
}
