use std::env;
use std::fmt;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/eventhub";
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_PAYMENTS_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone)]
pub struct PaymentsConfig {
    pub secret_key: Option<String>,
    pub api_base: String,
}

impl fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub allowed_origins: String,
    /// Enables HSTS.
    pub production: bool,
    pub payments: PaymentsConfig,
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Config: invalid value '{}' for {}, using default", value, key);
            default
        }),
        None => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let production = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            ),
            port: parse_or("PORT", lookup("PORT"), DEFAULT_PORT),
            allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| cors::DEFAULT_ALLOWED_ORIGINS.to_string()),
            production,
            payments: PaymentsConfig {
                secret_key: lookup("STRIPE_SECRET_KEY").filter(|key| !key.trim().is_empty()),
                api_base: lookup("STRIPE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_PAYMENTS_API_BASE.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 3001);
        assert_eq!(config.database_max_connections, 5);
        assert!(!config.production);
        assert!(config.payments.secret_key.is_none());
        assert_eq!(config.payments.api_base, "https://api.stripe.com");
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
            ("RUST_ENV", "Production"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_max_connections, 5);
        assert!(config.production);
        assert_eq!(config.payments.secret_key.as_deref(), Some("sk_test_123"));
    }

    #[test]
    fn test_secret_key_is_redacted() {
        let config = config_from(&[("STRIPE_SECRET_KEY", "sk_live_secret")]);
        assert!(!format!("{:?}", config).contains("sk_live_secret"));
    }
}
