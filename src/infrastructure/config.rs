use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::BillingRates;

/// Outbound mail provider settings. Absent means notices are only logged.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
}

/// Bootstrap administrator created on first start.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub cors_allowed_origins: Vec<String>,
    pub billing_rates: BillingRates,
    pub expiration_interval: Duration,
    pub mail: Option<MailConfig>,
    pub admin: Option<AdminBootstrap>,
    pub seed_demo: bool,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = BillingRates::default();

        let mail = env::var("MAIL_API_URL").ok().map(|api_url| MailConfig {
            api_url,
            api_key: env::var("MAIL_API_KEY").ok(),
            from: env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@dormkeeper.local".into()),
        });

        let admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(AdminBootstrap {
                email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| format!("{}@dormkeeper.local", username)),
                username,
                password,
            }),
            _ => None,
        };

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://dormkeeper.db?mode=rwc".to_string()),
            port: parse_or("PORT", 8000),
            jwt_secret: jwt_secret(),
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", 60),
            refresh_token_ttl_days: parse_or("REFRESH_TOKEN_TTL_DAYS", 7),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(Vec::new),
            billing_rates: BillingRates {
                electric_per_unit: parse_or("RATE_ELECTRIC", defaults.electric_per_unit),
                water_per_unit: parse_or("RATE_WATER", defaults.water_per_unit),
                default_service_fee: parse_or("DEFAULT_SERVICE_FEE", defaults.default_service_fee),
            },
            expiration_interval: Duration::from_secs(parse_or("EXPIRATION_INTERVAL_SECS", 86_400)),
            mail,
            admin,
            seed_demo: env::var("SEED_DEMO").is_ok(),
        }
    }

    /// In-memory configuration for tests and embedded use.
    pub fn for_database(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 7,
            cors_allowed_origins: Vec::new(),
            billing_rates: BillingRates::default(),
            expiration_interval: Duration::from_secs(86_400),
            mail: None,
            admin: None,
            seed_demo: false,
        }
    }
}
