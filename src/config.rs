use {
    crate::adapters::stripe::signature::DEFAULT_TOLERANCE,
    sqlx::postgres::PgConnectOptions,
    std::{fmt, str::FromStr, sync::Arc, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub stripe_webhook_secret: Arc<str>,
    pub signature_tolerance: Duration,
    pub database_url: String,
    /// Password of the privileged role the service connects as.
    pub database_service_key: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let stripe_webhook_secret = required("STRIPE_WEBHOOK_SECRET")?;
        let database_url = required("DATABASE_URL")?;
        let database_service_key = required("DATABASE_SERVICE_KEY")?;

        let signature_tolerance =
            parse_optional::<u64>(&lookup, "STRIPE_WEBHOOK_TOLERANCE_SECS")?
                .map_or(DEFAULT_TOLERANCE, Duration::from_secs);
        let request_timeout = Duration::from_secs(
            parse_optional::<u64>(&lookup, "REQUEST_TIMEOUT_SECS")?.unwrap_or(10),
        );
        let database_max_connections =
            parse_optional::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(20);
        let bind_addr = lookup("BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let config = Self {
            stripe_webhook_secret: stripe_webhook_secret.into(),
            signature_tolerance,
            database_url,
            database_service_key,
            database_max_connections,
            bind_addr,
            request_timeout,
        };
        config.connect_options()?;
        Ok(config)
    }

    /// Connection options for the service role: the URL with the service key
    /// as password.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let options =
            PgConnectOptions::from_str(&self.database_url).map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: "<redacted>".into(),
            })?;
        Ok(options.password(&self.database_service_key))
    }
}

fn parse_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("stripe_webhook_secret", &"<redacted>")
            .field("signature_tolerance", &self.signature_tolerance)
            .field("database_url", &"<redacted>")
            .field("database_service_key", &"<redacted>")
            .field("database_max_connections", &self.database_max_connections)
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
