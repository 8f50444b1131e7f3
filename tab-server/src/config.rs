//! Tab server configuration

use crate::reconcile::RemovalPolicy;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tab server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL (in-memory store when absent in development)
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub http_port: u16,
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    pub request_timeout_secs: u64,
    /// What a removal larger than the stored quantity does
    pub removal_policy: RemovalPolicy,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(
        name: &str,
        value: Option<String>,
        environment: &str,
    ) -> Result<String, BoxError> {
        let val = match value {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables (after `.env`)
    pub fn from_env() -> Result<Self, BoxError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        if database_url.is_none() && environment != "development" {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        let removal_policy = match lookup("ORDER_REMOVAL_POLICY") {
            Some(raw) => raw.parse::<RemovalPolicy>()?,
            None => RemovalPolicy::default(),
        };

        Ok(Self {
            database_url,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            http_port: lookup("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", lookup("JWT_SECRET"), &environment)?,
            request_timeout_secs: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|p| p.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(30),
            removal_policy,
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
