//! Configuration management for Lendflow
//!
//! Configuration is loaded from environment variables (optionally via a
//! `.env` file) and validated once at start-up.

use std::env;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Loan workflow thresholds and fee settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Guarantors (with name and national ID) needed to initiate an individual loan
    pub min_individual_guarantors: usize,

    /// Accepted guarantors needed before approval and disbursement
    pub min_accepted_guarantors: i64,

    /// Lowest 5 C's total accepted without explicit confirmation
    pub assessment_pass_score: i32,

    /// Distinct approvers needed to move a loan to approved
    pub required_approvals: usize,

    /// Processing fee in basis points of principal
    pub processing_fee_bps: i64,

    /// Insurance fee in basis points of principal
    pub insurance_fee_bps: i64,

    /// Savings balance a client must hold, as a percentage of principal.
    /// `None` disables the rule.
    pub savings_requirement_pct: Option<i64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_individual_guarantors: 3,
            min_accepted_guarantors: 1,
            assessment_pass_score: 18,
            required_approvals: 1,
            processing_fee_bps: 0,
            insurance_fee_bps: 0,
            savings_requirement_pct: None,
        }
    }
}

impl WorkflowConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let savings_requirement_pct = match env::var("SAVINGS_REQUIREMENT_PCT") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_value::<i64>(
                "SAVINGS_REQUIREMENT_PCT",
                &raw,
            )?),
            _ => None,
        };

        let workflow = Self {
            min_individual_guarantors: parse_or(
                "MIN_INDIVIDUAL_GUARANTORS",
                defaults.min_individual_guarantors,
            )?,
            min_accepted_guarantors: parse_or(
                "MIN_ACCEPTED_GUARANTORS",
                defaults.min_accepted_guarantors,
            )?,
            assessment_pass_score: parse_or(
                "ASSESSMENT_PASS_SCORE",
                defaults.assessment_pass_score,
            )?,
            required_approvals: parse_or("REQUIRED_APPROVALS", defaults.required_approvals)?,
            processing_fee_bps: parse_or("PROCESSING_FEE_BPS", defaults.processing_fee_bps)?,
            insurance_fee_bps: parse_or("INSURANCE_FEE_BPS", defaults.insurance_fee_bps)?,
            savings_requirement_pct,
        };
        workflow.validate()?;
        Ok(workflow)
    }

    /// Reject settings that would weaken the loan gates or break disbursement
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::InvalidValue(message.to_string()));

        if !(5..=25).contains(&self.assessment_pass_score) {
            return invalid("ASSESSMENT_PASS_SCORE must be between 5 and 25");
        }
        if self.required_approvals == 0 {
            return invalid("REQUIRED_APPROVALS must be at least 1");
        }
        if self.min_accepted_guarantors < 1 {
            return invalid("MIN_ACCEPTED_GUARANTORS must be at least 1");
        }
        if self.processing_fee_bps < 0 || self.insurance_fee_bps < 0 {
            return invalid("PROCESSING_FEE_BPS and INSURANCE_FEE_BPS must not be negative");
        }
        if self.processing_fee_bps.saturating_add(self.insurance_fee_bps) >= 10_000 {
            return invalid("PROCESSING_FEE_BPS and INSURANCE_FEE_BPS must sum to less than 10000");
        }
        if let Some(pct) = self.savings_requirement_pct {
            if !(0..=100).contains(&pct) {
                return invalid("SAVINGS_REQUIREMENT_PCT must be between 0 and 100");
            }
        }
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// CORS allowed origins (comma separated)
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,

    /// Refresh token TTL in days (default: 7)
    pub jwt_refresh_token_ttl_days: i64,

    /// Base URL of the payment rail; transfers are simulated when unset
    pub payment_rail_url: Option<String>,

    /// Payment rail request timeout in seconds
    pub payment_rail_timeout_seconds: u64,

    /// Super admin created on start-up when the users table is empty
    pub bootstrap_admin: Option<BootstrapAdmin>,

    /// Loan workflow settings
    pub workflow: WorkflowConfig,
}

/// Credentials for the first super admin
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"****")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = match env::var("ENVIRONMENT") {
            Ok(s) => s.parse::<Environment>()?,
            Err(_) => Environment::Development,
        };

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        if environment.is_production() && jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
        }

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            rate_limit_rps: parse_or("RATE_LIMIT_RPS", 100)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            jwt_secret,
            jwt_access_token_ttl_seconds: parse_or("JWT_ACCESS_TOKEN_TTL_SECONDS", 900)?,
            jwt_refresh_token_ttl_days: parse_or("JWT_REFRESH_TOKEN_TTL_DAYS", 7)?,
            payment_rail_url: env::var("PAYMENT_RAIL_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            payment_rail_timeout_seconds: parse_or("PAYMENT_RAIL_TIMEOUT_SECONDS", 15)?,
            bootstrap_admin: match (
                env::var("BOOTSTRAP_ADMIN_EMAIL"),
                env::var("BOOTSTRAP_ADMIN_PASSWORD"),
            ) {
                (Ok(email), Ok(password)) if !email.trim().is_empty() && !password.is_empty() => {
                    Some(BootstrapAdmin { email, password })
                }
                _ => None,
            },
            workflow: WorkflowConfig::from_env()?,
        })
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} has invalid value '{}'", key, raw)))
}
