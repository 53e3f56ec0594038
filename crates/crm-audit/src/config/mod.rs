use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub cache: CacheConfig,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cache = CacheConfig {
            max_entries: parse_var("APP_CACHE_MAX_ENTRIES", 1_000)?,
            ttl: Duration::from_secs(parse_var("APP_CACHE_TTL_SECS", 60)?),
        };

        let tier_one_ad_spend: f64 = parse_var("APP_TIER1_AD_SPEND", 5_000.0)?;
        if !tier_one_ad_spend.is_finite() {
            return Err(ConfigError::InvalidNumber {
                name: "APP_TIER1_AD_SPEND",
                value: tier_one_ad_spend.to_string(),
            });
        }

        let auditors = env::var("APP_AUDITORS")
            .unwrap_or_else(|_| "admin".to_string())
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if auditors.is_empty() {
            return Err(ConfigError::MissingAuditors);
        }

        let new_company_days: i64 = parse_var("APP_NEW_COMPANY_DAYS", 60)?;
        if new_company_days <= 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_NEW_COMPANY_DAYS",
                value: new_company_days.to_string(),
                expected: "greater than zero",
            });
        }

        let reminder_horizon_days: i64 = parse_var("APP_REMINDER_HORIZON_DAYS", 3)?;
        if reminder_horizon_days < 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_REMINDER_HORIZON_DAYS",
                value: reminder_horizon_days.to_string(),
                expected: "zero or more",
            });
        }

        let scheduling = SchedulingConfig {
            tier_one_ad_spend,
            new_company_days,
            overdue_sweep_interval: Duration::from_secs(parse_var("APP_OVERDUE_SWEEP_SECS", 300)?),
            reminder_horizon_days,
            auditors,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            cache,
            scheduling,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bounds for the read-side response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl: Duration,
}

/// Tier thresholds, sweep cadence, and the auditors allowed to own audits.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub tier_one_ad_spend: f64,
    pub new_company_days: i64,
    /// Zero disables the background overdue sweep.
    pub overdue_sweep_interval: Duration,
    pub reminder_horizon_days: i64,
    pub auditors: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
    OutOfRange {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    MissingAuditors,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be numeric (found '{value}')")
            }
            ConfigError::OutOfRange {
                name,
                value,
                expected,
            } => write!(f, "{name} must be {expected} (found '{value}')"),
            ConfigError::MissingAuditors => {
                write!(f, "APP_AUDITORS must list at least one user id")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. }
            | ConfigError::MissingAuditors => None,
        }
    }
}
