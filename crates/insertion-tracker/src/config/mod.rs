use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

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

const DEFAULT_ACTION_REQUIRED_AFTER_DAYS: i64 = 3;
const DEFAULT_SEEN_RATE_WINDOWS: &str = "30,15";
const DEFAULT_NOTIFICATION_SIGNATURE: &str = "Le service insertion";

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engagement: EngagementConfig,
    pub notifications: NotificationConfig,
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
        let ansi = match env::var("APP_LOG_ANSI") {
            Ok(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidLogAnsi)?,
            Err(_) => false,
        };
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => {
                LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat { value: raw })?
            }
            Err(_) => LogFormat::Compact,
        };

        let action_required_after_days = match env::var("APP_ACTION_REQUIRED_AFTER_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| *days >= 0 && Duration::try_days(*days).is_some())
                .ok_or(ConfigError::InvalidGracePeriod)?,
            Err(_) => DEFAULT_ACTION_REQUIRED_AFTER_DAYS,
        };

        let seen_rate_windows = parse_windows(
            &env::var("APP_SEEN_RATE_WINDOWS")
                .unwrap_or_else(|_| DEFAULT_SEEN_RATE_WINDOWS.to_string()),
        )?;

        let signature = env::var("APP_NOTIFICATION_SIGNATURE")
            .unwrap_or_else(|_| DEFAULT_NOTIFICATION_SIGNATURE.to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi,
                format,
            },
            engagement: EngagementConfig {
                action_required_after_days,
                seen_rate_windows,
            },
            notifications: NotificationConfig { signature },
        })
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

/// Line layout of the service log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
    pub format: LogFormat,
}

/// Follow-up and reporting dials for the engagement tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementConfig {
    pub action_required_after_days: i64,
    pub seen_rate_windows: Vec<u32>,
}

impl EngagementConfig {
    pub fn action_grace_period(&self) -> Duration {
        Duration::days(self.action_required_after_days)
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            action_required_after_days: DEFAULT_ACTION_REQUIRED_AFTER_DAYS,
            seen_rate_windows: vec![30, 15],
        }
    }
}

/// Rendering settings shared by the outbound message templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub signature: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            signature: DEFAULT_NOTIFICATION_SIGNATURE.to_string(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_windows(raw: &str) -> Result<Vec<u32>, ConfigError> {
    let mut windows = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let days = part
            .parse::<u32>()
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| ConfigError::InvalidSeenRateWindow {
                value: part.to_string(),
            })?;
        windows.push(days);
    }

    if windows.is_empty() {
        return Err(ConfigError::InvalidSeenRateWindow {
            value: raw.to_string(),
        });
    }

    Ok(windows)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogAnsi,
    InvalidLogFormat { value: String },
    InvalidGracePeriod,
    InvalidSeenRateWindow { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogAnsi => write!(f, "APP_LOG_ANSI must be a boolean"),
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'full' (got '{}')", value)
            }
            ConfigError::InvalidGracePeriod => write!(
                f,
                "APP_ACTION_REQUIRED_AFTER_DAYS must be a non-negative number of days"
            ),
            ConfigError::InvalidSeenRateWindow { value } => write!(
                f,
                "APP_SEEN_RATE_WINDOWS must list positive day counts (got '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogAnsi
            | ConfigError::InvalidLogFormat { .. }
            | ConfigError::InvalidGracePeriod
            | ConfigError::InvalidSeenRateWindow { .. } => None,
        }
    }
}
