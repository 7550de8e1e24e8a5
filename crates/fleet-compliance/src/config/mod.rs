use crate::workflows::compliance::ExpiryWindows;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MAIL_SENDER: &str = "noreply@fleetcare.com";
const DEFAULT_SMTP_HOST: &str = "smtp.sendgrid.net";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_USERNAME: &str = "apikey";

/// Longest accepted scan interval: one year.
pub const MAX_SCAN_INTERVAL_HOURS: u64 = 24 * 366;
/// Longest accepted reminder, cool-down or dashboard window: one hundred years.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

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
    pub monitor: MonitorConfig,
    pub mail: MailConfig,
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

        let monitor = MonitorConfig {
            scan_interval_hours: bounded_var(
                "APP_SCAN_INTERVAL_HOURS",
                24,
                MAX_SCAN_INTERVAL_HOURS,
            )?,
            scan_on_startup: flag_var("APP_SCAN_ON_STARTUP")?,
            reminder_window_days: bounded_var("APP_REMINDER_WINDOW_DAYS", 15, MAX_WINDOW_DAYS)?,
            cool_down_days: bounded_var("APP_NOTIFICATION_COOLDOWN_DAYS", 7, MAX_WINDOW_DAYS)?,
            dashboard_horizon_days: bounded_var(
                "APP_DASHBOARD_HORIZON_DAYS",
                30,
                MAX_WINDOW_DAYS,
            )?,
        };

        let mail = MailConfig {
            api_key: env::var("APP_MAIL_API_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            sender: env::var("APP_MAIL_SENDER").unwrap_or_else(|_| DEFAULT_MAIL_SENDER.to_string()),
            smtp_host: env::var("APP_MAIL_SMTP_HOST")
                .unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: bounded_var("APP_MAIL_SMTP_PORT", DEFAULT_SMTP_PORT, u16::MAX)?,
            smtp_username: env::var("APP_MAIL_SMTP_USERNAME")
                .unwrap_or_else(|_| DEFAULT_SMTP_USERNAME.to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            monitor,
            mail,
        })
    }
}

/// A positive number no larger than `max`, or `default` when unset.
fn bounded_var<T>(name: &'static str, default: T, max: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + fmt::Display,
{
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber { name, value: raw.clone() })?;
    if value <= T::default() {
        return Err(ConfigError::NotPositive { name });
    }
    if value > max {
        return Err(ConfigError::OutOfRange {
            name,
            max: max.to_string(),
        });
    }
    Ok(value)
}

fn flag_var(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value: raw }),
        },
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Cadence and windows of the expiry scan.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub scan_interval_hours: u64,
    pub scan_on_startup: bool,
    pub reminder_window_days: i64,
    pub cool_down_days: i64,
    pub dashboard_horizon_days: i64,
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_hours.saturating_mul(60 * 60))
    }

    pub fn windows(&self) -> ExpiryWindows {
        ExpiryWindows::new(
            self.reminder_window_days,
            self.cool_down_days,
            self.dashboard_horizon_days,
        )
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_hours: 24,
            scan_on_startup: false,
            reminder_window_days: 15,
            cool_down_days: 7,
            dashboard_horizon_days: 30,
        }
    }
}

/// Outbound e-mail delivery over an authenticated SMTP relay. Delivery is disabled
/// while `api_key` is unset; the key doubles as the relay password.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub sender: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sender: DEFAULT_MAIL_SENDER.to_string(),
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_username: DEFAULT_SMTP_USERNAME.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
    NotPositive { name: &'static str },
    OutOfRange { name: &'static str, max: String },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a whole number (found '{value}')")
            }
            ConfigError::NotPositive { name } => write!(f, "{name} must be greater than zero"),
            ConfigError::OutOfRange { name, max } => write!(f, "{name} must not exceed {max}"),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false (found '{value}')")
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
            | ConfigError::NotPositive { .. }
            | ConfigError::OutOfRange { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_SCAN_INTERVAL_HOURS",
            "APP_SCAN_ON_STARTUP",
            "APP_REMINDER_WINDOW_DAYS",
            "APP_NOTIFICATION_COOLDOWN_DAYS",
            "APP_DASHBOARD_HORIZON_DAYS",
            "APP_MAIL_API_KEY",
            "APP_MAIL_SENDER",
            "APP_MAIL_SMTP_HOST",
            "APP_MAIL_SMTP_PORT",
            "APP_MAIL_SMTP_USERNAME",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.monitor.scan_interval(), Duration::from_secs(86_400));
        assert!(!config.monitor.scan_on_startup);
        assert_eq!(config.monitor.windows(), ExpiryWindows::default());
        assert!(config.mail.api_key.is_none());
        assert_eq!(config.mail.sender, "noreply@fleetcare.com");
        assert_eq!(config.mail.smtp_host, "smtp.sendgrid.net");
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.smtp_username, "apikey");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn monitor_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SCAN_INTERVAL_HOURS", "6");
        env::set_var("APP_SCAN_ON_STARTUP", "true");
        env::set_var("APP_NOTIFICATION_COOLDOWN_DAYS", "3");
        env::set_var("APP_MAIL_API_KEY", "key-123");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.monitor.scan_interval(), Duration::from_secs(6 * 3600));
        assert!(config.monitor.scan_on_startup);
        assert_eq!(config.monitor.cool_down_days, 3);
        assert_eq!(config.mail.api_key.as_deref(), Some("key-123"));
    }

    #[test]
    fn rejects_zero_scan_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SCAN_INTERVAL_HOURS", "0");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(
            result,
            Err(ConfigError::NotPositive {
                name: "APP_SCAN_INTERVAL_HOURS"
            })
        ));
    }

    #[test]
    fn rejects_unparseable_flags() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SCAN_ON_STARTUP", "sometimes");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(result, Err(ConfigError::InvalidFlag { .. })));
    }

    #[test]
    fn rejects_windows_beyond_the_calendar() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_REMINDER_WINDOW_DAYS", "200000000000");
        let err = AppConfig::load().expect_err("window is rejected");
        reset_env();

        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                name: "APP_REMINDER_WINDOW_DAYS",
                ..
            }
        ));
        assert_eq!(err.to_string(), "APP_REMINDER_WINDOW_DAYS must not exceed 36500");
    }

    #[test]
    fn rejects_scan_interval_longer_than_a_year() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SCAN_INTERVAL_HOURS", "18446744073709551615");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange {
                name: "APP_SCAN_INTERVAL_HOURS",
                ..
            })
        ));
    }

    #[test]
    fn largest_accepted_windows_build_without_panicking() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DASHBOARD_HORIZON_DAYS", MAX_WINDOW_DAYS.to_string());
        env::set_var("APP_SCAN_INTERVAL_HOURS", MAX_SCAN_INTERVAL_HOURS.to_string());
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(
            config.monitor.windows().horizon(),
            chrono::Duration::days(MAX_WINDOW_DAYS)
        );
        assert_eq!(
            config.monitor.scan_interval(),
            Duration::from_secs(MAX_SCAN_INTERVAL_HOURS * 3600)
        );
    }
}
