use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available (neither XDG_CONFIG_HOME nor HOME is set)")]
    ConfigPathUnavailable,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub database: DatabaseSettings,
    pub monitor: MonitorSettings,
    pub login: LoginSettings,
    pub captcha: CaptchaSettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Per-probe timeout (`STATUS_TIMEOUT_MS`)
    pub status_timeout_ms: u64,
    /// Cadence of the background cycle (`CHECK_INTERVAL_MS`)
    pub check_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub window_minutes: i64,
    pub max_failures: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaSettings {
    pub enabled: bool,
    /// `recaptcha` or `turnstile`
    pub provider: String,
    pub recaptcha_secret_key: String,
    pub turnstile_secret_key: String,
    pub verify_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Bearer token guarding the on-demand status check; empty disables the endpoint.
    pub token: String,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 3000 }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { path: "navwatch.db".into(), max_connections: 8 }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { status_timeout_ms: 8_000, check_interval_ms: 300_000 }
    }
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self { window_minutes: 15, max_failures: 5 }
    }
}

impl Default for CaptchaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "recaptcha".into(),
            recaptcha_secret_key: String::new(),
            turnstile_secret_key: String::new(),
            verify_timeout_ms: 5_000,
        }
    }
}

impl MonitorSettings {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

/// Longest accepted login window: one year.
pub const MAX_WINDOW_MINUTES: i64 = 365 * 24 * 60;

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/navwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("navwatch/config.toml"))
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "(unset)" } else { "********" }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;
        write_1(f, "Max Connections", &self.database.max_connections)?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Status Timeout (ms)", &self.monitor.status_timeout_ms)?;
        write_1(f, "Check Interval (ms)", &self.monitor.check_interval_ms)?;
        write_title_1(f, "Login Guard")?;
        write_1(f, "Window (minutes)", &self.login.window_minutes)?;
        write_1(f, "Max Failures", &self.login.max_failures)?;
        write_title_1(f, "Captcha")?;
        write_1(f, "Enabled", &self.captcha.enabled)?;
        write_1(f, "Provider", &self.captcha.provider)?;
        write_1(f, "reCAPTCHA Secret", &redact(&self.captcha.recaptcha_secret_key))?;
        write_1(f, "Turnstile Secret", &redact(&self.captcha.turnstile_secret_key))?;
        write_title_1(f, "Admin")?;
        write_1(f, "Token", &redact(&self.admin.token))?;

        Ok(())
    }
}

/// Parse an environment override into `target`, leaving it untouched when unset.
fn override_from_env<T: FromStr>(name: &str, target: &mut T) -> Result<(), ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            *target = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: name.to_string(), value: raw })?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/navwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// let cfg = navwatch::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), navwatch::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::ReadFailed)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(ConfigError::WriteFailed)
    }

    /// Let the environment win over the file, so deployments can tune the
    /// guard and the monitor without touching code or config files.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        override_from_env("BIND", &mut self.server.bind)?;
        override_from_env("PORT", &mut self.server.port)?;
        override_from_env("DATABASE_PATH", &mut self.database.path)?;
        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections)?;
        override_from_env("STATUS_TIMEOUT_MS", &mut self.monitor.status_timeout_ms)?;
        override_from_env("CHECK_INTERVAL_MS", &mut self.monitor.check_interval_ms)?;
        override_from_env("LOGIN_WINDOW_MINUTES", &mut self.login.window_minutes)?;
        override_from_env("LOGIN_MAX_FAILURES", &mut self.login.max_failures)?;
        override_from_env("CAPTCHA_ENABLED", &mut self.captcha.enabled)?;
        override_from_env("CAPTCHA_PROVIDER", &mut self.captcha.provider)?;
        override_from_env("RECAPTCHA_SECRET_KEY", &mut self.captcha.recaptcha_secret_key)?;
        override_from_env("TURNSTILE_SECRET_KEY", &mut self.captcha.turnstile_secret_key)?;
        override_from_env("ADMIN_TOKEN", &mut self.admin.token)?;
        Ok(())
    }

    /// Reject settings the guard or the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, value: &dyn fmt::Display| ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };

        if self.monitor.status_timeout_ms == 0 {
            return Err(invalid("monitor.status_timeout_ms", &self.monitor.status_timeout_ms));
        }
        if self.monitor.check_interval_ms == 0 {
            return Err(invalid("monitor.check_interval_ms", &self.monitor.check_interval_ms));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.login.window_minutes) {
            return Err(invalid("login.window_minutes", &self.login.window_minutes));
        }
        if self.login.max_failures < 1 {
            return Err(invalid("login.max_failures", &self.login.max_failures));
        }
        match self.captcha.provider.as_str() {
            "recaptcha" | "turnstile" => Ok(()),
            other => Err(invalid("captcha.provider", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.status_timeout_ms, 8_000);
        assert_eq!(config.monitor.check_interval_ms, 300_000);
        assert_eq!(config.login.window_minutes, 15);
        assert_eq!(config.login.max_failures, 5);
        assert!(!config.captcha.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("navwatch");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(dir.path().join("navwatch.toml").exists());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[monitor]\nstatus_timeout_ms = 2000\n").unwrap();

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.monitor.status_timeout_ms, 2_000);
        assert_eq!(config.monitor.check_interval_ms, 300_000);
        assert_eq!(config.login.max_failures, 5);
    }

    #[test]
    fn test_unparseable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[monitor\n").unwrap();

        assert!(matches!(Config::from_config(Some(&path)), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.monitor.status_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.login.max_failures = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.captcha.provider = "hcaptcha".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_login_window() {
        let mut config = Config::default();
        config.login.window_minutes = MAX_WINDOW_MINUTES;
        assert!(config.validate().is_ok());

        config.login.window_minutes = MAX_WINDOW_MINUTES + 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        config.login.window_minutes = 1_000_000_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_redacts_secrets() {
        let mut config = Config::default();
        config.admin.token = "super-secret".into();
        let rendered = config.to_string();
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("Status Timeout (ms): 8000"));
    }
}
