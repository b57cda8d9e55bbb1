//! Configuration management for the portal client.
//!
//! Values are layered: CLI flags and `PORTAL_*` environment variables win over
//! a YAML config file, which wins over built-in defaults.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sdk::credentials::AuthMode;
use crate::sdk::provision::{PollSettings, DEFAULT_POLL_INTERVAL, DEFAULT_PROVISION_TIMEOUT};

/// Per-request timeout applied by the HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Command-line arguments for the `portal` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "portal")]
#[command(author = "Portal Client Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Authenticated client for the cloud-networking portal API")]
pub struct Args {
    /// API base URL, e.g. https://tenant.portal.example.com/api
    #[arg(long, env = "PORTAL_URL")]
    pub portal_url: Option<String>,

    /// Portal username
    #[arg(long, env = "PORTAL_USERNAME")]
    pub username: Option<String>,

    /// Portal password
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// API secret (used instead of username/password)
    #[arg(long, env = "PORTAL_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Authentication mode: header or session
    #[arg(long, env = "PORTAL_AUTH_MODE")]
    pub auth_mode: Option<AuthMode>,

    /// Enable provisioning tracking for mutating calls
    #[arg(long, env = "PORTAL_PROVISION")]
    pub provision: bool,

    /// Log level
    #[arg(long, env = "PORTAL_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Emit logs as JSON
    #[arg(long, env = "PORTAL_LOG_JSON")]
    pub log_json: bool,

    /// YAML config file (defaults to ~/.config/portal/config.yaml when present)
    #[arg(short, long, env = "PORTAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds between provisioning status polls
    #[arg(long, env = "PORTAL_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Minutes before a provisioning wait gives up
    #[arg(long, env = "PORTAL_PROVISION_TIMEOUT_MINS")]
    pub provision_timeout_mins: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "PORTAL_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the `portal` binary.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the resolved tenant-network id
    Tenant,
    /// List every resource of a kind
    List {
        kind: String,
        /// Kind lives directly under the API base, not the tenant network
        #[arg(long)]
        global: bool,
    },
    /// Fetch one resource by id or name
    Get {
        kind: String,
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        global: bool,
    },
    /// Create a resource from a JSON file
    Create {
        kind: String,
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        global: bool,
        /// Skip provisioning tracking for this call
        #[arg(long)]
        no_provision: bool,
    },
    /// Replace a resource from a JSON file
    Update {
        kind: String,
        id: String,
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        no_provision: bool,
    },
    /// Delete a resource
    Delete {
        kind: String,
        id: String,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        no_provision: bool,
    },
}

/// Log level for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Durations are written as (fractional) seconds in config files.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Client configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL
    pub portal_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub secret: Option<String>,
    pub auth_mode: AuthMode,
    /// Global provisioning switch
    pub provision: bool,
    pub log_level: LogLevel,
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    #[serde(with = "duration_secs")]
    pub provision_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientConfig")
            .field("portal_url", &self.portal_url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("secret", &redact(&self.secret))
            .field("auth_mode", &self.auth_mode)
            .field("provision", &self.provision)
            .field("log_level", &self.log_level)
            .field("poll_interval", &self.poll_interval)
            .field("provision_timeout", &self.provision_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            portal_url: String::new(),
            username: None,
            password: None,
            secret: None,
            auth_mode: AuthMode::Header,
            provision: false,
            log_level: LogLevel::Info,
            poll_interval: DEFAULT_POLL_INTERVAL,
            provision_timeout: DEFAULT_PROVISION_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("portal").join("config.yaml"))
    }

    /// Build configuration from CLI args layered over the config file.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        if let Some(url) = &args.portal_url {
            config.portal_url = url.clone();
        }
        if args.username.is_some() {
            config.username = args.username.clone();
        }
        if args.password.is_some() {
            config.password = args.password.clone();
        }
        if args.secret.is_some() {
            config.secret = args.secret.clone();
        }
        if let Some(mode) = args.auth_mode {
            config.auth_mode = mode;
        }
        if args.provision {
            config.provision = true;
        }
        if let Some(level) = args.log_level {
            config.log_level = level;
        }
        if let Some(secs) = args.poll_interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(mins) = args.provision_timeout_mins {
            config.provision_timeout = Duration::from_secs(mins * 60);
        }
        if let Some(secs) = args.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no client could be built from.
    pub fn validate(&self) -> Result<()> {
        if self.portal_url.trim().is_empty() {
            return Err(Error::Config(
                "portal URL is required (--portal-url or PORTAL_URL)".to_string(),
            ));
        }
        if !(self.portal_url.starts_with("http://") || self.portal_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "portal URL must start with http:// or https://: {}",
                self.portal_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        if self.provision_timeout.is_zero() {
            return Err(Error::Config(
                "provision timeout must be positive".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval,
            timeout: self.provision_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["portal"];
        argv.extend_from_slice(extra);
        argv.push("tenant");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_config_default_values() {
        let config = ClientConfig::default();

        assert_eq!(config.auth_mode, AuthMode::Header);
        assert!(!config.provision);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.provision_timeout, Duration::from_secs(240 * 60));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
portal_url: https://corp.portal.example.com/api
username: ops@example.com
password: pw
auth_mode: session
provision: true
log_level: debug
poll_interval: 0.5
provision_timeout: 600
"#;

        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.portal_url, "https://corp.portal.example.com/api");
        assert_eq!(config.auth_mode, AuthMode::Session);
        assert!(config.provision);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.provision_timeout, Duration::from_secs(600));
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_args_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "portal_url: https://file.example.com/api\nsecret: from-file\npoll_interval: 30"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = args(&[
            "--config",
            &path,
            "--portal-url",
            "https://cli.example.com/api",
            "--provision",
            "--poll-interval-secs",
            "5",
        ]);
        let config = ClientConfig::from_args(&args).unwrap();

        assert_eq!(config.portal_url, "https://cli.example.com/api");
        assert_eq!(config.secret.as_deref(), Some("from-file"));
        assert!(config.provision);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let missing_url = ClientConfig::default();
        assert!(matches!(missing_url.validate(), Err(Error::Config(_))));

        let bad_scheme = ClientConfig {
            portal_url: "portal.example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(bad_scheme.validate(), Err(Error::Config(_))));

        let zero_interval = ClientConfig {
            portal_url: "https://portal.example.com/api".to_string(),
            poll_interval: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(matches!(zero_interval.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig {
            portal_url: "https://portal.example.com/api".to_string(),
            password: Some("hunter2".to_string()),
            secret: Some("s3cret".to_string()),
            ..ClientConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("portal.example.com"));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        let level: LogLevel = serde_json::from_str("\"trace\"").unwrap();
        assert_eq!(level, LogLevel::Trace);
    }

    #[test]
    fn test_get_requires_id_or_name() {
        assert!(Args::try_parse_from(["portal", "get", "segments"]).is_err());
        assert!(Args::try_parse_from(["portal", "get", "segments", "--id", "1", "--name", "a"]).is_err());
        assert!(Args::try_parse_from(["portal", "get", "segments", "--name", "corp"]).is_ok());
    }
}
