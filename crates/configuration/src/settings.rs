use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on physical connections held by the pool.
pub const POOL_MAX_CONNECTIONS: u32 = 5;
/// Connections the pool tries to keep open at all times.
pub const POOL_MIN_CONNECTIONS: u32 = 1;
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(15);
pub const POOL_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
pub const POOL_STATEMENT_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "opsdash";
const DEFAULT_USER: &str = "postgres";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Root settings for the whole application.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
}

/// Sizing and timeouts for the connection pool. These are fixed values, not
/// read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long an unused connection may sit idle before it is closed.
    pub idle_timeout: Duration,
    /// Bound on establishing a connection or waiting for one from the pool.
    pub connect_timeout: Duration,
    /// Server-side `statement_timeout` applied to every session.
    pub statement_timeout: Duration,
    /// Check that an idle connection is still alive before handing it out.
    /// This is a liveness ping on acquire, not TCP-level keep-alive.
    pub keep_alive: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: POOL_MAX_CONNECTIONS,
            min_connections: POOL_MIN_CONNECTIONS,
            idle_timeout: POOL_IDLE_TIMEOUT,
            connect_timeout: POOL_CONNECT_TIMEOUT,
            statement_timeout: POOL_STATEMENT_TIMEOUT,
            keep_alive: true,
        }
    }
}

/// TLS negotiation mode, mirroring libpq's `sslmode` values we support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl FromStr for SslMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" | "false" | "off" => Ok(SslMode::Disable),
            "prefer" | "allow" => Ok(SslMode::Prefer),
            "require" | "true" | "on" => Ok(SslMode::Require),
            other => Err(ConfigError::ValidationError(format!(
                "PGSSLMODE must be one of disable, prefer, require (got '{other}')"
            ))),
        }
    }
}

/// Everything needed to build a connection pool.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    /// Already URL-decoded.
    pub password: String,
    pub ssl_mode: SslMode,
    pub pool: PoolSettings,
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            ssl_mode: SslMode::default(),
            pool: PoolSettings::default(),
        }
    }
}

impl DatabaseSettings {
    /// `host:port/database` for log lines. Never includes credentials.
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    /// Serve sample data without touching the database.
    pub sample_mode: bool,
    /// When set, logs are also written to a daily rolling file here.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            sample_mode: false,
            log_dir: None,
        }
    }
}

/// The raw environment as the `config` crate sees it: lowercased keys, string values.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEnvironment {
    pghost: Option<String>,
    pgport: Option<String>,
    pgdatabase: Option<String>,
    pguser: Option<String>,
    pgpassword: Option<String>,
    pgsslmode: Option<String>,
    opsdash_addr: Option<String>,
    opsdash_sample_mode: Option<String>,
    opsdash_log_dir: Option<String>,
}

/// Treats unset and blank variables the same way.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!("{name} must be a boolean (got '{value}')"))),
    }
}

impl RawEnvironment {
    pub(crate) fn into_settings(self) -> Result<Settings, ConfigError> {
        let port = match non_blank(self.pgport) {
            Some(port) => port.parse::<u16>().map_err(|_| {
                ConfigError::ValidationError(format!("PGPORT must be a port number (got '{port}')"))
            })?,
            None => DEFAULT_PORT,
        };

        // The password may legitimately contain spaces, so it is not trimmed.
        let password = match self.pgpassword {
            Some(encoded) => urlencoding::decode(&encoded)
                .map_err(|e| ConfigError::ValidationError(format!("PGPASSWORD is not valid URL-encoding: {e}")))?
                .into_owned(),
            None => String::new(),
        };

        let ssl_mode = match non_blank(self.pgsslmode) {
            Some(mode) => mode.parse()?,
            None => SslMode::default(),
        };

        let database = DatabaseSettings {
            host: non_blank(self.pghost).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database: non_blank(self.pgdatabase).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            user: non_blank(self.pguser).unwrap_or_else(|| DEFAULT_USER.to_string()),
            password,
            ssl_mode,
            pool: PoolSettings::default(),
        };

        let addr_text = non_blank(self.opsdash_addr).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_text.parse::<SocketAddr>().map_err(|_| {
            ConfigError::ValidationError(format!("OPSDASH_ADDR must be a socket address (got '{addr_text}')"))
        })?;

        let sample_mode = match non_blank(self.opsdash_sample_mode) {
            Some(flag) => parse_bool("OPSDASH_SAMPLE_MODE", &flag)?,
            None => false,
        };

        let server = ServerSettings {
            addr,
            sample_mode,
            log_dir: non_blank(self.opsdash_log_dir).map(PathBuf::from),
        };

        Ok(Settings { database, server })
    }
}
