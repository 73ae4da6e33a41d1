use crate::error::ConfigError;
use crate::settings::RawEnvironment;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{DatabaseSettings, PoolSettings, ServerSettings, Settings, SslMode};

/// Loads the application settings from the process environment.
///
/// Reads `PGHOST`, `PGPORT`, `PGDATABASE`, `PGUSER`, `PGPASSWORD` (URL-encoded),
/// `PGSSLMODE` and the `OPSDASH_*` server variables. Callers that want a `.env`
/// file honoured should load it with `dotenvy` first.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(config::Environment::default())
}

/// Same as [`load_settings`] but with an explicit environment source, so the
/// parsing can be exercised without touching process-wide state.
pub fn load_settings_from(environment: config::Environment) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder().add_source(environment).build()?;

    let raw = builder.try_deserialize::<RawEnvironment>()?;

    raw.into_settings()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = load_settings_from(env(&[])).unwrap();
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.database.ssl_mode, SslMode::Prefer);
        assert_eq!(settings.database.password, "");
        assert!(!settings.server.sample_mode);
        assert_eq!(settings.server.addr.port(), 3000);
    }

    #[test]
    fn password_is_url_decoded() {
        let settings = load_settings_from(env(&[
            ("PGHOST", "db.internal"),
            ("PGPORT", "6543"),
            ("PGUSER", "hr_app"),
            ("PGPASSWORD", "p%40ss%2Fw0rd%21"),
            ("PGSSLMODE", "require"),
        ]))
        .unwrap();
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.port, 6543);
        assert_eq!(settings.database.user, "hr_app");
        assert_eq!(settings.database.password, "p@ss/w0rd!");
        assert_eq!(settings.database.ssl_mode, SslMode::Require);
    }

    #[test]
    fn pool_settings_are_fixed() {
        let pool = load_settings_from(env(&[])).unwrap().database.pool;
        assert_eq!(pool.max_connections, 5);
        assert_eq!(pool.min_connections, 1);
        assert_eq!(pool.idle_timeout, Duration::from_secs(15));
        assert_eq!(pool.connect_timeout, Duration::from_secs(8));
        assert_eq!(pool.statement_timeout, Duration::from_secs(15));
        assert!(pool.keep_alive);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load_settings_from(env(&[("PGPORT", "not-a-port")])),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            load_settings_from(env(&[("PGSSLMODE", "verify-everything")])),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            load_settings_from(env(&[("OPSDASH_SAMPLE_MODE", "maybe")])),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn server_settings_are_read() {
        let settings = load_settings_from(env(&[
            ("OPSDASH_ADDR", "127.0.0.1:8080"),
            ("OPSDASH_SAMPLE_MODE", "true"),
            ("OPSDASH_LOG_DIR", "/var/log/opsdash"),
        ]))
        .unwrap();
        assert_eq!(settings.server.addr.to_string(), "127.0.0.1:8080");
        assert!(settings.server.sample_mode);
        assert_eq!(settings.server.log_dir.as_deref(), Some(std::path::Path::new("/var/log/opsdash")));
    }

    #[test]
    fn debug_output_redacts_password() {
        let settings = load_settings_from(env(&[("PGPASSWORD", "hunter2")])).unwrap();
        let rendered = format!("{:?}", settings.database);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
