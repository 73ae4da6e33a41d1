//! Raw failures as they come out of the driver, before classification.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgDatabaseError;
use std::io;

/// Machine error codes we react to. The `E*` codes are socket-level, the rest
/// are PostgreSQL SQLSTATE values.
pub mod codes {
    pub const CONNECTION_RESET: &str = "ECONNRESET";
    pub const CONNECTION_REFUSED: &str = "ECONNREFUSED";
    pub const TIMED_OUT: &str = "ETIMEDOUT";
    pub const HOST_NOT_FOUND: &str = "ENOTFOUND";
    pub const INVALID_AUTHORIZATION: &str = "28000";
    pub const INVALID_PASSWORD: &str = "28P01";
    pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const UNDEFINED_COLUMN: &str = "42703";
    pub const INVALID_CATALOG_NAME: &str = "3D000";
}

/// A structured failure: the driver's message plus whatever detail it exposed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DbFailure {
    pub message: String,
    pub code: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
}

impl DbFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Whether this failure means the pool itself is suspect and should be
    /// rebuilt: a reset connection, a DNS failure, or anything mentioning a timeout.
    pub fn invalidates_pool(&self) -> bool {
        matches!(self.code(), Some(codes::CONNECTION_RESET) | Some(codes::HOST_NOT_FOUND))
            || self.message.to_ascii_lowercase().contains("timeout")
    }
}

/// Anything the classifier accepts: a structured failure or a bare message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    Structured(DbFailure),
    Plain(String),
}

impl From<DbFailure> for RawFailure {
    fn from(failure: DbFailure) -> Self {
        RawFailure::Structured(failure)
    }
}

impl From<&DbFailure> for RawFailure {
    fn from(failure: &DbFailure) -> Self {
        RawFailure::Structured(failure.clone())
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        RawFailure::Plain(message)
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        RawFailure::Plain(message.to_string())
    }
}

impl From<&sqlx::Error> for RawFailure {
    fn from(error: &sqlx::Error) -> Self {
        RawFailure::Structured(DbFailure::from(error))
    }
}

fn io_code(error: &io::Error) -> Option<&'static str> {
    match error.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => Some(codes::CONNECTION_RESET),
        io::ErrorKind::ConnectionRefused => Some(codes::CONNECTION_REFUSED),
        io::ErrorKind::TimedOut => Some(codes::TIMED_OUT),
        io::ErrorKind::NotFound => Some(codes::HOST_NOT_FOUND),
        _ => {
            // tokio reports resolver failures as uncategorized I/O errors.
            let text = error.to_string().to_ascii_lowercase();
            if text.contains("failed to lookup address")
                || text.contains("name or service not known")
                || text.contains("nodename nor servname")
            {
                Some(codes::HOST_NOT_FOUND)
            } else {
                None
            }
        }
    }
}

impl From<&sqlx::Error> for DbFailure {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(db) => {
                let mut failure = DbFailure::new(db.message());
                failure.code = db.code().map(|c| c.into_owned());
                if let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() {
                    failure.table = pg.table().map(str::to_string);
                    failure.column = pg.column().map(str::to_string);
                }
                failure
            }
            sqlx::Error::Io(io_error) => {
                let failure = DbFailure::new(error.to_string());
                match io_code(io_error) {
                    Some(code) => failure.with_code(code),
                    None => failure,
                }
            }
            sqlx::Error::PoolTimedOut => {
                DbFailure::new("timeout while waiting for an open connection from the pool")
                    .with_code(codes::TIMED_OUT)
            }
            // Someone closed the pool underneath this attempt.
            sqlx::Error::PoolClosed => {
                DbFailure::new(error.to_string()).with_code(codes::CONNECTION_RESET)
            }
            other => DbFailure::new(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_and_dns_failures_invalidate_the_pool() {
        assert!(DbFailure::new("read ECONNRESET").with_code(codes::CONNECTION_RESET).invalidates_pool());
        assert!(DbFailure::new("getaddrinfo").with_code(codes::HOST_NOT_FOUND).invalidates_pool());
        assert!(DbFailure::new("Connection terminated due to connection timeout").invalidates_pool());
    }

    #[test]
    fn query_errors_leave_the_pool_alone() {
        let syntax = DbFailure::new("syntax error at or near \"SELEC\"").with_code("42601");
        let privilege = DbFailure::new("permission denied for table interns")
            .with_code(codes::INSUFFICIENT_PRIVILEGE);
        let refused = DbFailure::new("connection refused").with_code(codes::CONNECTION_REFUSED);
        assert!(!syntax.invalidates_pool());
        assert!(!privilege.invalidates_pool());
        assert!(!refused.invalidates_pool());
    }

    #[test]
    fn io_errors_map_to_socket_codes() {
        let reset = sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(DbFailure::from(&reset).code(), Some(codes::CONNECTION_RESET));

        let refused = sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(DbFailure::from(&refused).code(), Some(codes::CONNECTION_REFUSED));

        let dns = sqlx::Error::Io(io::Error::other("failed to lookup address information: Name or service not known"));
        assert_eq!(DbFailure::from(&dns).code(), Some(codes::HOST_NOT_FOUND));
    }

    #[test]
    fn pool_timeout_is_treated_as_timeout() {
        let failure = DbFailure::from(&sqlx::Error::PoolTimedOut);
        assert_eq!(failure.code(), Some(codes::TIMED_OUT));
        assert!(failure.invalidates_pool());
    }
}
