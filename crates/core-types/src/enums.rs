use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the rows in a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Live rows returned by the database.
    Database,
    /// The caller's fallback set, substituted after a failed query.
    Fallback,
    /// Sample data served without touching the database at all.
    Sample,
}

/// Coarse bucket a database failure is sorted into for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The server could not be reached or refused our credentials.
    Connection,
    /// The statement itself is wrong: missing object, privilege, syntax.
    Query,
    /// Anything we could not classify.
    Database,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Connection => "connection",
            ErrorCategory::Query => "query",
            ErrorCategory::Database => "database",
        };
        f.write_str(name)
    }
}
