//! Turns raw failures into a diagnosis an operator can act on.
//!
//! Classification is keyed on the machine error code first and falls back to
//! matching the message. Table and column names are pulled out of driver
//! messages on a best-effort basis: when the message does not match a known
//! shape the name is simply left unknown.

use crate::failure::{codes, RawFailure};
use core_types::ErrorCategory;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MISSING_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:relation|table) "([^"]+)" does not exist"#).expect("valid regex"));
static MISSING_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"column "([^"]+)"(?: of relation "[^"]+")? does not exist"#).expect("valid regex"));
static DENIED_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"permission denied for (?:table|relation) ([^\s]+)").expect("valid regex"));

/// A read-only diagnosis of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl ClassifiedError {
    fn bare(message: String, code: Option<String>, category: ErrorCategory) -> Self {
        Self { message, code, category, table: None, column: None, explanation: None, suggested_fix: None }
    }

    fn explain(mut self, category: ErrorCategory, explanation: impl Into<String>, fix: impl Into<String>) -> Self {
        self.category = category;
        self.explanation = Some(explanation.into());
        self.suggested_fix = Some(fix.into());
        self
    }
}

fn capture(pattern: &Regex, message: &str) -> Option<String> {
    pattern.captures(message).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Classifies a failure. Pure: no logging, no I/O, never panics.
pub fn process_db_error(input: impl Into<RawFailure>) -> ClassifiedError {
    let failure = match input.into() {
        RawFailure::Plain(message) => return ClassifiedError::bare(message, None, ErrorCategory::Database),
        RawFailure::Structured(failure) => failure,
    };

    let mut out = ClassifiedError::bare(failure.message.clone(), failure.code.clone(), ErrorCategory::Database);
    out.table = failure.table.clone();
    out.column = failure.column.clone();

    match failure.code() {
        Some(codes::CONNECTION_REFUSED | codes::TIMED_OUT | codes::HOST_NOT_FOUND) => {
            return out.explain(
                ErrorCategory::Connection,
                "Unable to connect to database server",
                "Check that the database server is running and reachable from this host (host, port, firewall).",
            );
        }
        Some(codes::INVALID_AUTHORIZATION | codes::INVALID_PASSWORD) => {
            return out.explain(
                ErrorCategory::Connection,
                "Authentication failed",
                "Check the configured database user and password.",
            );
        }
        Some(codes::INSUFFICIENT_PRIVILEGE) => {
            if out.table.is_none() {
                out.table = capture(&DENIED_TABLE, &failure.message);
            }
            return match out.table.clone() {
                Some(table) => out.explain(
                    ErrorCategory::Query,
                    format!("Permission denied for table '{table}'"),
                    format!("Grant the required privilege to the application user, e.g. GRANT SELECT ON {table} TO <user>;"),
                ),
                None => out.explain(
                    ErrorCategory::Query,
                    "Permission denied for the requested table",
                    "Grant the required privileges on the referenced tables to the application user.",
                ),
            };
        }
        Some(codes::UNDEFINED_TABLE) => {
            if let Some(table) = capture(&MISSING_TABLE, &failure.message) {
                out.table = Some(table);
            }
            return match out.table.clone() {
                Some(table) => out.explain(
                    ErrorCategory::Query,
                    format!("Table '{table}' does not exist"),
                    format!("Create the '{table}' table or correct the table name in the query."),
                ),
                None => out.explain(
                    ErrorCategory::Query,
                    "A referenced table does not exist",
                    "Create the missing table or correct the table name in the query.",
                ),
            };
        }
        Some(codes::UNDEFINED_COLUMN) => {
            if out.column.is_none() {
                out.column = capture(&MISSING_COLUMN, &failure.message);
            }
            return match out.column.clone() {
                Some(column) => out.explain(
                    ErrorCategory::Query,
                    format!("Column '{column}' does not exist"),
                    format!("Check the spelling of '{column}' against the table schema."),
                ),
                None => out.explain(
                    ErrorCategory::Query,
                    "A referenced column does not exist",
                    "Check the column names in the query against the table schema.",
                ),
            };
        }
        Some(codes::INVALID_CATALOG_NAME) => {
            return out.explain(
                ErrorCategory::Connection,
                "Database does not exist",
                "Verify the configured database name (PGDATABASE).",
            );
        }
        _ => {}
    }

    let lowered = failure.message.to_ascii_lowercase();
    if lowered.contains("permission denied") {
        out.explain(
            ErrorCategory::Query,
            "Permission denied",
            "Check that the application user has privileges on the objects this query touches.",
        )
    } else if lowered.contains("does not exist") {
        out.explain(
            ErrorCategory::Query,
            "A referenced database object does not exist",
            "Check that the schema has been created and that the names in the query are correct.",
        )
    } else if lowered.contains("timeout") {
        out.explain(
            ErrorCategory::Connection,
            "The database operation timed out",
            "Check server load and network latency; long-running queries may need optimising.",
        )
    } else {
        out.explanation = Some(failure.message);
        out
    }
}
