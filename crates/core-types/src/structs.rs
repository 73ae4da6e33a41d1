use crate::enums::DataSource;
use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row, keyed by column name in SELECT-list order.
pub type Row = Map<String, Value>;

/// An ordered sequence of rows as returned by a query.
pub type Rows = Vec<Row>;

/// A value bound to a positional `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        QueryParam::Text(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        QueryParam::Text(value)
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        QueryParam::Int(value)
    }
}

impl From<i32> for QueryParam {
    fn from(value: i32) -> Self {
        QueryParam::Int(i64::from(value))
    }
}

impl From<f64> for QueryParam {
    fn from(value: f64) -> Self {
        QueryParam::Float(value)
    }
}

impl From<bool> for QueryParam {
    fn from(value: bool) -> Self {
        QueryParam::Bool(value)
    }
}

impl From<NaiveDate> for QueryParam {
    fn from(value: NaiveDate) -> Self {
        QueryParam::Date(value)
    }
}

impl From<DateTime<Utc>> for QueryParam {
    fn from(value: DateTime<Utc>) -> Self {
        QueryParam::Timestamp(value)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryParam::Null, Into::into)
    }
}

/// An immutable parameterized statement: SQL text plus its bound values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    text: String,
    params: Vec<QueryParam>,
}

impl QueryRequest {
    /// Creates a request with no bound parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), params: Vec::new() }
    }

    /// Creates a request with the given parameters, bound in order to `$1..$n`.
    pub fn with_params(text: impl Into<String>, params: Vec<QueryParam>) -> Self {
        Self { text: text.into(), params }
    }

    /// Appends one more parameter, consuming and returning the request.
    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    /// Checks that the text is non-empty. Placeholder counts are left to the
    /// server, which knows where literals and comments end.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.text.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "query text".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A value tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Sourced<T> {
    pub fn new(data: T, source: DataSource) -> Self {
        Self { data, source }
    }

    pub fn database(data: T) -> Self {
        Self::new(data, DataSource::Database)
    }

    pub fn fallback(data: T) -> Self {
        Self::new(data, DataSource::Fallback)
    }

    pub fn sample(data: T) -> Self {
        Self::new(data, DataSource::Sample)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced { data: f(self.data), source: self.source }
    }
}
