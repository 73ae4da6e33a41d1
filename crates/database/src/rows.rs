//! Conversions between our value types and the PostgreSQL driver.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use core_types::{QueryParam, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Column, Encode, Postgres, Row as _, Type, TypeInfo};
use uuid::Uuid;

/// OID of the `unknown` pseudo-type.
const UNKNOWN_OID: Oid = Oid(705);

/// A NULL sent with type `unknown`, so the server infers the type from where
/// the placeholder is used instead of assuming `text`.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(UNKNOWN_OID)
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Binds each parameter, in order, to `$1..$n`.
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            QueryParam::Null => query.bind(UntypedNull),
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::Date(v) => query.bind(*v),
            QueryParam::Timestamp(v) => query.bind(*v),
            QueryParam::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Decodes one column into JSON. NULLs and types we cannot decode become `null`.
fn column_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "BOOL" => get::<bool>(row, index).map(Value::Bool),
        "INT2" => get::<i16>(row, index).map(Value::from),
        "INT4" => get::<i32>(row, index).map(Value::from),
        "INT8" => get::<i64>(row, index).map(Value::from),
        "FLOAT4" => get::<f32>(row, index).map(|v| float(f64::from(v))),
        "FLOAT8" => get::<f64>(row, index).map(float),
        "NUMERIC" => get::<Decimal>(row, index).map(|v| v.to_f64().map(float).unwrap_or(Value::Null)),
        "UUID" => get::<Uuid>(row, index).map(|v| Value::String(v.to_string())),
        "DATE" => get::<NaiveDate>(row, index).map(|v| Value::String(v.to_string())),
        "TIME" => get::<NaiveTime>(row, index).map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index).map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index).map(|v| Value::String(v.to_rfc3339())),
        "JSON" | "JSONB" => get::<Value>(row, index),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, index).map(Value::from),
        "INT4[]" => get::<Vec<i32>>(row, index).map(Value::from),
        _ => get::<String>(row, index).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}

/// Converts a driver row into a column-name keyed JSON object.
pub(crate) fn row_to_json(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let value = column_value(row, column.ordinal(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}
