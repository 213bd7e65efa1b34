use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::future::try_join_all;
use futures::{StreamExt, TryStreamExt};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{Client, NoTls};
use tracing::error;

use crate::error::{ConstraintKind, DriverError, DriverResult};
use crate::statement::Statement;
use crate::traits::{DatabaseDriver, RowStream};
use crate::types::{BindValue, RawQueryResult, SqlType, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
pub struct TokioPostgresDriver {
    client: Client,
}

impl TokioPostgresDriver {
    /// Connect to a PostgreSQL database.
    pub async fn connect(connection_string: &str) -> DriverResult<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self { client })
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// `?` slots become `$1`, `$2`, ...
fn postgres_sql(statement: &Statement) -> String {
    statement.to_sql_with(|i| format!("${i}"))
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    async fn execute(&self, statement: &Statement) -> DriverResult<RawQueryResult> {
        let prepared = self
            .client
            .prepare(&postgres_sql(statement))
            .await
            .map_err(classify)?;
        let params = to_params(statement.values());

        let rows = self
            .client
            .query(&prepared, &param_refs(&params))
            .await
            .map_err(classify)?;

        let columns = prepared
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = rows.iter().map(decode_row).collect::<DriverResult<Vec<_>>>()?;
        let rows_affected = rows.len() as u64;

        Ok(RawQueryResult {
            columns,
            rows,
            rows_affected,
        })
    }

    async fn execute_update(&self, statement: &Statement) -> DriverResult<u64> {
        let params = to_params(statement.values());
        self.client
            .execute(postgres_sql(statement).as_str(), &param_refs(&params))
            .await
            .map_err(classify)
    }

    /// Statements are pipelined on the connection.
    async fn execute_batch(&self, statements: &[Statement]) -> DriverResult<Vec<u64>> {
        try_join_all(statements.iter().map(|s| self.execute_update(s))).await
    }

    async fn stream(&self, statement: &Statement) -> DriverResult<RowStream> {
        let params = to_params(statement.values());
        let rows = self
            .client
            .query_raw(
                postgres_sql(statement).as_str(),
                params.iter().map(|p| p.as_ref() as &dyn ToSql),
            )
            .await
            .map_err(classify)?;
        Ok(rows
            .map_err(classify)
            .and_then(|row| async move { decode_row(&row) })
            .boxed())
    }
}

/// Map a backend error onto the driver error taxonomy.
fn classify(e: tokio_postgres::Error) -> DriverError {
    let message = e.to_string();
    if e.is_closed() {
        return DriverError::ConnectionFailed(message);
    }
    let Some(code) = e.code() else {
        return DriverError::QueryFailed(message);
    };
    let constraint = |kind| DriverError::ConstraintViolation {
        kind,
        message: message.clone(),
    };
    if code == &SqlState::UNIQUE_VIOLATION {
        constraint(ConstraintKind::Unique)
    } else if code == &SqlState::FOREIGN_KEY_VIOLATION {
        constraint(ConstraintKind::ForeignKey)
    } else if code == &SqlState::CHECK_VIOLATION {
        constraint(ConstraintKind::Check)
    } else if code == &SqlState::T_R_SERIALIZATION_FAILURE
        || code == &SqlState::T_R_DEADLOCK_DETECTED
        || code == &SqlState::LOCK_NOT_AVAILABLE
    {
        DriverError::LockConflict(message)
    } else if code == &SqlState::QUERY_CANCELED {
        DriverError::Timeout
    } else {
        DriverError::QueryFailed(message)
    }
}

type Param = Box<dyn ToSql + Sync + Send>;

/// Convert bind values to boxed ToSql trait objects; NULL keeps its declared type.
fn to_params(values: &[BindValue]) -> Vec<Param> {
    values.iter().map(to_param).collect()
}

fn to_param(bind: &BindValue) -> Param {
    match &bind.value {
        SqlValue::Null => typed_null(bind.sql_type),
        SqlValue::Bool(v) => Box::new(*v),
        SqlValue::Int16(v) => Box::new(*v),
        SqlValue::Int32(v) => Box::new(*v),
        SqlValue::Int64(v) => Box::new(*v),
        SqlValue::Float64(v) => Box::new(*v),
        SqlValue::Text(v) => Box::new(v.clone()),
        SqlValue::Bytes(v) => Box::new(v.clone()),
        SqlValue::Timestamp(v) => Box::new(*v),
    }
}

fn typed_null(sql_type: SqlType) -> Param {
    match sql_type {
        SqlType::Bool => Box::new(None::<bool>),
        SqlType::Int16 => Box::new(None::<i16>),
        SqlType::Int32 => Box::new(None::<i32>),
        SqlType::Int64 => Box::new(None::<i64>),
        SqlType::Float64 => Box::new(None::<f64>),
        SqlType::Text => Box::new(None::<String>),
        SqlType::Bytes => Box::new(None::<Vec<u8>>),
        SqlType::Timestamp => Box::new(None::<NaiveDateTime>),
    }
}

fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|b| b.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

fn decode_row(row: &tokio_postgres::Row) -> DriverResult<Vec<SqlValue>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| decode_value(row, i, column.type_()))
        .collect()
}

/// Read one column by its declared PostgreSQL type.
fn decode_value(row: &tokio_postgres::Row, index: usize, type_: &Type) -> DriverResult<SqlValue> {
    fn get<'a, T>(row: &'a tokio_postgres::Row, index: usize) -> DriverResult<Option<T>>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(index)
            .map_err(|e| DriverError::QueryFailed(e.to_string()))
    }

    let value = if type_ == &Type::BOOL {
        get::<bool>(row, index)?.map(SqlValue::Bool)
    } else if type_ == &Type::INT2 {
        get::<i16>(row, index)?.map(SqlValue::Int16)
    } else if type_ == &Type::INT4 {
        get::<i32>(row, index)?.map(SqlValue::Int32)
    } else if type_ == &Type::INT8 {
        get::<i64>(row, index)?.map(SqlValue::Int64)
    } else if type_ == &Type::FLOAT4 {
        get::<f32>(row, index)?.map(|v| SqlValue::Float64(f64::from(v)))
    } else if type_ == &Type::FLOAT8 {
        get::<f64>(row, index)?.map(SqlValue::Float64)
    } else if type_ == &Type::BYTEA {
        get::<Vec<u8>>(row, index)?.map(SqlValue::Bytes)
    } else if type_ == &Type::TIMESTAMP {
        get::<NaiveDateTime>(row, index)?.map(SqlValue::Timestamp)
    } else if type_ == &Type::NUMERIC {
        get::<Numeric>(row, index)?.map(|n| SqlValue::Text(n.0))
    } else if type_ == &Type::TEXT
        || type_ == &Type::VARCHAR
        || type_ == &Type::BPCHAR
        || type_ == &Type::NAME
    {
        get::<String>(row, index)?.map(SqlValue::Text)
    } else {
        return Err(DriverError::QueryFailed(format!(
            "unsupported column type {} at index {index}",
            type_.name()
        )));
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

/// A `numeric` value in its decimal text form, e.g. the result of `avg` or
/// `sum(bigint)`. Coercion to the declared type happens in the dialect.
struct Numeric(String);

impl<'a> FromSql<'a> for Numeric {
    fn from_sql(
        _type: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        decode_numeric(raw)
            .map(Numeric)
            .ok_or_else(|| "malformed numeric value".into())
    }

    fn accepts(type_: &Type) -> bool {
        type_ == &Type::NUMERIC
    }
}

/// Binary `numeric`: ndigits, weight, sign, dscale, then base-10000 digits,
/// the first one weighted `10000^weight`.
fn decode_numeric(raw: &[u8]) -> Option<String> {
    let word = |i: usize| {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    };
    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(1)? as i16);
    let sign = word(2)?;
    let dscale = usize::from(word(3)?);
    if sign == 0xC000 {
        return Some("NaN".to_string());
    }
    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Option<Vec<u16>>>()?;
    let digit = |position: i32| {
        usize::try_from(position)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", digit(position)));
        }
    }
    if dscale > 0 {
        let mut fraction = String::new();
        let mut position = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(position)));
            position += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }
    Some(text)
}
