use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;

/// Declared SQL type of a column or bind value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bool,
    Int16,
    Int32,
    Int64,
    Float64,
    Text,
    Bytes,
    Timestamp,
}

/// Represents a SQL parameter value in a driver-agnostic way.
/// Drivers are responsible for converting these to their native types.
///
/// Equality and hashing are structural; floats compare by bit pattern so a
/// value can be used as part of an identity key.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// The natural SQL type of this value, `None` for NULL.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(_) => Some(SqlType::Bool),
            SqlValue::Int16(_) => Some(SqlType::Int16),
            SqlValue::Int32(_) => Some(SqlType::Int32),
            SqlValue::Int64(_) => Some(SqlType::Int64),
            SqlValue::Float64(_) => Some(SqlType::Float64),
            SqlValue::Text(_) => Some(SqlType::Text),
            SqlValue::Bytes(_) => Some(SqlType::Bytes),
            SqlValue::Timestamp(_) => Some(SqlType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view of the value, used by identifier generators and version columns.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int16(v) => Some(i64::from(*v)),
            SqlValue::Int32(v) => Some(i64::from(*v)),
            SqlValue::Int64(v) => Some(*v),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts this value into the representation of `target`.
    ///
    /// Integers are narrowed with an overflow check, text is parsed, and
    /// integers become booleans for backends without a native boolean.
    pub fn coerce(self, target: SqlType) -> std::result::Result<SqlValue, String> {
        if self.is_null() || self.sql_type() == Some(target) {
            return Ok(self);
        }
        let mismatch = |v: &SqlValue| format!("cannot convert {v:?} to {target:?}");
        match target {
            SqlType::Int16 => self
                .as_i64()
                .and_then(|v| i16::try_from(v).ok())
                .map(SqlValue::Int16)
                .ok_or_else(|| mismatch(&self)),
            SqlType::Int32 => self
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(SqlValue::Int32)
                .ok_or_else(|| mismatch(&self)),
            SqlType::Int64 => self
                .as_i64()
                .map(SqlValue::Int64)
                .ok_or_else(|| mismatch(&self)),
            SqlType::Float64 => match &self {
                SqlValue::Text(s) => s.trim().parse().map(SqlValue::Float64).map_err(|_| mismatch(&self)),
                other => other
                    .as_i64()
                    .map(|v| SqlValue::Float64(v as f64))
                    .ok_or_else(|| mismatch(&self)),
            },
            SqlType::Bool => match &self {
                SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Ok(SqlValue::Bool(true)),
                    "false" | "f" | "0" => Ok(SqlValue::Bool(false)),
                    _ => Err(mismatch(&self)),
                },
                other => other
                    .as_i64()
                    .map(|v| SqlValue::Bool(v != 0))
                    .ok_or_else(|| mismatch(&self)),
            },
            SqlType::Text => match self {
                SqlValue::Int16(v) => Ok(SqlValue::Text(v.to_string())),
                SqlValue::Int32(v) => Ok(SqlValue::Text(v.to_string())),
                SqlValue::Int64(v) => Ok(SqlValue::Text(v.to_string())),
                SqlValue::Float64(v) => Ok(SqlValue::Text(v.to_string())),
                SqlValue::Bool(v) => Ok(SqlValue::Text(v.to_string())),
                other => Err(mismatch(&other)),
            },
            SqlType::Timestamp => match &self {
                SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                    .map(SqlValue::Timestamp)
                    .map_err(|_| mismatch(&self)),
                _ => Err(mismatch(&self)),
            },
            SqlType::Bytes => match self {
                SqlValue::Text(s) => Ok(SqlValue::Bytes(s.into_bytes())),
                other => Err(mismatch(&other)),
            },
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Int16(a), SqlValue::Int16(b)) => a == b,
            (SqlValue::Int32(a), SqlValue::Int32(b)) => a == b,
            (SqlValue::Int64(a), SqlValue::Int64(b)) => a == b,
            (SqlValue::Float64(a), SqlValue::Float64(b)) => a.to_bits() == b.to_bits(),
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a == b,
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SqlValue {}

impl Hash for SqlValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SqlValue::Null => {}
            SqlValue::Bool(v) => v.hash(state),
            SqlValue::Int16(v) => v.hash(state),
            SqlValue::Int32(v) => v.hash(state),
            SqlValue::Int64(v) => v.hash(state),
            SqlValue::Float64(v) => v.to_bits().hash(state),
            SqlValue::Text(v) => v.hash(state),
            SqlValue::Bytes(v) => v.hash(state),
            SqlValue::Timestamp(v) => v.hash(state),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("null"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int16(v) => write!(f, "{v}"),
            SqlValue::Int32(v) => write!(f, "{v}"),
            SqlValue::Int64(v) => write!(f, "{v}"),
            SqlValue::Float64(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Timestamp(v) => write!(f, "'{v}'"),
        }
    }
}

/// A bind slot value together with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindValue {
    pub value: SqlValue,
    pub sql_type: SqlType,
}

impl BindValue {
    pub fn new(value: SqlValue, sql_type: SqlType) -> Self {
        Self { value, sql_type }
    }

    /// Binds a non-null value under its natural type; NULL binds as text.
    pub fn of(value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        let sql_type = value.sql_type().unwrap_or(SqlType::Text);
        Self { value, sql_type }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i16> for SqlValue {
    fn from(value: i16) -> Self {
        SqlValue::Int16(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float64(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
