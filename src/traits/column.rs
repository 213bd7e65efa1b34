use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::traits::TableRef;
use crate::types::{SqlType, SqlValue};

/// Describes a database column: owning table, name, declared type and quoting.
/// Created once per entity declaration and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    pub table: TableRef,
    pub name: String,
    pub sql_type: SqlType,
    pub always_quote: bool,
}

/// A reference to a column, used internally by query builders.
/// This allows storing column information without the column's Rust type.
pub type ColumnRef = Arc<ColumnDescriptor>;

impl ColumnDescriptor {
    /// Returns the column name as it appears in the database.
    pub fn column_name(&self) -> &str {
        &self.name
    }

    /// Returns the table name this column belongs to.
    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    /// Returns the fully qualified column name (table.column).
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table_name(), self.column_name())
    }

    /// Column name as emitted in SQL.
    pub fn canonical_name(&self, quote: impl Fn(&str) -> String) -> String {
        if self.always_quote {
            quote(&self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Conversion between a Rust (exterior) value and its SQL (interior) value.
pub trait ColumnValue: Sized + Send + Sync + 'static {
    /// The declared SQL type of columns holding this value.
    const SQL_TYPE: SqlType;

    /// Unwraps the exterior value into its SQL representation.
    fn to_sql(&self) -> SqlValue;

    /// Wraps an SQL value into the exterior type.
    fn from_sql(value: SqlValue) -> std::result::Result<Self, String>;
}

/// A typed handle on a column.
/// Implementations are typically generated from entity declarations.
pub struct Column<T> {
    descriptor: ColumnRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ColumnValue> Column<T> {
    pub fn new(table: &TableRef, name: impl Into<String>) -> Self {
        Self::from_descriptor(ColumnDescriptor {
            table: Arc::clone(table),
            name: name.into(),
            sql_type: T::SQL_TYPE,
            always_quote: false,
        })
    }

    fn from_descriptor(descriptor: ColumnDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            _marker: PhantomData,
        }
    }

    /// Always quote the column name.
    pub fn quoted(self) -> Self {
        let mut descriptor = (*self.descriptor).clone();
        descriptor.always_quote = true;
        Self::from_descriptor(descriptor)
    }

    /// The same column on another instance of its table.
    pub fn in_table(&self, table: &TableRef) -> Self {
        let mut descriptor = (*self.descriptor).clone();
        descriptor.table = Arc::clone(table);
        Self::from_descriptor(descriptor)
    }
}

impl<T> Column<T> {
    pub fn descriptor(&self) -> &ColumnRef {
        &self.descriptor
    }

    pub fn column_name(&self) -> &str {
        self.descriptor.column_name()
    }

    pub fn table_name(&self) -> &str {
        self.descriptor.table_name()
    }

    pub fn qualified_name(&self) -> String {
        self.descriptor.qualified_name()
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column")
            .field(&self.descriptor.qualified_name())
            .finish()
    }
}

macro_rules! column_value {
    ($ty:ty, $sql_type:ident, $variant:ident) => {
        impl ColumnValue for $ty {
            const SQL_TYPE: SqlType = SqlType::$sql_type;

            fn to_sql(&self) -> SqlValue {
                SqlValue::$variant(self.clone())
            }

            fn from_sql(value: SqlValue) -> std::result::Result<Self, String> {
                match value.coerce(SqlType::$sql_type)? {
                    SqlValue::$variant(v) => Ok(v),
                    SqlValue::Null => Err(format!("unexpected NULL for {}", stringify!($ty))),
                    other => Err(format!("cannot read {other:?} as {}", stringify!($ty))),
                }
            }
        }
    };
}

column_value!(bool, Bool, Bool);
column_value!(i16, Int16, Int16);
column_value!(i32, Int32, Int32);
column_value!(i64, Int64, Int64);
column_value!(f64, Float64, Float64);
column_value!(String, Text, Text);
column_value!(Vec<u8>, Bytes, Bytes);
column_value!(NaiveDateTime, Timestamp, Timestamp);

impl<T: ColumnValue> ColumnValue for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;

    fn to_sql(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql(),
            None => SqlValue::Null,
        }
    }

    fn from_sql(value: SqlValue) -> std::result::Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_sql(value).map(Some)
        }
    }
}
