mod row;
mod sql_value;

pub use row::{QueryResult, RawQueryResult, Row};
pub use sql_value::{BindValue, SqlType, SqlValue};
