use std::collections::HashMap;

use crate::client::Database;
use crate::error::Result;
use crate::statement::Statement;
use crate::types::{BindValue, QueryResult, SqlValue};

/// Caller-written SQL with `:name` parameters.
///
/// # Example
/// ```ignore
/// let rows = querier
///     .template("select * from ADDRESS where STREET = :street")
///     .bind("street", "STREET 1")
///     .execute()
///     .await?;
/// ```
pub struct TemplateQuery {
    db: Database,
    sql: String,
    params: HashMap<String, BindValue>,
}

impl TemplateQuery {
    pub(crate) fn new(db: Database, sql: impl Into<String>) -> Self {
        Self {
            db,
            sql: sql.into(),
            params: HashMap::new(),
        }
    }

    /// Binds a value to `:name`; binding the same name again replaces it.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.params.insert(name.into(), BindValue::of(value));
        self
    }

    /// Binds a value with an explicit type, e.g. a typed NULL.
    pub fn bind_value(mut self, name: impl Into<String>, value: BindValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn dry_run(&self) -> Result<Statement> {
        Ok(self
            .db
            .dialect()
            .template_statement_builder()
            .build(&self.sql, &self.params)?)
    }

    pub async fn execute(&self) -> Result<QueryResult> {
        let raw = self.db.query(&self.dry_run()?).await?;
        Ok(QueryResult::from_raw(raw))
    }

    /// Runs a statement that returns no rows and reports the affected count.
    pub async fn execute_update(&self) -> Result<u64> {
        self.db.update(&self.dry_run()?).await
    }
}
