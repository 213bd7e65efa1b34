use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{DriverError, DriverResult};
use crate::statement::Statement;
use crate::types::{RawQueryResult, SqlValue};

/// Rows delivered one at a time, in result order.
pub type RowStream = BoxStream<'static, DriverResult<Vec<SqlValue>>>;

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Connecting to the database
/// - Rendering the statement's bind slots in their placeholder style
/// - Converting SqlValue parameters to native types
/// - Classifying backend failures into `DriverError`
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Execute a statement that returns rows.
    async fn execute(&self, statement: &Statement) -> DriverResult<RawQueryResult>;

    /// Execute a statement and return the number of affected rows.
    async fn execute_update(&self, statement: &Statement) -> DriverResult<u64> {
        Ok(self.execute(statement).await?.rows_affected)
    }

    /// Execute several statements, one affected-row count per statement.
    async fn execute_batch(&self, statements: &[Statement]) -> DriverResult<Vec<u64>> {
        let mut counts = Vec::with_capacity(statements.len());
        for statement in statements {
            counts.push(self.execute_update(statement).await?);
        }
        Ok(counts)
    }

    /// Execute an insert and return the keys the backend generated for it.
    async fn execute_returning_keys(
        &self,
        _statement: &Statement,
        _key_columns: &[String],
    ) -> DriverResult<RawQueryResult> {
        Err(DriverError::QueryFailed(
            "driver cannot return generated keys".to_string(),
        ))
    }

    /// Execute a statement and deliver its rows as a stream.
    async fn stream(&self, statement: &Statement) -> DriverResult<RowStream> {
        let result = self.execute(statement).await?;
        Ok(stream::iter(result.rows.into_iter().map(Ok)).boxed())
    }
}
