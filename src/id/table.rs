use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{DriverError, RelqError, Result};
use crate::statement::{Statement, StatementBuffer};
use crate::traits::DatabaseDriver;
use crate::types::{BindValue, SqlType, SqlValue};

#[derive(Debug, Default)]
struct Block {
    next: i64,
    remaining: i64,
}

/// Hands out values reserved from a counter row.
///
/// A block is reserved by reading the counter and moving it forward with a
/// conditional update that only matches the value just read. If another
/// writer moved the counter first, the update matches nothing and the
/// reservation is retried.
#[derive(Debug)]
pub(crate) struct TableGenerator {
    table: String,
    key_column: String,
    value_column: String,
    key: String,
    increment_by: i64,
    block: Mutex<Block>,
}

impl TableGenerator {
    pub fn new(table: &str, key_column: &str, value_column: &str, key: &str, increment_by: i64) -> Self {
        Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
            key: key.to_string(),
            increment_by,
            block: Mutex::new(Block::default()),
        }
    }

    pub async fn next(&self, driver: &dyn DatabaseDriver, max_attempts: u32) -> Result<i64> {
        let mut block = self.block.lock().await;
        if block.remaining == 0 {
            let start = self.reserve(driver, max_attempts).await?;
            debug!(table = %self.table, key = %self.key, start, size = self.increment_by, "Reserved id block");
            *block = Block {
                next: start,
                remaining: self.increment_by,
            };
        }
        let id = block.next;
        block.next += 1;
        block.remaining -= 1;
        Ok(id)
    }

    async fn reserve(&self, driver: &dyn DatabaseDriver, max_attempts: u32) -> Result<i64> {
        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let current = self.read(driver).await?;
            match driver.execute_update(&self.advance(current)).await {
                Ok(1) => return Ok(current),
                Ok(_) => {
                    warn!(key = %self.key, attempt, "Id counter moved concurrently, retrying");
                }
                Err(DriverError::LockConflict(message)) => {
                    warn!(key = %self.key, attempt, %message, "Id counter locked, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RelqError::IdentifierGenerationExhausted {
            key: self.key.clone(),
            attempts: max_attempts,
        })
    }

    async fn read(&self, driver: &dyn DatabaseDriver) -> Result<i64> {
        let mut buf = StatementBuffer::new();
        buf.append(&format!(
            "select {} from {} where {} = ",
            self.value_column, self.table, self.key_column
        ))
        .bind(self.key_value());
        let result = driver.execute(&buf.build()).await?;
        result
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|value| value.as_i64())
            .ok_or_else(|| {
                RelqError::IdentifierGeneration(format!(
                    "no counter row for '{}' in {}",
                    self.key, self.table
                ))
            })
    }

    /// `update T set VALUE = current + n where KEY = ? and VALUE = current`
    fn advance(&self, current: i64) -> Statement {
        let mut buf = StatementBuffer::new();
        buf.append(&format!("update {} set {} = ", self.table, self.value_column))
            .bind(BindValue::new(SqlValue::Int64(current + self.increment_by), SqlType::Int64))
            .append(&format!(" where {} = ", self.key_column))
            .bind(self.key_value())
            .append(&format!(" and {} = ", self.value_column))
            .bind(BindValue::new(SqlValue::Int64(current), SqlType::Int64));
        buf.build()
    }

    fn key_value(&self) -> BindValue {
        BindValue::new(SqlValue::Text(self.key.clone()), SqlType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::InMemoryTestDriver;
    use crate::types::RawQueryResult;

    fn counter(value: i64) -> RawQueryResult {
        RawQueryResult::new(vec!["VALUE".to_string()], vec![vec![SqlValue::Int64(value)]])
    }

    fn generator() -> TableGenerator {
        TableGenerator::new("ID_GENERATOR", "KEY", "VALUE", "ADDRESS", 10)
    }

    #[tokio::test]
    async fn test_reserves_a_block() {
        let driver = InMemoryTestDriver::new()
            .with_response(counter(1))
            .with_response(RawQueryResult::affected(1));
        let generator = generator();

        for expected in 1..=10 {
            assert_eq!(generator.next(&driver, 5).await.unwrap(), expected);
        }
        driver.assert_query_count(2);
        driver.assert_last_query(
            "update ID_GENERATOR set VALUE = ? where KEY = ? and VALUE = ?",
            &[SqlValue::Int64(11), SqlValue::from("ADDRESS"), SqlValue::Int64(1)],
        );
    }

    #[tokio::test]
    async fn test_retries_after_concurrent_change() {
        let driver = InMemoryTestDriver::new()
            .with_response(counter(1))
            .with_response(RawQueryResult::affected(0))
            .with_response(counter(11))
            .with_error(DriverError::LockConflict("row locked".to_string()))
            .with_response(counter(21))
            .with_response(RawQueryResult::affected(1));

        assert_eq!(generator().next(&driver, 5).await.unwrap(), 21);
        driver.assert_query_count(6);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let driver = InMemoryTestDriver::new().with_handler(|query| {
            if query.sql.starts_with("select") {
                Ok(counter(1))
            } else {
                Ok(RawQueryResult::affected(0))
            }
        });
        let generator = generator();

        let err = generator.next(&driver, 3).await.unwrap_err();
        assert!(matches!(
            err,
            RelqError::IdentifierGenerationExhausted { ref key, attempts: 3 } if key == "ADDRESS"
        ));
        driver.assert_query_count(6);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let driver = InMemoryTestDriver::new()
            .with_response(counter(1))
            .with_error(DriverError::Timeout);
        let err = generator().next(&driver, 5).await.unwrap_err();
        assert!(matches!(err, RelqError::Execution(DriverError::Timeout)));
        driver.assert_query_count(2);
    }
}
