use tokio::sync::Mutex;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{BuildError, RelqError, Result};
use crate::statement::Statement;
use crate::traits::DatabaseDriver;

#[derive(Debug, Default)]
struct Block {
    next: i64,
    remaining: i64,
}

/// Hands out values of a database sequence, fetching `increment_by` at a time.
///
/// The block lock is held across the refresh round-trip, so at most one
/// refresh per sequence is in flight and concurrent callers wait for it.
#[derive(Debug)]
pub(crate) struct SequenceGenerator {
    name: String,
    increment_by: i64,
    block: Mutex<Block>,
}

impl SequenceGenerator {
    pub fn new(name: &str, increment_by: i64) -> Self {
        Self {
            name: name.to_string(),
            increment_by,
            block: Mutex::new(Block::default()),
        }
    }

    pub fn increment_by(&self) -> i64 {
        self.increment_by
    }

    pub async fn next(&self, driver: &dyn DatabaseDriver, dialect: &dyn Dialect) -> Result<i64> {
        let mut block = self.block.lock().await;
        if block.remaining == 0 {
            let start = self.fetch(driver, dialect).await?;
            debug!(sequence = %self.name, start, size = self.increment_by, "Refreshed sequence block");
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

    async fn fetch(&self, driver: &dyn DatabaseDriver, dialect: &dyn Dialect) -> Result<i64> {
        let sql = dialect.sequence_sql(&self.name).ok_or(BuildError::Unsupported {
            dialect: dialect.name(),
            feature: "sequences",
        })?;
        let result = driver.execute(&Statement::text(sql)).await?;
        result
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|value| value.as_i64())
            .ok_or_else(|| {
                RelqError::IdentifierGeneration(format!("sequence '{}' returned no value", self.name))
            })
    }
}
