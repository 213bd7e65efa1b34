//! Synchronous execution: a driver whose calls block the caller, and a
//! database facade that drives queries to completion on its own runtime.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::{Builder, Runtime};

use crate::client::Database;
use crate::config::{Clock, DatabaseConfig};
use crate::dialect::Dialect;
use crate::error::{DriverError, DriverResult, Result};
use crate::querier::Querier;
use crate::statement::Statement;
use crate::traits::DatabaseDriver;
use crate::types::RawQueryResult;

/// A driver that executes one statement per call on the caller's thread.
pub trait BlockingDriver: Send + Sync {
    fn execute(&self, statement: &Statement) -> DriverResult<RawQueryResult>;

    fn execute_update(&self, statement: &Statement) -> DriverResult<u64> {
        Ok(self.execute(statement)?.rows_affected)
    }

    fn execute_batch(&self, statements: &[Statement]) -> DriverResult<Vec<u64>> {
        statements.iter().map(|s| self.execute_update(s)).collect()
    }

    fn execute_returning_keys(
        &self,
        _statement: &Statement,
        _key_columns: &[String],
    ) -> DriverResult<RawQueryResult> {
        Err(DriverError::QueryFailed(
            "driver cannot return generated keys".to_string(),
        ))
    }
}

struct BlockingAdapter<D>(D);

#[async_trait]
impl<D: BlockingDriver> DatabaseDriver for BlockingAdapter<D> {
    async fn execute(&self, statement: &Statement) -> DriverResult<RawQueryResult> {
        self.0.execute(statement)
    }

    async fn execute_update(&self, statement: &Statement) -> DriverResult<u64> {
        self.0.execute_update(statement)
    }

    async fn execute_batch(&self, statements: &[Statement]) -> DriverResult<Vec<u64>> {
        self.0.execute_batch(statements)
    }

    async fn execute_returning_keys(
        &self,
        statement: &Statement,
        key_columns: &[String],
    ) -> DriverResult<RawQueryResult> {
        self.0.execute_returning_keys(statement, key_columns)
    }
}

/// A [`Database`] whose queries run to completion before returning.
///
/// Must not be used from inside another tokio runtime.
///
/// # Example
/// ```ignore
/// let db = BlockingDatabase::new(driver, Arc::new(H2Dialect))?;
/// let addresses = db.block_on(db.querier().select::<Address>().execute())?;
/// ```
pub struct BlockingDatabase {
    runtime: Runtime,
    db: Database,
}

impl BlockingDatabase {
    pub fn new<D: BlockingDriver + 'static>(driver: D, dialect: Arc<dyn Dialect>) -> Result<Self> {
        Self::wrap(Database::new(Arc::new(BlockingAdapter(driver)), dialect))
    }

    /// Runs an existing database on a dedicated current-thread runtime.
    pub fn wrap(db: Database) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime, db })
    }

    pub fn with_config(mut self, config: DatabaseConfig) -> Self {
        self.db = self.db.with_config(config);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.db = self.db.with_clock(clock);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn querier(&self) -> Querier {
        self.db.querier()
    }

    /// Runs a query future on this database's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
