//! Primary-key generation strategies.
//!
//! Sequence and table generators hand out values from a cached block and only
//! go back to the database when the block is used up. Each generator key has
//! its own lock, so refreshes for different keys never wait on each other.

mod sequence;
mod table;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::DatabaseConfig;
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};
use crate::traits::DatabaseDriver;

pub(crate) use sequence::SequenceGenerator;
pub(crate) use table::TableGenerator;

/// How an entity's id is produced at insert time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdGenerator {
    /// The caller supplies the id
    Assigned,
    /// The database assigns the id and reports it back
    Identity,
    /// Values come from a database sequence declared with `increment by <increment_by>`
    Sequence { name: String, increment_by: i64 },
    /// Values come from a counter row `key -> value` in a dedicated table
    Table {
        table: String,
        key_column: String,
        value_column: String,
        key: String,
        increment_by: i64,
    },
}

impl IdGenerator {
    pub fn sequence(name: impl Into<String>, increment_by: i64) -> Self {
        IdGenerator::Sequence {
            name: name.into(),
            increment_by: increment_by.max(1),
        }
    }

    pub fn table(
        table: impl Into<String>,
        key_column: impl Into<String>,
        value_column: impl Into<String>,
        key: impl Into<String>,
        increment_by: i64,
    ) -> Self {
        IdGenerator::Table {
            table: table.into(),
            key_column: key_column.into(),
            value_column: value_column.into(),
            key: key.into(),
            increment_by: increment_by.max(1),
        }
    }

    /// True when a value must be generated before the insert.
    pub fn is_generated_before_insert(&self) -> bool {
        matches!(self, IdGenerator::Sequence { .. } | IdGenerator::Table { .. })
    }
}

/// Generator state of one database, created lazily per generator key.
#[derive(Default)]
pub(crate) struct IdGeneratorRegistry {
    sequences: Mutex<HashMap<String, Arc<SequenceGenerator>>>,
    tables: Mutex<HashMap<String, Arc<TableGenerator>>>,
}

impl IdGeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value for `generator`, `None` for strategies that do not generate up front.
    pub async fn next_id(
        &self,
        generator: &IdGenerator,
        driver: &dyn DatabaseDriver,
        dialect: &dyn Dialect,
        config: &DatabaseConfig,
    ) -> Result<Option<i64>> {
        match generator {
            IdGenerator::Assigned | IdGenerator::Identity => Ok(None),
            IdGenerator::Sequence { name, increment_by } => {
                let sequence = {
                    let mut sequences = self.sequences.lock().unwrap_or_else(|e| e.into_inner());
                    Arc::clone(
                        sequences
                            .entry(name.clone())
                            .or_insert_with(|| Arc::new(SequenceGenerator::new(name, *increment_by))),
                    )
                };
                if sequence.increment_by() != *increment_by {
                    return Err(BuildError::ConflictingSequence {
                        name: name.clone(),
                        registered: sequence.increment_by(),
                        requested: *increment_by,
                    }
                    .into());
                }
                sequence.next(driver, dialect).await.map(Some)
            }
            IdGenerator::Table {
                table,
                key_column,
                value_column,
                key,
                increment_by,
            } => {
                let generator = {
                    let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
                    Arc::clone(tables.entry(format!("{table}/{key}")).or_insert_with(|| {
                        Arc::new(TableGenerator::new(table, key_column, value_column, key, *increment_by))
                    }))
                };
                generator
                    .next(driver, config.table_generator_max_attempts)
                    .await
                    .map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgreSqlDialect;
    use crate::drivers::InMemoryTestDriver;
    use crate::error::RelqError;
    use crate::types::{RawQueryResult, SqlValue};

    #[tokio::test]
    async fn test_sequence_declared_with_two_steps_is_rejected() {
        let driver = InMemoryTestDriver::new().with_response(RawQueryResult::new(
            vec!["nextval".to_string()],
            vec![vec![SqlValue::Int64(1)]],
        ));
        let registry = IdGeneratorRegistry::new();
        let config = DatabaseConfig::default();

        let first = registry
            .next_id(&IdGenerator::sequence("SHARED_SEQ", 100), &driver, &PostgreSqlDialect, &config)
            .await
            .unwrap();
        assert_eq!(first, Some(1));

        let err = registry
            .next_id(&IdGenerator::sequence("SHARED_SEQ", 50), &driver, &PostgreSqlDialect, &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelqError::Build(BuildError::ConflictingSequence {
                ref name,
                registered: 100,
                requested: 50,
            }) if name == "SHARED_SEQ"
        ));
        driver.assert_query_count(1);
    }
}
