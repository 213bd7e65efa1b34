use std::marker::PhantomData;
use std::sync::Arc;

use crate::builders::support::{bumped, eq_current, increment, parameter, require_ids, WriteOptions};
use crate::clauses::{Criterion, IntoOperand};
use crate::client::Database;
use crate::context::UpdateContext;
use crate::error::{BuildError, RelqError, Result};
use crate::statement::{Statement, UpdateStatementBuilder};
use crate::traits::{Column, Entity, EntityMetamodel, TableRef};
use crate::types::{Row, SqlValue};

/// Updates entities by id, guarded by the version column when there is one.
///
/// The stored version is incremented by the statement itself; the returned
/// entity carries the new value.
pub struct EntityUpdate<E: Entity> {
    db: Database,
    meta: EntityMetamodel,
    options: WriteOptions,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityUpdate<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            meta: E::metamodel(),
            options: WriteOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Leaves the version out of the WHERE clause.
    pub fn ignore_version(mut self) -> Self {
        self.options.ignore_version = true;
        self
    }

    /// Treats a missed version check as success.
    pub fn suppress_optimistic_lock_error(mut self) -> Self {
        self.options.suppress_optimistic_lock_error = true;
        self
    }

    pub async fn single(&self, entity: &E) -> Result<E> {
        let (row, statement) = self.prepare(entity)?;
        let count = self.db.update(&statement).await?;
        self.finish(row, count, None)
    }

    /// Updates every entity in driver batches; statements are built before any is sent.
    pub async fn batch(&self, entities: &[E]) -> Result<Vec<E>> {
        let prepared = entities
            .iter()
            .map(|entity| self.prepare(entity))
            .collect::<Result<Vec<_>>>()?;
        let statements: Vec<Statement> = prepared.iter().map(|(_, s)| s.clone()).collect();
        let counts = self.db.update_batch(&statements).await?;
        prepared
            .into_iter()
            .zip(counts)
            .enumerate()
            .map(|(index, ((row, _), count))| self.finish(row, count, Some(index)))
            .collect()
    }

    pub fn dry_run(&self, entity: &E) -> Result<Statement> {
        self.prepare(entity).map(|(_, statement)| statement)
    }

    fn checks_version(&self) -> bool {
        self.meta.version_column().is_some() && !self.options.ignore_version
    }

    fn prepare(&self, entity: &E) -> Result<(Row, Statement)> {
        let meta = &self.meta;
        let table = meta.table().table_name().to_string();
        let mut row = entity.to_row();
        require_ids(meta, &row)?;
        if self.checks_version() {
            if let Some(version) = meta.version_column() {
                if row.get_by_name(&version.name)?.is_null() {
                    return Err(BuildError::MissingVersion(table).into());
                }
            }
        }
        if let Some(updated_at) = meta.updated_at_column() {
            row.set_value(updated_at.name.clone(), SqlValue::Timestamp(self.db.now()));
        }

        let mut context = UpdateContext::new(meta.table());
        for column in meta.columns() {
            if meta.is_id(column) || meta.is_version(column) || meta.is_created_at(column) {
                continue;
            }
            context = context.assign(Arc::clone(column), parameter(&row, column)?);
        }
        if let Some(version) = meta.version_column() {
            context = context.assign(Arc::clone(version), increment(version));
        }
        for id in meta.id_columns() {
            context = context.where_(eq_current(&row, id)?);
        }
        if self.checks_version() {
            if let Some(version) = meta.version_column() {
                context = context.where_(eq_current(&row, version)?);
            }
        }

        let statement = UpdateStatementBuilder::new(
            self.db.dialect(),
            &self.db.config().escape_sequence,
            &context,
        )
        .build()?;
        Ok((row, statement))
    }

    fn finish(&self, mut row: Row, count: u64, batch_index: Option<usize>) -> Result<E> {
        if count == 0 && self.checks_version() && !self.options.suppress_optimistic_lock_error {
            return Err(RelqError::OptimisticLockConflict {
                table: self.meta.table().table_name().to_string(),
                batch_index,
            });
        }
        if count > 0 {
            if let Some(version) = self.meta.version_column() {
                let next = bumped(&row, version)?;
                row.set_value(version.name.clone(), next);
            }
        }
        E::from_row(&row)
    }
}

/// `update ... set ... where ...` on a table.
pub struct SqlUpdate {
    db: Database,
    context: UpdateContext,
}

impl SqlUpdate {
    pub(crate) fn new(db: Database, table: &TableRef) -> Self {
        Self {
            db,
            context: UpdateContext::new(table),
        }
    }

    pub fn set<T>(mut self, column: &Column<T>, value: impl IntoOperand<T>) -> Self {
        self.context = self.context.set(column, value);
        self
    }

    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.context = self.context.where_(criterion);
        self
    }

    /// Without this, an update with no WHERE clause fails to build.
    pub fn allow_empty_where(mut self) -> Self {
        self.context = self.context.allow_empty_where();
        self
    }

    pub fn dry_run(&self) -> Result<Statement> {
        Ok(UpdateStatementBuilder::new(
            self.db.dialect(),
            &self.db.config().escape_sequence,
            &self.context,
        )
        .build()?)
    }

    /// Returns the number of updated rows.
    pub async fn execute(&self) -> Result<u64> {
        self.db.update(&self.dry_run()?).await
    }
}
