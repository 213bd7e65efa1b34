use std::marker::PhantomData;

use crate::builders::support::{eq_current, require_ids, WriteOptions};
use crate::clauses::Criterion;
use crate::client::Database;
use crate::context::DeleteContext;
use crate::error::{BuildError, RelqError, Result};
use crate::statement::{DeleteStatementBuilder, Statement};
use crate::traits::{Entity, EntityMetamodel, TableRef};

/// Deletes entities by id, guarded by the version column when there is one.
pub struct EntityDelete<E: Entity> {
    db: Database,
    meta: EntityMetamodel,
    options: WriteOptions,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityDelete<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            meta: E::metamodel(),
            options: WriteOptions::default(),
            _entity: PhantomData,
        }
    }

    pub fn ignore_version(mut self) -> Self {
        self.options.ignore_version = true;
        self
    }

    pub fn suppress_optimistic_lock_error(mut self) -> Self {
        self.options.suppress_optimistic_lock_error = true;
        self
    }

    /// Returns the number of deleted rows.
    pub async fn single(&self, entity: &E) -> Result<u64> {
        let count = self.db.update(&self.dry_run(entity)?).await?;
        self.check(count, None)?;
        Ok(count)
    }

    pub async fn batch(&self, entities: &[E]) -> Result<Vec<u64>> {
        let statements = entities
            .iter()
            .map(|entity| self.dry_run(entity))
            .collect::<Result<Vec<_>>>()?;
        let counts = self.db.update_batch(&statements).await?;
        for (index, count) in counts.iter().enumerate() {
            self.check(*count, Some(index))?;
        }
        Ok(counts)
    }

    pub fn dry_run(&self, entity: &E) -> Result<Statement> {
        let meta = &self.meta;
        let row = entity.to_row();
        require_ids(meta, &row)?;

        let mut context = DeleteContext::new(meta.table());
        for id in meta.id_columns() {
            context = context.where_(eq_current(&row, id)?);
        }
        if let Some(version) = meta.version_column().filter(|_| self.checks_version()) {
            if row.get_by_name(&version.name)?.is_null() {
                return Err(BuildError::MissingVersion(meta.table().table_name().to_string()).into());
            }
            context = context.where_(eq_current(&row, version)?);
        }
        Ok(DeleteStatementBuilder::new(
            self.db.dialect(),
            &self.db.config().escape_sequence,
            &context,
        )
        .build()?)
    }

    fn checks_version(&self) -> bool {
        self.meta.version_column().is_some() && !self.options.ignore_version
    }

    fn check(&self, count: u64, batch_index: Option<usize>) -> Result<()> {
        if count == 0 && self.checks_version() && !self.options.suppress_optimistic_lock_error {
            return Err(RelqError::OptimisticLockConflict {
                table: self.meta.table().table_name().to_string(),
                batch_index,
            });
        }
        Ok(())
    }
}

/// `delete from ... where ...` on a table.
pub struct SqlDelete {
    db: Database,
    context: DeleteContext,
}

impl SqlDelete {
    pub(crate) fn new(db: Database, table: &TableRef) -> Self {
        Self {
            db,
            context: DeleteContext::new(table),
        }
    }

    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.context = self.context.where_(criterion);
        self
    }

    /// Without this, a delete with no WHERE clause fails to build.
    pub fn allow_empty_where(mut self) -> Self {
        self.context = self.context.allow_empty_where();
        self
    }

    pub fn dry_run(&self) -> Result<Statement> {
        Ok(DeleteStatementBuilder::new(
            self.db.dialect(),
            &self.db.config().escape_sequence,
            &self.context,
        )
        .build()?)
    }

    /// Returns the number of deleted rows.
    pub async fn execute(&self) -> Result<u64> {
        self.db.update(&self.dry_run()?).await
    }
}
