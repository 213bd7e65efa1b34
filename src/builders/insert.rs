use std::marker::PhantomData;

use crate::builders::support::{apply_generated_key, insert_context, prepare_insert};
use crate::clauses::IntoOperand;
use crate::client::Database;
use crate::context::InsertContext;
use crate::dialect::GeneratedKeyMode;
use crate::error::Result;
use crate::id::IdGenerator;
use crate::statement::{InsertStatementBuilder, Statement};
use crate::traits::{Column, Entity, EntityMetamodel, TableRef};
use crate::types::Row;

/// Inserts entities, filling generated ids, versions and timestamps.
///
/// # Example
/// ```ignore
/// let saved = querier.insert::<Address>().single(&address).await?;
/// ```
pub struct EntityInsert<E: Entity> {
    db: Database,
    meta: EntityMetamodel,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityInsert<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            meta: E::metamodel(),
            _entity: PhantomData,
        }
    }

    /// Inserts one entity and returns it as stored.
    pub async fn single(&self, entity: &E) -> Result<E> {
        let row = prepare_insert(&self.db, &self.meta, entity.to_row()).await?;
        let context = self.context(&row)?;
        let row = self.write(row, &context).await?;
        E::from_row(&row)
    }

    /// Inserts every entity; nothing is written unless all of them are valid.
    pub async fn batch(&self, entities: &[E]) -> Result<Vec<E>> {
        let mut rows = Vec::with_capacity(entities.len());
        for entity in entities {
            rows.push(prepare_insert(&self.db, &self.meta, entity.to_row()).await?);
        }
        let contexts = rows
            .iter()
            .map(|row| self.context(row))
            .collect::<Result<Vec<_>>>()?;

        if self.is_identity() {
            // generated keys are read back one insert at a time
            let mut written = Vec::with_capacity(rows.len());
            for (row, context) in rows.into_iter().zip(&contexts) {
                written.push(self.write(row, context).await?);
            }
            rows = written;
        } else {
            let statements = contexts
                .iter()
                .map(|context| self.statement(context))
                .collect::<Result<Vec<_>>>()?;
            self.db.update_batch(&statements).await?;
        }
        rows.iter().map(E::from_row).collect()
    }

    /// The statement `single` would send, without generating ids.
    pub fn dry_run(&self, entity: &E) -> Result<Statement> {
        self.statement(&self.context(&entity.to_row())?)
    }

    fn is_identity(&self) -> bool {
        matches!(self.meta.generator(), IdGenerator::Identity)
    }

    fn context(&self, row: &Row) -> Result<InsertContext> {
        let context = insert_context(&self.meta, row)?;
        let returning = self.is_identity()
            && self.db.dialect().generated_key_mode() == GeneratedKeyMode::Returning;
        Ok(if returning {
            context.returning(self.meta.id_columns().to_vec())
        } else {
            context
        })
    }

    fn statement(&self, context: &InsertContext) -> Result<Statement> {
        Ok(InsertStatementBuilder::new(self.db.dialect(), context).build()?)
    }

    async fn write(&self, mut row: Row, context: &InsertContext) -> Result<Row> {
        let statement = self.statement(context)?;
        if !self.is_identity() {
            self.db.update(&statement).await?;
            return Ok(row);
        }
        let keys = match self.db.dialect().generated_key_mode() {
            GeneratedKeyMode::Returning => self.db.query(&statement).await?,
            GeneratedKeyMode::Driver => {
                let names: Vec<String> = self
                    .meta
                    .id_columns()
                    .iter()
                    .map(|c| c.name.clone())
                    .collect();
                self.db.insert_returning_keys(&statement, &names).await?
            }
        };
        apply_generated_key(&self.db, &self.meta, &mut row, &keys.rows)?;
        Ok(row)
    }
}

/// `insert into` with explicit column values.
pub struct SqlInsert {
    db: Database,
    context: InsertContext,
}

impl SqlInsert {
    pub(crate) fn new(db: Database, table: &TableRef) -> Self {
        Self {
            db,
            context: InsertContext::new(table),
        }
    }

    pub fn value<T>(mut self, column: &Column<T>, value: impl IntoOperand<T>) -> Self {
        self.context = self.context.value(column, value);
        self
    }

    pub fn dry_run(&self) -> Result<Statement> {
        Ok(InsertStatementBuilder::new(self.db.dialect(), &self.context).build()?)
    }

    /// Returns the number of inserted rows.
    pub async fn execute(&self) -> Result<u64> {
        self.db.update(&self.dry_run()?).await
    }
}
