use std::marker::PhantomData;
use std::sync::Arc;

use crate::builders::support::{insert_context, prepare_insert};
use crate::client::Database;
use crate::context::{UpsertAction, UpsertContext};
use crate::error::Result;
use crate::statement::{Statement, UpsertStatementBuilder};
use crate::traits::{Column, ColumnRef, Entity, EntityMetamodel};
use crate::types::Row;

/// Inserts entities, updating or skipping rows whose keys already exist.
///
/// Conflicts are detected on the id columns unless other keys are named.
pub struct EntityUpsert<E: Entity> {
    db: Database,
    meta: EntityMetamodel,
    keys: Vec<ColumnRef>,
    do_nothing: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityUpsert<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            meta: E::metamodel(),
            keys: Vec::new(),
            do_nothing: false,
            _entity: PhantomData,
        }
    }

    /// Adds a conflict key column.
    pub fn on_conflict<T>(mut self, column: &Column<T>) -> Self {
        self.keys.push(Arc::clone(column.descriptor()));
        self
    }

    /// Skips conflicting rows instead of updating them.
    pub fn do_nothing(mut self) -> Self {
        self.do_nothing = true;
        self
    }

    /// Returns the affected row count reported by the backend.
    pub async fn single(&self, entity: &E) -> Result<u64> {
        let row = prepare_insert(&self.db, &self.meta, entity.to_row()).await?;
        self.db.update(&self.statement(&row)?).await
    }

    pub async fn batch(&self, entities: &[E]) -> Result<Vec<u64>> {
        let mut statements = Vec::with_capacity(entities.len());
        for entity in entities {
            let row = prepare_insert(&self.db, &self.meta, entity.to_row()).await?;
            statements.push(self.statement(&row)?);
        }
        self.db.update_batch(&statements).await
    }

    /// The statement `single` would send, without generating ids.
    pub fn dry_run(&self, entity: &E) -> Result<Statement> {
        self.statement(&entity.to_row())
    }

    fn statement(&self, row: &Row) -> Result<Statement> {
        let insert = insert_context(&self.meta, row)?;
        let keys = if self.keys.is_empty() {
            self.meta.id_columns().to_vec()
        } else {
            self.keys.clone()
        };
        let action = if self.do_nothing {
            UpsertAction::DoNothing
        } else {
            UpsertAction::DoUpdate(
                insert
                    .values
                    .iter()
                    .map(|(column, _)| column)
                    .filter(|c| !keys.contains(c) && !self.meta.is_created_at(c))
                    .cloned()
                    .collect(),
            )
        };
        let context = UpsertContext::new(insert, keys, action);
        Ok(UpsertStatementBuilder::new(self.db.dialect(), &context).build()?)
    }
}
