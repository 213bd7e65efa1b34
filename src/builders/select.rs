use std::marker::PhantomData;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::builders::association::{plan, Association, EntityStore, Slot};
use crate::clauses::{Criterion, Expr, SortItem};
use crate::client::Database;
use crate::context::{JoinKind, SelectContext};
use crate::error::{RelqError, Result};
use crate::statement::{SelectStatementBuilder, Statement};
use crate::traits::{ColumnValue, Entity, EntityMetamodel};
use crate::types::{RawQueryResult, SqlValue};

fn build(db: &Database, context: &SelectContext) -> Result<Statement> {
    Ok(SelectStatementBuilder::new(db.dialect(), &db.config().escape_sequence, context).build()?)
}

fn exactly_one<T>(mut items: Vec<T>) -> Result<T> {
    if items.len() != 1 {
        return Err(RelqError::UnexpectedRowCount {
            expected: 1,
            actual: items.len(),
        });
    }
    items.pop().ok_or(RelqError::UnexpectedRowCount {
        expected: 1,
        actual: 0,
    })
}

/// Selects entities of type `E`, optionally joined with other entities.
///
/// Without associations every row yields one `E`. With associations the
/// joined entities are folded into their parents and each `E` appears once,
/// in the order it was first read.
///
/// # Example
/// ```ignore
/// let a = Address::meta();
/// let addresses = querier
///     .select::<Address>()
///     .where_(a.street.starts_with("STREET"))
///     .order_by(a.address_id.desc())
///     .limit(10)
///     .execute()
///     .await?;
/// ```
pub struct EntitySelect<E: Entity> {
    db: Database,
    context: SelectContext,
    slots: Vec<Slot>,
    associations: Vec<Association>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntitySelect<E> {
    pub(crate) fn new(db: Database) -> Self {
        let meta = E::metamodel();
        Self {
            db,
            context: SelectContext::of(&meta),
            slots: vec![Slot::of::<E>(meta)],
            associations: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn inner_join<J: Entity>(self, on: Criterion) -> Self {
        self.join_with::<J>(J::metamodel(), JoinKind::Inner, on)
    }

    pub fn left_join<J: Entity>(self, on: Criterion) -> Self {
        self.join_with::<J>(J::metamodel(), JoinKind::Left, on)
    }

    /// Joins `J` through an explicit metamodel, e.g. an aliased one for a self join.
    pub fn join_with<J: Entity>(mut self, meta: EntityMetamodel, kind: JoinKind, on: Criterion) -> Self {
        self.context = self.context.join(&meta, kind, on);
        self.slots.push(Slot::of::<J>(meta));
        self
    }

    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.context = self.context.where_(criterion);
        self
    }

    pub fn order_by(mut self, item: impl Into<SortItem>) -> Self {
        self.context = self.context.order_by(item);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.context = self.context.offset(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.context = self.context.limit(limit);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.context = self.context.for_update();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.context = self.context.distinct();
        self
    }

    /// Folds each joined `B` into the `A` it was read with.
    ///
    /// Associations run in declaration order, so an association whose `A`
    /// is itself folded into another entity should be declared first.
    pub fn associate<A: Entity, B: Entity>(mut self, f: impl Fn(A, &B) -> A + Send + Sync + 'static) -> Self {
        self.associations.push(Association::new::<A, B>(f));
        self
    }

    /// Projects a single expression instead of the entity.
    pub fn select<T: ColumnValue>(self, expr: impl Into<Expr<T>>) -> ScalarSelect<T> {
        ScalarSelect {
            db: self.db,
            context: self.context.select(expr),
            _value: PhantomData,
        }
    }

    pub fn context(&self) -> &SelectContext {
        &self.context
    }

    pub fn dry_run(&self) -> Result<Statement> {
        build(&self.db, &self.context)
    }

    pub async fn execute(&self) -> Result<Vec<E>> {
        let statement = self.dry_run()?;
        let plan = plan(&self.associations, &self.slots)?;
        let raw = self.db.query(&statement).await?;
        if self.associations.is_empty() {
            return raw.rows.iter().map(|values| self.main(values)).collect();
        }
        self.fold(&raw, &plan)
    }

    /// Fails unless exactly one entity is found.
    pub async fn single(&self) -> Result<E> {
        exactly_one(self.execute().await?)
    }

    pub async fn first_or_none(&self) -> Result<Option<E>> {
        Ok(self.execute().await?.into_iter().next())
    }

    /// Streams main entities row by row; associations are not applied.
    pub async fn stream(&self) -> Result<BoxStream<'static, Result<E>>> {
        let statement = self.dry_run()?;
        let rows = self.db.stream(&statement).await?;
        let slot = self.slots[0].clone();
        let dialect = self.db.dialect_ref();
        Ok(rows
            .map(move |values| {
                let row = slot.row(dialect.as_ref(), &values?, 0)?;
                E::from_row(&row)
            })
            .boxed())
    }

    fn main(&self, values: &[SqlValue]) -> Result<E> {
        E::from_row(&self.slots[0].row(self.db.dialect(), values, 0)?)
    }

    fn fold(&self, raw: &RawQueryResult, plan: &[(usize, usize)]) -> Result<Vec<E>> {
        let mut store = EntityStore::load(&self.slots, self.db.dialect(), &raw.rows)?;
        for (association, &(left, right)) in self.associations.iter().zip(plan) {
            store.apply(association, left, right)?;
        }
        store.roots::<E>()
    }
}

/// Selects one expression per row, e.g. a column or an aggregate.
pub struct ScalarSelect<T> {
    db: Database,
    context: SelectContext,
    _value: PhantomData<fn() -> T>,
}

impl<T: ColumnValue> ScalarSelect<T> {
    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.context = self.context.where_(criterion);
        self
    }

    pub fn order_by(mut self, item: impl Into<SortItem>) -> Self {
        self.context = self.context.order_by(item);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.context = self.context.offset(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.context = self.context.limit(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.context = self.context.distinct();
        self
    }

    pub fn dry_run(&self) -> Result<Statement> {
        build(&self.db, &self.context)
    }

    pub async fn execute(&self) -> Result<Vec<T>> {
        let raw = self.db.query(&self.dry_run()?).await?;
        raw.rows.iter().map(|values| self.value(values)).collect()
    }

    pub async fn single(&self) -> Result<T> {
        exactly_one(self.execute().await?)
    }

    pub async fn first_or_none(&self) -> Result<Option<T>> {
        Ok(self.execute().await?.into_iter().next())
    }

    fn value(&self, values: &[SqlValue]) -> Result<T> {
        let value = self.db.dialect().value_of(values, 0, T::SQL_TYPE)?;
        T::from_sql(value).map_err(RelqError::Mapping)
    }
}
