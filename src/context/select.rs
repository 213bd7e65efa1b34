use std::sync::Arc;

use crate::clauses::{ColumnExpr, Criterion, Expr, SortItem};
use crate::traits::{Entity, EntityMetamodel, TableRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub table: TableRef,
    pub kind: JoinKind,
    pub on: Vec<Criterion>,
}

/// Shape of one SELECT: tables, predicates, ordering, paging and locking.
///
/// Every method consumes the context and returns the changed copy, so a
/// context handed to a sub-query or a concurrent build never changes under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectContext {
    pub(crate) from: TableRef,
    pub(crate) joins: Vec<Join>,
    pub(crate) projection: Vec<ColumnExpr>,
    pub(crate) where_: Vec<Criterion>,
    pub(crate) order_by: Vec<SortItem>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) for_update: bool,
    pub(crate) distinct: bool,
}

impl SelectContext {
    /// A context selecting every column of the entity's table.
    pub fn of(meta: &EntityMetamodel) -> Self {
        Self {
            from: Arc::clone(meta.table()),
            joins: Vec::new(),
            projection: meta.columns().iter().cloned().map(ColumnExpr::Column).collect(),
            where_: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            for_update: false,
            distinct: false,
        }
    }

    pub fn from_entity<E: Entity>() -> Self {
        Self::of(&E::metamodel())
    }

    /// Adds a joined table; its columns are appended to the projection.
    pub fn join(mut self, meta: &EntityMetamodel, kind: JoinKind, on: Criterion) -> Self {
        self.joins.push(Join {
            table: Arc::clone(meta.table()),
            kind,
            on: vec![on],
        });
        self.projection
            .extend(meta.columns().iter().cloned().map(ColumnExpr::Column));
        self
    }

    /// Adds a predicate; predicates added separately are AND-ed.
    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.where_.push(criterion);
        self
    }

    /// Replaces the projection with a single expression.
    pub fn select<T>(mut self, expr: impl Into<Expr<T>>) -> Self {
        self.projection = vec![expr.into().into_expr()];
        self
    }

    pub fn order_by(mut self, item: impl Into<SortItem>) -> Self {
        self.order_by.push(item.into());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Tables in alias allocation order: the main table, then joins as declared.
    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        std::iter::once(&self.from).chain(self.joins.iter().map(|j| &j.table))
    }
}
