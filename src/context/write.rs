use std::sync::Arc;

use crate::clauses::{Criterion, IntoOperand, Operand};
use crate::traits::{Column, ColumnRef, TableRef};

/// `insert into <table> (<columns>) values (<values>)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertContext {
    pub(crate) table: TableRef,
    pub(crate) values: Vec<(ColumnRef, Operand)>,
    pub(crate) returning: Vec<ColumnRef>,
}

impl InsertContext {
    pub fn new(table: &TableRef) -> Self {
        Self {
            table: Arc::clone(table),
            values: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn value<T>(self, column: &Column<T>, value: impl IntoOperand<T>) -> Self {
        self.assign(Arc::clone(column.descriptor()), value.into_operand())
    }

    pub(crate) fn assign(mut self, column: ColumnRef, value: Operand) -> Self {
        self.values.push((column, value));
        self
    }

    pub(crate) fn returning(mut self, columns: Vec<ColumnRef>) -> Self {
        self.returning = columns;
        self
    }
}

/// `update <table> set <assignments> where <criteria>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateContext {
    pub(crate) table: TableRef,
    pub(crate) set: Vec<(ColumnRef, Operand)>,
    pub(crate) where_: Vec<Criterion>,
    pub(crate) allow_empty_where: bool,
}

impl UpdateContext {
    pub fn new(table: &TableRef) -> Self {
        Self {
            table: Arc::clone(table),
            set: Vec::new(),
            where_: Vec::new(),
            allow_empty_where: false,
        }
    }

    pub fn set<T>(self, column: &Column<T>, value: impl IntoOperand<T>) -> Self {
        self.assign(Arc::clone(column.descriptor()), value.into_operand())
    }

    pub(crate) fn assign(mut self, column: ColumnRef, value: Operand) -> Self {
        self.set.push((column, value));
        self
    }

    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.where_.push(criterion);
        self
    }

    /// Permits an update of every row.
    pub fn allow_empty_where(mut self) -> Self {
        self.allow_empty_where = true;
        self
    }
}

/// `delete from <table> where <criteria>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteContext {
    pub(crate) table: TableRef,
    pub(crate) where_: Vec<Criterion>,
    pub(crate) allow_empty_where: bool,
}

impl DeleteContext {
    pub fn new(table: &TableRef) -> Self {
        Self {
            table: Arc::clone(table),
            where_: Vec::new(),
            allow_empty_where: false,
        }
    }

    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.where_.push(criterion);
        self
    }

    /// Permits a delete of every row.
    pub fn allow_empty_where(mut self) -> Self {
        self.allow_empty_where = true;
        self
    }
}

/// What an upsert does when a row with the same keys already exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpsertAction {
    /// Overwrite the listed columns with the incoming values
    DoUpdate(Vec<ColumnRef>),
    DoNothing,
}

/// An insert that resolves key conflicts instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpsertContext {
    pub(crate) insert: InsertContext,
    pub(crate) keys: Vec<ColumnRef>,
    pub(crate) action: UpsertAction,
}

impl UpsertContext {
    pub fn new(insert: InsertContext, keys: Vec<ColumnRef>, action: UpsertAction) -> Self {
        Self {
            insert,
            keys,
            action,
        }
    }
}
