use std::sync::Arc;

use crate::clauses::{ArithmeticOp, ColumnExpr, Criterion, Operand};
use crate::client::Database;
use crate::context::InsertContext;
use crate::error::{BuildError, RelqError, Result};
use crate::id::IdGenerator;
use crate::traits::{ColumnRef, EntityMetamodel};
use crate::types::{BindValue, Row, SqlValue};

/// Version and lock-error handling shared by entity updates and deletes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteOptions {
    pub ignore_version: bool,
    pub suppress_optimistic_lock_error: bool,
}

pub(crate) fn bind(row: &Row, column: &ColumnRef) -> Result<BindValue> {
    let value = row.get_by_name(&column.name)?.clone();
    Ok(BindValue::new(coerce(value, column)?, column.sql_type))
}

pub(crate) fn parameter(row: &Row, column: &ColumnRef) -> Result<Operand> {
    Ok(Operand::Parameter(bind(row, column)?))
}

pub(crate) fn coerce(value: SqlValue, column: &ColumnRef) -> Result<SqlValue> {
    value
        .coerce(column.sql_type)
        .map_err(|e| RelqError::Mapping(format!("{}: {e}", column.qualified_name())))
}

fn column(column: &ColumnRef) -> Operand {
    Operand::Column(ColumnExpr::Column(Arc::clone(column)))
}

/// `COLUMN = ?` for the row's current value.
pub(crate) fn eq_current(row: &Row, target: &ColumnRef) -> Result<Criterion> {
    Ok(Criterion::Eq(column(target), parameter(row, target)?))
}

/// `(COLUMN + 1)`
pub(crate) fn increment(target: &ColumnRef) -> Operand {
    let one = BindValue::new(SqlValue::Int64(1).coerce(target.sql_type).unwrap_or(SqlValue::Int64(1)), target.sql_type);
    Operand::Column(ColumnExpr::Arithmetic {
        op: ArithmeticOp::Add,
        left: Box::new(column(target)),
        right: Box::new(Operand::Parameter(one)),
    })
}

/// Every id column must carry a value.
pub(crate) fn require_ids(meta: &EntityMetamodel, row: &Row) -> Result<()> {
    for id in meta.id_columns() {
        if row.get_by_name(&id.name)?.is_null() {
            return Err(BuildError::MissingId(meta.table().table_name().to_string()).into());
        }
    }
    Ok(())
}

/// Fills generated ids, the initial version and the audit timestamps.
pub(crate) async fn prepare_insert(db: &Database, meta: &EntityMetamodel, mut row: Row) -> Result<Row> {
    match meta.generator() {
        IdGenerator::Assigned => require_ids(meta, &row)?,
        IdGenerator::Identity => {}
        generator => {
            let id = db.next_id(generator).await?.ok_or_else(|| {
                RelqError::IdentifierGeneration(format!(
                    "no value generated for {}",
                    meta.table().table_name()
                ))
            })?;
            if let Some(column) = meta.id_columns().first() {
                row.set_value(column.name.clone(), coerce(SqlValue::Int64(id), column)?);
            }
        }
    }
    if let Some(version) = meta.version_column() {
        if row.get_by_name(&version.name)?.is_null() {
            row.set_value(version.name.clone(), coerce(SqlValue::Int64(0), version)?);
        }
    }
    let now = SqlValue::Timestamp(db.now());
    for column in [meta.created_at_column(), meta.updated_at_column()].into_iter().flatten() {
        row.set_value(column.name.clone(), now.clone());
    }
    Ok(row)
}

/// Identity columns are left to the database.
pub(crate) fn insert_context(meta: &EntityMetamodel, row: &Row) -> Result<InsertContext> {
    let identity = matches!(meta.generator(), IdGenerator::Identity);
    let mut context = InsertContext::new(meta.table());
    for column in meta.columns() {
        if identity && meta.is_id(column) {
            continue;
        }
        context = context.assign(Arc::clone(column), parameter(row, column)?);
    }
    Ok(context)
}

/// Stores the first value of a generated-key result in the first id column.
pub(crate) fn apply_generated_key(
    db: &Database,
    meta: &EntityMetamodel,
    row: &mut Row,
    keys: &[Vec<SqlValue>],
) -> Result<()> {
    let Some(column) = meta.id_columns().first() else {
        return Ok(());
    };
    let Some(first) = keys.first() else {
        return Err(RelqError::IdentifierGeneration(format!(
            "no generated key returned for {}",
            meta.table().table_name()
        )));
    };
    let value = db.dialect().value_of(first, 0, column.sql_type)?;
    row.set_value(column.name.clone(), value);
    Ok(())
}

/// The version after a successful update, or unchanged when it was NULL.
pub(crate) fn bumped(row: &Row, version: &ColumnRef) -> Result<SqlValue> {
    let current = row.get_by_name(&version.name)?;
    match current.as_i64() {
        Some(v) => coerce(SqlValue::Int64(v + 1), version),
        None => Ok(current.clone()),
    }
}
