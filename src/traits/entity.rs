use std::sync::Arc;

use crate::error::Result;
use crate::id::IdGenerator;
use crate::traits::{Column, ColumnDescriptor, ColumnRef, ColumnValue, TableRef};
use crate::types::Row;

/// Trait for a typed record mapped to one table.
/// Implementations are typically generated from entity declarations.
///
/// # Example
/// ```ignore
/// impl Entity for Address {
///     type Meta = AddressMeta;
///     fn meta() -> AddressMeta { AddressMeta::new() }
///     fn metamodel() -> EntityMetamodel {
///         let m = Self::meta();
///         EntityMetamodel::new(&m.table).id(&m.id).column(&m.street).version(&m.version)
///     }
///     fn from_row(row: &Row) -> Result<Self> { ... }
///     fn to_row(&self) -> Row { ... }
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// The typed column handles of this entity.
    type Meta;

    fn meta() -> Self::Meta;

    /// Read-only description of the table, columns and id strategy.
    fn metamodel() -> EntityMetamodel;

    /// Rebuilds a record from a column name to value mapping.
    fn from_row(row: &Row) -> Result<Self>;

    /// Flattens a record into a column name to value mapping.
    fn to_row(&self) -> Row;
}

/// Ordered columns of an entity plus the columns with a special role.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetamodel {
    table: TableRef,
    columns: Vec<ColumnRef>,
    id: Vec<ColumnRef>,
    version: Option<ColumnRef>,
    created_at: Option<ColumnRef>,
    updated_at: Option<ColumnRef>,
    id_generator: IdGenerator,
}

impl EntityMetamodel {
    pub fn new(table: &TableRef) -> Self {
        Self {
            table: Arc::clone(table),
            columns: Vec::new(),
            id: Vec::new(),
            version: None,
            created_at: None,
            updated_at: None,
            id_generator: IdGenerator::Assigned,
        }
    }

    /// Adds an identifier column.
    pub fn id<T: ColumnValue>(mut self, column: &Column<T>) -> Self {
        let column = self.push(column);
        self.id.push(column);
        self
    }

    pub fn column<T: ColumnValue>(mut self, column: &Column<T>) -> Self {
        self.push(column);
        self
    }

    /// Adds the optimistic lock version column.
    pub fn version<T: ColumnValue>(mut self, column: &Column<T>) -> Self {
        self.version = Some(self.push(column));
        self
    }

    pub fn created_at<T: ColumnValue>(mut self, column: &Column<T>) -> Self {
        self.created_at = Some(self.push(column));
        self
    }

    pub fn updated_at<T: ColumnValue>(mut self, column: &Column<T>) -> Self {
        self.updated_at = Some(self.push(column));
        self
    }

    pub fn id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = generator;
        self
    }

    fn push<T>(&mut self, column: &Column<T>) -> ColumnRef {
        let column = Arc::clone(column.descriptor());
        self.columns.push(Arc::clone(&column));
        column
    }

    /// The same entity on another instance of its table, for self joins.
    pub fn aliased(&self, instance: u32) -> Self {
        let table = (*self.table).clone().instance(instance).into_ref();
        let rebind = |c: &ColumnRef| {
            Arc::new(ColumnDescriptor {
                table: Arc::clone(&table),
                ..(**c).clone()
            })
        };
        Self {
            columns: self.columns.iter().map(rebind).collect(),
            id: self.id.iter().map(rebind).collect(),
            version: self.version.as_ref().map(rebind),
            created_at: self.created_at.as_ref().map(rebind),
            updated_at: self.updated_at.as_ref().map(rebind),
            id_generator: self.id_generator.clone(),
            table,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn id_columns(&self) -> &[ColumnRef] {
        &self.id
    }

    pub fn version_column(&self) -> Option<&ColumnRef> {
        self.version.as_ref()
    }

    pub fn created_at_column(&self) -> Option<&ColumnRef> {
        self.created_at.as_ref()
    }

    pub fn updated_at_column(&self) -> Option<&ColumnRef> {
        self.updated_at.as_ref()
    }

    pub fn generator(&self) -> &IdGenerator {
        &self.id_generator
    }

    pub(crate) fn is_id(&self, column: &ColumnRef) -> bool {
        self.id.contains(column)
    }

    pub(crate) fn is_version(&self, column: &ColumnRef) -> bool {
        self.version.as_ref() == Some(column)
    }

    pub(crate) fn is_created_at(&self, column: &ColumnRef) -> bool {
        self.created_at.as_ref() == Some(column)
    }
}
