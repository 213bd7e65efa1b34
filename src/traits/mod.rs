mod column;
mod driver;
mod entity;
mod table;

pub use column::{Column, ColumnDescriptor, ColumnRef, ColumnValue};
pub use driver::{DatabaseDriver, RowStream};
pub use entity::{Entity, EntityMetamodel};
pub use table::{TableDescriptor, TableRef};
