use crate::builders::{
    EntityDelete, EntityInsert, EntitySelect, EntityUpdate, EntityUpsert, SqlDelete, SqlInsert,
    SqlUpdate, TemplateQuery,
};
use crate::client::Database;
use crate::traits::{Entity, TableRef};

/// Query builder factory.
/// Created from a Database and used to build and execute queries.
pub struct Querier {
    db: Database,
}

impl Querier {
    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }

    /// Start building a SELECT query for an entity.
    pub fn select<E: Entity>(&self) -> EntitySelect<E> {
        EntitySelect::new(self.db.clone())
    }

    pub fn insert<E: Entity>(&self) -> EntityInsert<E> {
        EntityInsert::new(self.db.clone())
    }

    pub fn update<E: Entity>(&self) -> EntityUpdate<E> {
        EntityUpdate::new(self.db.clone())
    }

    pub fn delete<E: Entity>(&self) -> EntityDelete<E> {
        EntityDelete::new(self.db.clone())
    }

    pub fn upsert<E: Entity>(&self) -> EntityUpsert<E> {
        EntityUpsert::new(self.db.clone())
    }

    /// Start building an INSERT with explicit column values.
    pub fn insert_into(&self, table: &TableRef) -> SqlInsert {
        SqlInsert::new(self.db.clone(), table)
    }

    pub fn update_table(&self, table: &TableRef) -> SqlUpdate {
        SqlUpdate::new(self.db.clone(), table)
    }

    pub fn delete_from(&self, table: &TableRef) -> SqlDelete {
        SqlDelete::new(self.db.clone(), table)
    }

    /// Start a query from SQL text with `:name` parameters.
    pub fn template(&self, sql: impl Into<String>) -> TemplateQuery {
        TemplateQuery::new(self.db.clone(), sql)
    }
}
