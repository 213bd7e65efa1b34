use std::sync::Arc;

/// Describes a database table.
/// Instances are typically produced by entity declarations and shared by reference.
///
/// Two descriptors are the same table for aliasing purposes when name, schema
/// and instance number agree; a second instance of a table is how self joins
/// get their own alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableDescriptor {
    name: String,
    schema: Option<String>,
    always_quote: bool,
    instance: u32,
}

/// Shared handle to a table descriptor.
pub type TableRef = Arc<TableDescriptor>;

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            always_quote: false,
            instance: 0,
        }
    }

    /// Sets the schema name.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Always quote the table name, e.g. for reserved words such as `ORDER`.
    pub fn always_quote(mut self) -> Self {
        self.always_quote = true;
        self
    }

    /// Returns a distinct instance of the same table.
    pub fn instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    pub fn into_ref(self) -> TableRef {
        Arc::new(self)
    }

    /// Returns the table name as it appears in the database.
    pub fn table_name(&self) -> &str {
        &self.name
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn instance_number(&self) -> u32 {
        self.instance
    }

    /// Returns the fully qualified table name (schema.table or just table),
    /// quoting each part when the table asks for it.
    pub fn qualified_name(&self, quote: impl Fn(&str) -> String) -> String {
        let part = |s: &str| if self.always_quote { quote(s) } else { s.to_string() };
        match &self.schema {
            Some(schema) => format!("{}.{}", part(schema), part(&self.name)),
            None => part(&self.name),
        }
    }
}
