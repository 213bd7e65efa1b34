use std::collections::HashMap;

use crate::error::BuildError;
use crate::traits::{TableDescriptor, TableRef};

/// Assigns `t0_`, `t1_`, ... to the tables of one context.
///
/// A child manager (for an IN or EXISTS sub-query) continues numbering where
/// its parent stopped and falls back to the parent on lookup, so a correlated
/// sub-query can reference outer tables without clashing with them.
#[derive(Debug)]
pub struct AliasManager<'p> {
    parent: Option<&'p AliasManager<'p>>,
    aliases: HashMap<TableDescriptor, String>,
    next_index: usize,
}

impl<'p> AliasManager<'p> {
    pub fn new<'t>(tables: impl IntoIterator<Item = &'t TableRef>) -> Self {
        Self::allocate(None, 0, tables)
    }

    /// A manager for a nested context.
    pub fn child<'t>(&'p self, tables: impl IntoIterator<Item = &'t TableRef>) -> AliasManager<'p> {
        Self::allocate(Some(self), self.next_index, tables)
    }

    fn allocate<'t>(
        parent: Option<&'p AliasManager<'p>>,
        start: usize,
        tables: impl IntoIterator<Item = &'t TableRef>,
    ) -> Self {
        let mut manager = Self {
            parent,
            aliases: HashMap::new(),
            next_index: start,
        };
        for table in tables {
            if !manager.aliases.contains_key(table.as_ref()) {
                let alias = format!("t{}_", manager.next_index);
                manager.aliases.insert((**table).clone(), alias);
                manager.next_index += 1;
            }
        }
        manager
    }

    /// Looks up the alias of a table here, then in the enclosing contexts.
    pub fn alias(&self, table: &TableDescriptor) -> Result<&str, BuildError> {
        match self.aliases.get(table) {
            Some(alias) => Ok(alias),
            None => match self.parent {
                Some(parent) => parent.alias(table),
                None => Err(BuildError::NoAlias(table.table_name().to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_follow_table_order() {
        let address = TableDescriptor::new("ADDRESS").into_ref();
        let employee = TableDescriptor::new("EMPLOYEE").into_ref();
        let aliases = AliasManager::new([&address, &employee, &address]);

        assert_eq!(aliases.alias(&address).unwrap(), "t0_");
        assert_eq!(aliases.alias(&employee).unwrap(), "t1_");
        assert_eq!(aliases.alias(&address).unwrap(), "t0_");
    }

    #[test]
    fn test_child_extends_parent() {
        let address = TableDescriptor::new("ADDRESS").into_ref();
        let employee = TableDescriptor::new("EMPLOYEE").into_ref();
        let department = TableDescriptor::new("DEPARTMENT").into_ref();
        let parent = AliasManager::new([&address, &employee]);
        let child = parent.child([&department]);
        let grandchild = child.child([&address.as_ref().clone().instance(1).into_ref()]);

        assert_eq!(child.alias(&department).unwrap(), "t2_");
        assert_eq!(child.alias(&address).unwrap(), "t0_");
        assert_eq!(
            grandchild
                .alias(&TableDescriptor::new("ADDRESS").instance(1))
                .unwrap(),
            "t3_"
        );
        assert_eq!(grandchild.alias(&department).unwrap(), "t2_");
    }

    #[test]
    fn test_unknown_table_has_no_alias() {
        let address = TableDescriptor::new("ADDRESS").into_ref();
        let aliases = AliasManager::new([&address]);
        assert_eq!(
            aliases.alias(&TableDescriptor::new("EMPLOYEE")),
            Err(BuildError::NoAlias("EMPLOYEE".to_string()))
        );
    }
}
