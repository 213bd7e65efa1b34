use crate::clauses::Criterion;
use crate::context::{DeleteContext, InsertContext, UpdateContext, UpsertAction, UpsertContext};
use crate::dialect::{Dialect, UpsertStyle};
use crate::error::BuildError;
use crate::statement::{AliasManager, BuildResult, BuilderSupport, Statement, StatementBuffer};
use crate::traits::ColumnRef;

/// Alias of the incoming row in a `merge` statement.
const MERGE_SOURCE: &str = "t1_";

/// `insert into T (a, b) values (?, ?) [returning k]`
pub struct InsertStatementBuilder<'a> {
    dialect: &'a dyn Dialect,
    context: &'a InsertContext,
}

impl<'a> InsertStatementBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect, context: &'a InsertContext) -> Self {
        Self { dialect, context }
    }

    pub fn build(&self) -> BuildResult<Statement> {
        let aliases = AliasManager::new([]);
        let support = BuilderSupport::new(self.dialect, "", &aliases);
        let mut buf = StatementBuffer::new();
        buf.append("insert into ");
        write_insert_body(&support, self.context, &mut buf)?;
        if !self.context.returning.is_empty() {
            buf.append(" returning ");
            write_column_names(&support, &self.context.returning, &mut buf);
        }
        Ok(buf.build())
    }
}

/// `T (a, b) values (?, ?)`, or the dialect's default-values form without columns.
fn write_insert_body(
    support: &BuilderSupport<'_>,
    context: &InsertContext,
    buf: &mut StatementBuffer,
) -> BuildResult<()> {
    buf.append(&support.table_name(&context.table));
    if context.values.is_empty() {
        buf.append(support.dialect().default_values_clause());
        return Ok(());
    }
    let columns: Vec<ColumnRef> = context.values.iter().map(|(c, _)| c.clone()).collect();
    buf.append(" (");
    write_column_names(support, &columns, buf);
    buf.append(") values (");
    write_values(support, context, buf)?;
    buf.append(")");
    Ok(())
}

fn write_values(support: &BuilderSupport<'_>, context: &InsertContext, buf: &mut StatementBuffer) -> BuildResult<()> {
    for (_, value) in &context.values {
        support.visit_operand(buf, value)?;
        buf.append(", ");
    }
    if !context.values.is_empty() {
        buf.cut_back(2);
    }
    Ok(())
}

fn write_column_names(support: &BuilderSupport<'_>, columns: &[ColumnRef], buf: &mut StatementBuffer) {
    for column in columns {
        buf.append(&support.column_name(column)).append(", ");
    }
    if !columns.is_empty() {
        buf.cut_back(2);
    }
}

/// `update T t0_ set a = ? where ...`
pub struct UpdateStatementBuilder<'a> {
    dialect: &'a dyn Dialect,
    escape_sequence: &'a str,
    context: &'a UpdateContext,
}

impl<'a> UpdateStatementBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect, escape_sequence: &'a str, context: &'a UpdateContext) -> Self {
        Self {
            dialect,
            escape_sequence,
            context,
        }
    }

    pub fn build(&self) -> BuildResult<Statement> {
        let context = self.context;
        check_where(context.table.table_name(), &context.where_, context.allow_empty_where)?;
        let aliases = AliasManager::new([&context.table]);
        let support = BuilderSupport::new(self.dialect, self.escape_sequence, &aliases);
        let mut buf = StatementBuffer::new();
        buf.append("update ");
        support.visit_table(&mut buf, &context.table)?;
        buf.append(" set ");
        for (column, value) in &context.set {
            buf.append(&support.column_name(column)).append(" = ");
            support.visit_operand(&mut buf, value)?;
            buf.append(", ");
        }
        buf.cut_back(2);
        if context.where_.iter().any(|c| !c.is_empty()) {
            buf.append(" where ");
            support.visit_criteria(&mut buf, &context.where_, " and ")?;
        }
        Ok(buf.build())
    }
}

/// `delete from T t0_ where ...`
pub struct DeleteStatementBuilder<'a> {
    dialect: &'a dyn Dialect,
    escape_sequence: &'a str,
    context: &'a DeleteContext,
}

impl<'a> DeleteStatementBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect, escape_sequence: &'a str, context: &'a DeleteContext) -> Self {
        Self {
            dialect,
            escape_sequence,
            context,
        }
    }

    pub fn build(&self) -> BuildResult<Statement> {
        let context = self.context;
        check_where(context.table.table_name(), &context.where_, context.allow_empty_where)?;
        let aliases = AliasManager::new([&context.table]);
        let support = BuilderSupport::new(self.dialect, self.escape_sequence, &aliases);
        let mut buf = StatementBuffer::new();
        buf.append("delete from ");
        support.visit_table(&mut buf, &context.table)?;
        if context.where_.iter().any(|c| !c.is_empty()) {
            buf.append(" where ");
            support.visit_criteria(&mut buf, &context.where_, " and ")?;
        }
        Ok(buf.build())
    }
}

fn check_where(table: &str, where_: &[Criterion], allow_empty: bool) -> BuildResult<()> {
    if !allow_empty && where_.iter().all(|c| c.is_empty()) {
        return Err(BuildError::EmptyWhereClause(table.to_string()));
    }
    Ok(())
}

/// Insert-or-update in the form the dialect supports.
pub struct UpsertStatementBuilder<'a> {
    dialect: &'a dyn Dialect,
    context: &'a UpsertContext,
}

impl<'a> UpsertStatementBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect, context: &'a UpsertContext) -> Self {
        Self { dialect, context }
    }

    pub fn build(&self) -> BuildResult<Statement> {
        let insert = &self.context.insert;
        let aliases = AliasManager::new([&insert.table]);
        let support = BuilderSupport::new(self.dialect, "", &aliases);
        let mut buf = StatementBuffer::new();
        let update_columns = match &self.context.action {
            UpsertAction::DoUpdate(columns) if !columns.is_empty() => Some(columns.as_slice()),
            _ => None,
        };
        match self.dialect.upsert_style() {
            UpsertStyle::OnConflict => {
                buf.append("insert into ");
                write_insert_body(&support, insert, &mut buf)?;
                buf.append(" on conflict (");
                write_column_names(&support, &self.context.keys, &mut buf);
                buf.append(")");
                match update_columns {
                    Some(columns) => {
                        buf.append(" do update set ");
                        for column in columns {
                            let name = support.column_name(column);
                            buf.append(&format!("{name} = excluded.{name}, "));
                        }
                        buf.cut_back(2);
                    }
                    None => {
                        buf.append(" do nothing");
                    }
                }
            }
            UpsertStyle::OnDuplicateKey => match update_columns {
                Some(columns) => {
                    buf.append("insert into ");
                    write_insert_body(&support, insert, &mut buf)?;
                    buf.append(" on duplicate key update ");
                    for column in columns {
                        let name = support.column_name(column);
                        buf.append(&format!("{name} = values({name}), "));
                    }
                    buf.cut_back(2);
                }
                None => {
                    buf.append("insert ignore into ");
                    write_insert_body(&support, insert, &mut buf)?;
                }
            },
            UpsertStyle::Merge => self.write_merge(&support, update_columns, &mut buf)?,
        }
        Ok(buf.build())
    }

    fn write_merge(
        &self,
        support: &BuilderSupport<'_>,
        update_columns: Option<&[ColumnRef]>,
        buf: &mut StatementBuffer,
    ) -> BuildResult<()> {
        let insert = &self.context.insert;
        let columns: Vec<ColumnRef> = insert.values.iter().map(|(c, _)| c.clone()).collect();
        buf.append("merge into ");
        support.visit_table(buf, &insert.table)?;
        buf.append(" using (values (");
        write_values(support, insert, buf)?;
        buf.append(&format!(")) as {MERGE_SOURCE} ("));
        write_column_names(support, &columns, buf);
        buf.append(") on (");
        for key in &self.context.keys {
            support.visit_column(buf, key)?;
            let name = support.column_name(key);
            buf.append(&format!(" = {MERGE_SOURCE}.{name} and "));
        }
        buf.cut_back(5).append(")");
        if let Some(update_columns) = update_columns {
            buf.append(" when matched then update set ");
            for column in update_columns {
                let name = support.column_name(column);
                buf.append(&format!("{name} = {MERGE_SOURCE}.{name}, "));
            }
            buf.cut_back(2);
        }
        buf.append(" when not matched then insert (");
        write_column_names(support, &columns, buf);
        buf.append(") values (");
        for column in &columns {
            let name = support.column_name(column);
            buf.append(&format!("{MERGE_SOURCE}.{name}, "));
        }
        buf.cut_back(2).append(")");
        Ok(())
    }
}
