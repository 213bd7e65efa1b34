use crate::clauses::{Aggregate, ColumnExpr, Criterion, LikeOption, Operand};
use crate::context::SelectContext;
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::statement::{select::write_select, AliasManager, BuildResult, StatementBuffer};
use crate::traits::{ColumnDescriptor, TableDescriptor};
use crate::types::{BindValue, SqlType, SqlValue};

/// Renders tables, columns, expressions and predicates into a buffer.
/// Shared by every statement builder; knows nothing about statement kinds.
pub(crate) struct BuilderSupport<'a> {
    dialect: &'a dyn Dialect,
    escape_sequence: &'a str,
    aliases: &'a AliasManager<'a>,
}

impl<'a> BuilderSupport<'a> {
    pub fn new(dialect: &'a dyn Dialect, escape_sequence: &'a str, aliases: &'a AliasManager<'a>) -> Self {
        Self {
            dialect,
            escape_sequence,
            aliases,
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect
    }

    pub fn table_name(&self, table: &TableDescriptor) -> String {
        table.qualified_name(|s| self.dialect.quote(s))
    }

    pub fn column_name(&self, column: &ColumnDescriptor) -> String {
        column.canonical_name(|s| self.dialect.quote(s))
    }

    /// `NAME t0_`
    pub fn visit_table(&self, buf: &mut StatementBuffer, table: &TableDescriptor) -> BuildResult<()> {
        let alias = self.aliases.alias(table)?;
        buf.append(&self.table_name(table)).append(" ").append(alias);
        Ok(())
    }

    /// `t0_.NAME`
    pub fn visit_column(&self, buf: &mut StatementBuffer, column: &ColumnDescriptor) -> BuildResult<()> {
        let alias = self.aliases.alias(&column.table)?;
        buf.append(alias).append(".").append(&self.column_name(column));
        Ok(())
    }

    pub fn visit_column_expr(&self, buf: &mut StatementBuffer, expr: &ColumnExpr) -> BuildResult<()> {
        match expr {
            ColumnExpr::Column(column) => self.visit_column(buf, column)?,
            ColumnExpr::Aggregate(aggregate) => {
                let (name, inner) = match aggregate {
                    Aggregate::CountAll => {
                        buf.append("count(*)");
                        return Ok(());
                    }
                    Aggregate::Avg(inner) => ("avg(", inner),
                    Aggregate::Count(inner) => ("count(", inner),
                    Aggregate::Max(inner) => ("max(", inner),
                    Aggregate::Min(inner) => ("min(", inner),
                    Aggregate::Sum(inner) => ("sum(", inner),
                };
                buf.append(name);
                self.visit_column_expr(buf, inner)?;
                buf.append(")");
            }
            ColumnExpr::Arithmetic { op, left, right } => {
                buf.append("(");
                self.visit_operand(buf, left)?;
                buf.append(" ").append(op.symbol()).append(" ");
                self.visit_operand(buf, right)?;
                buf.append(")");
            }
            ColumnExpr::Concat(left, right) => {
                buf.append("(concat(");
                self.visit_operand(buf, left)?;
                buf.append(", ");
                self.visit_operand(buf, right)?;
                buf.append("))");
            }
        }
        Ok(())
    }

    /// A parameter always becomes a bind slot, never inline text.
    pub fn visit_operand(&self, buf: &mut StatementBuffer, operand: &Operand) -> BuildResult<()> {
        match operand {
            Operand::Column(expr) => self.visit_column_expr(buf, expr)?,
            Operand::Parameter(value) => {
                buf.bind(value.clone());
            }
        }
        Ok(())
    }

    /// Renders a predicate list joined by `separator`, skipping empty groups.
    /// Every sibling is connected by the list's separator, whatever its own kind.
    pub fn visit_criteria(
        &self,
        buf: &mut StatementBuffer,
        criteria: &[Criterion],
        separator: &str,
    ) -> BuildResult<()> {
        for (index, criterion) in criteria.iter().filter(|c| !c.is_empty()).enumerate() {
            if index > 0 {
                buf.append(separator);
            }
            self.visit_criterion(buf, criterion)?;
        }
        Ok(())
    }

    pub fn visit_criterion(&self, buf: &mut StatementBuffer, criterion: &Criterion) -> BuildResult<()> {
        match criterion {
            Criterion::Eq(l, r) => self.binary(buf, l, r, "="),
            Criterion::NotEq(l, r) => self.binary(buf, l, r, "<>"),
            Criterion::Less(l, r) => self.binary(buf, l, r, "<"),
            Criterion::LessEq(l, r) => self.binary(buf, l, r, "<="),
            Criterion::Greater(l, r) => self.binary(buf, l, r, ">"),
            Criterion::GreaterEq(l, r) => self.binary(buf, l, r, ">="),
            Criterion::IsNull(l) => self.is_null(buf, l, false),
            Criterion::IsNotNull(l) => self.is_null(buf, l, true),
            Criterion::Like(l, r, option) => self.like(buf, l, r, *option, false),
            Criterion::NotLike(l, r, option) => self.like(buf, l, r, *option, true),
            Criterion::Between(l, start, end) => self.between(buf, l, start, end, false),
            Criterion::NotBetween(l, start, end) => self.between(buf, l, start, end, true),
            Criterion::InList(l, values) => self.in_list(buf, l, values, false),
            Criterion::NotInList(l, values) => self.in_list(buf, l, values, true),
            Criterion::InSubQuery(l, sub) => self.in_sub_query(buf, l, sub, false),
            Criterion::NotInSubQuery(l, sub) => self.in_sub_query(buf, l, sub, true),
            Criterion::Exists(sub) => self.exists(buf, sub, false),
            Criterion::NotExists(sub) => self.exists(buf, sub, true),
            Criterion::And(list) => self.group(buf, list, " and ", ""),
            Criterion::Or(list) => self.group(buf, list, " or ", ""),
            Criterion::Not(list) => self.group(buf, list, " and ", "not "),
        }
    }

    fn group(&self, buf: &mut StatementBuffer, list: &[Criterion], separator: &str, prefix: &str) -> BuildResult<()> {
        if list.iter().all(Criterion::is_empty) {
            return Ok(());
        }
        buf.append(prefix).append("(");
        self.visit_criteria(buf, list, separator)?;
        buf.append(")");
        Ok(())
    }

    fn binary(&self, buf: &mut StatementBuffer, left: &Operand, right: &Operand, operator: &str) -> BuildResult<()> {
        check_types(left, right)?;
        self.visit_operand(buf, left)?;
        buf.append(" ").append(operator).append(" ");
        self.visit_operand(buf, right)
    }

    fn is_null(&self, buf: &mut StatementBuffer, left: &Operand, not: bool) -> BuildResult<()> {
        self.visit_operand(buf, left)?;
        buf.append(if not { " is not null" } else { " is null" });
        Ok(())
    }

    fn like(
        &self,
        buf: &mut StatementBuffer,
        left: &Operand,
        right: &Operand,
        option: LikeOption,
        not: bool,
    ) -> BuildResult<()> {
        check_types(left, right)?;
        self.visit_operand(buf, left)?;
        buf.append(if not { " not like " } else { " like " });
        match right {
            Operand::Parameter(BindValue {
                value: SqlValue::Text(text),
                ..
            }) => {
                buf.bind(BindValue::new(SqlValue::Text(self.like_pattern(text, option)), SqlType::Text));
                Ok(())
            }
            other => self.visit_operand(buf, other),
        }
    }

    fn like_pattern(&self, text: &str, option: LikeOption) -> String {
        let escape = |s: &str| self.dialect.escape(s, self.escape_sequence);
        match option {
            LikeOption::None => text.to_string(),
            LikeOption::Escape => escape(text),
            LikeOption::Prefix => format!("{}%", escape(text)),
            LikeOption::Infix => format!("%{}%", escape(text)),
            LikeOption::Suffix => format!("%{}", escape(text)),
        }
    }

    fn between(
        &self,
        buf: &mut StatementBuffer,
        left: &Operand,
        start: &Operand,
        end: &Operand,
        not: bool,
    ) -> BuildResult<()> {
        check_types(left, start)?;
        check_types(left, end)?;
        self.visit_operand(buf, left)?;
        buf.append(if not { " not between " } else { " between " });
        self.visit_operand(buf, start)?;
        buf.append(" and ");
        self.visit_operand(buf, end)
    }

    fn in_list(&self, buf: &mut StatementBuffer, left: &Operand, values: &[Operand], not: bool) -> BuildResult<()> {
        if values.is_empty() {
            // in () is always false, not in () always true
            if not {
                buf.append("1 = 1");
                return Ok(());
            }
            self.visit_operand(buf, left)?;
            buf.append(" in (null)");
            return Ok(());
        }
        self.visit_operand(buf, left)?;
        buf.append(if not { " not in (" } else { " in (" });
        for value in values {
            check_types(left, value)?;
            self.visit_operand(buf, value)?;
            buf.append(", ");
        }
        buf.cut_back(2).append(")");
        Ok(())
    }

    fn in_sub_query(
        &self,
        buf: &mut StatementBuffer,
        left: &Operand,
        sub_query: &SelectContext,
        not: bool,
    ) -> BuildResult<()> {
        self.visit_operand(buf, left)?;
        buf.append(if not { " not in (" } else { " in (" });
        self.visit_sub_query(buf, sub_query)?;
        buf.append(")");
        Ok(())
    }

    fn exists(&self, buf: &mut StatementBuffer, sub_query: &SelectContext, not: bool) -> BuildResult<()> {
        buf.append(if not { "not exists (" } else { "exists (" });
        self.visit_sub_query(buf, sub_query)?;
        buf.append(")");
        Ok(())
    }

    fn visit_sub_query(&self, buf: &mut StatementBuffer, sub_query: &SelectContext) -> BuildResult<()> {
        let aliases = self.aliases.child(sub_query.tables());
        let support = BuilderSupport::new(self.dialect, self.escape_sequence, &aliases);
        write_select(&support, sub_query, buf)
    }
}

/// Both sides of a predicate must have the same declared type; NULL matches anything.
fn check_types(left: &Operand, right: &Operand) -> BuildResult<()> {
    match (left, left.sql_type(), right.sql_type()) {
        (Operand::Column(expr), Some(expected), Some(actual)) if expected != actual => {
            Err(BuildError::TypeMismatch {
                column: expr.describe(),
                expected,
                actual,
            })
        }
        _ => Ok(()),
    }
}
