use crate::clauses::SortOrder;
use crate::context::{JoinKind, SelectContext};
use crate::dialect::Dialect;
use crate::statement::{AliasManager, BuildResult, BuilderSupport, Statement, StatementBuffer};

/// Builds `select ... from ... [join ...] [where ...] [order by ...]` plus paging and locking.
pub struct SelectStatementBuilder<'a> {
    dialect: &'a dyn Dialect,
    escape_sequence: &'a str,
    context: &'a SelectContext,
}

impl<'a> SelectStatementBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect, escape_sequence: &'a str, context: &'a SelectContext) -> Self {
        Self {
            dialect,
            escape_sequence,
            context,
        }
    }

    pub fn build(&self) -> BuildResult<Statement> {
        let aliases = AliasManager::new(self.context.tables());
        let support = BuilderSupport::new(self.dialect, self.escape_sequence, &aliases);
        let mut buf = StatementBuffer::new();
        write_select(&support, self.context, &mut buf)?;
        Ok(buf.build())
    }
}

pub(crate) fn write_select(
    support: &BuilderSupport<'_>,
    context: &SelectContext,
    buf: &mut StatementBuffer,
) -> BuildResult<()> {
    buf.append("select ");
    if context.distinct {
        buf.append("distinct ");
    }
    if context.projection.is_empty() {
        buf.append("*");
    } else {
        for expr in &context.projection {
            support.visit_column_expr(buf, expr)?;
            buf.append(", ");
        }
        buf.cut_back(2);
    }

    buf.append(" from ");
    support.visit_table(buf, &context.from)?;
    for join in &context.joins {
        buf.append(match join.kind {
            JoinKind::Inner => " inner join ",
            JoinKind::Left => " left outer join ",
        });
        support.visit_table(buf, &join.table)?;
        if join.on.iter().any(|c| !c.is_empty()) {
            buf.append(" on (");
            support.visit_criteria(buf, &join.on, " and ")?;
            buf.append(")");
        }
    }

    if context.where_.iter().any(|c| !c.is_empty()) {
        buf.append(" where ");
        support.visit_criteria(buf, &context.where_, " and ")?;
    }

    if !context.order_by.is_empty() {
        buf.append(" order by ");
        for item in &context.order_by {
            support.visit_column_expr(buf, &item.expr)?;
            buf.append(match item.order {
                SortOrder::Asc => " asc, ",
                SortOrder::Desc => " desc, ",
            });
        }
        buf.cut_back(2);
    }

    support
        .dialect()
        .offset_limit(buf, context.offset, context.limit);
    if context.for_update {
        buf.append(support.dialect().for_update_clause());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::{and, avg, concat, count_all, exists, not, or, plus, ExpressionOps, LikeOption};
    use crate::dialect::{H2Dialect, MySqlDialect, PostgreSqlDialect};
    use crate::error::BuildError;
    use crate::traits::{Column, EntityMetamodel, TableDescriptor};
    use crate::types::{SqlType, SqlValue};

    struct Address {
        meta: EntityMetamodel,
        id: Column<i32>,
        street: Column<String>,
        version: Column<i32>,
    }

    fn address() -> Address {
        let table = TableDescriptor::new("ADDRESS").into_ref();
        let id = Column::new(&table, "ADDRESS_ID");
        let street = Column::new(&table, "STREET");
        let version = Column::new(&table, "VERSION");
        let meta = EntityMetamodel::new(&table)
            .id(&id)
            .column(&street)
            .version(&version);
        Address {
            meta,
            id,
            street,
            version,
        }
    }

    struct Employee {
        meta: EntityMetamodel,
        id: Column<i32>,
        address_id: Column<i32>,
        manager_id: Column<Option<i32>>,
    }

    fn employee() -> Employee {
        let table = TableDescriptor::new("EMPLOYEE").into_ref();
        let id = Column::new(&table, "EMPLOYEE_ID");
        let address_id = Column::new(&table, "ADDRESS_ID");
        let manager_id = Column::new(&table, "MANAGER_ID");
        let meta = EntityMetamodel::new(&table)
            .id(&id)
            .column(&address_id)
            .column(&manager_id);
        Employee {
            meta,
            id,
            address_id,
            manager_id,
        }
    }

    fn build(context: &SelectContext) -> BuildResult<Statement> {
        SelectStatementBuilder::new(&PostgreSqlDialect, "\\", context).build()
    }

    #[test]
    fn test_select_by_id() {
        let a = address();
        let context = SelectContext::of(&a.meta).where_(a.id.eq(16));
        let statement = build(&context).unwrap();

        assert_eq!(
            statement.sql(),
            "select t0_.ADDRESS_ID, t0_.STREET, t0_.VERSION from ADDRESS t0_ where t0_.ADDRESS_ID = ?"
        );
        assert_eq!(statement.params(), vec![SqlValue::Int32(16)]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .where_(or([a.id.greater(1), a.street.contains("x")]))
            .order_by(a.id.desc());
        assert_eq!(build(&context).unwrap(), build(&context).unwrap());
    }

    #[test]
    fn test_logical_groups() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.eq(1))
            .where_(or([a.street.eq("A"), a.street.eq("B"), a.street.eq("C")]))
            .where_(and([]))
            .where_(not([a.version.is_null()]));

        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where t0_.ADDRESS_ID = ? \
             and (t0_.STREET = ? or t0_.STREET = ? or t0_.STREET = ?) \
             and not (t0_.VERSION is null)"
        );
    }

    #[test]
    fn test_or_keeps_its_operator_around_a_nested_and() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(or([a.id.eq(1), and([a.street.eq("A"), a.id.eq(2)])]));

        let statement = build(&context).unwrap();
        assert_eq!(
            statement.sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ \
             where (t0_.ADDRESS_ID = ? or (t0_.STREET = ? and t0_.ADDRESS_ID = ?))"
        );
        assert_eq!(statement.sql().matches(" or ").count(), 1);
    }

    #[test]
    fn test_top_level_predicates_are_and_connected() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.eq(1))
            .where_(or([a.street.eq("A"), a.street.eq("B")]));

        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ \
             where t0_.ADDRESS_ID = ? and (t0_.STREET = ? or t0_.STREET = ?)"
        );
    }

    #[test]
    fn test_single_element_group_has_no_leading_operator() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(and([a.id.eq(1)]));
        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where (t0_.ADDRESS_ID = ?)"
        );
    }

    #[test]
    fn test_empty_criteria_render_nothing() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(or([and([]), not([])]));
        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_"
        );
    }

    #[test]
    fn test_like_options_bind_patterns() {
        let a = address();
        let cases = [
            (LikeOption::None, "a%c"),
            (LikeOption::Escape, "a\\%c"),
            (LikeOption::Prefix, "a\\%c%"),
            (LikeOption::Infix, "%a\\%c%"),
            (LikeOption::Suffix, "%a\\%c"),
        ];
        for (option, expected) in cases {
            let context = SelectContext::of(&a.meta).where_(a.street.like_with("a%c", option));
            let statement = build(&context).unwrap();
            assert!(statement.sql().ends_with("where t0_.STREET like ?"));
            assert_eq!(statement.params(), vec![SqlValue::from(expected)]);
        }

        let context = SelectContext::of(&a.meta).where_(a.street.starts_with("abc"));
        assert_eq!(build(&context).unwrap().params(), vec![SqlValue::from("abc%")]);
        let context = SelectContext::of(&a.meta).where_(a.street.contains("abc"));
        assert_eq!(build(&context).unwrap().params(), vec![SqlValue::from("%abc%")]);
        let context = SelectContext::of(&a.meta).where_(a.street.ends_with("abc"));
        assert_eq!(build(&context).unwrap().params(), vec![SqlValue::from("%abc")]);
    }

    #[test]
    fn test_in_list() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.in_list([1, 2, 3]));
        let statement = build(&context).unwrap();
        assert_eq!(
            statement.sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where t0_.ADDRESS_ID in (?, ?, ?)"
        );
        assert_eq!(statement.values().len(), 3);
    }

    #[test]
    fn test_empty_in_list_collapses() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.in_list(Vec::<i32>::new()));
        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where t0_.ADDRESS_ID in (null)"
        );

        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.not_in_list(Vec::<i32>::new()));
        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where 1 = 1"
        );
    }

    #[test]
    fn test_between() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.not_between(5, 10));
        let statement = build(&context).unwrap();
        assert_eq!(
            statement.sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where t0_.ADDRESS_ID not between ? and ?"
        );
        assert_eq!(statement.params(), vec![SqlValue::Int32(5), SqlValue::Int32(10)]);
    }

    #[test]
    fn test_correlated_sub_queries_use_child_aliases() {
        let a = address();
        let e = employee();
        let employees = SelectContext::of(&e.meta)
            .select(&e.address_id)
            .where_(e.address_id.eq(&a.id));
        let context = SelectContext::of(&a.meta)
            .select(&a.id)
            .where_(a.id.in_sub_query(employees.clone()))
            .where_(exists(employees));

        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.ADDRESS_ID from ADDRESS t0_ where t0_.ADDRESS_ID in \
             (select t1_.ADDRESS_ID from EMPLOYEE t1_ where t1_.ADDRESS_ID = t0_.ADDRESS_ID) \
             and exists (select t1_.ADDRESS_ID from EMPLOYEE t1_ where t1_.ADDRESS_ID = t0_.ADDRESS_ID)"
        );
    }

    #[test]
    fn test_joins_paging_and_locking() {
        let a = address();
        let e = employee();
        let manager = e.meta.aliased(1);
        let manager_id = e.id.in_table(manager.table());
        let context = SelectContext::of(&e.meta)
            .join(&a.meta, JoinKind::Inner, e.address_id.eq(&a.id))
            .join(&manager, JoinKind::Left, manager_id.eq(plus(&e.address_id, 0)))
            .select(&e.id)
            .where_(e.manager_id.is_not_null())
            .order_by(&e.id)
            .order_by(a.street.desc())
            .offset(10)
            .limit(5)
            .for_update();

        assert_eq!(
            build(&context).unwrap().sql(),
            "select t0_.EMPLOYEE_ID from EMPLOYEE t0_ \
             inner join ADDRESS t1_ on (t0_.ADDRESS_ID = t1_.ADDRESS_ID) \
             left outer join EMPLOYEE t2_ on (t2_.EMPLOYEE_ID = (t0_.ADDRESS_ID + ?)) \
             where t0_.MANAGER_ID is not null \
             order by t0_.EMPLOYEE_ID asc, t1_.STREET desc offset 10 limit 5 for update"
        );
    }

    #[test]
    fn test_paging_is_dialect_specific() {
        let a = address();
        let context = SelectContext::of(&a.meta).select(&a.id).offset(2).limit(3);
        let h2 = SelectStatementBuilder::new(&H2Dialect, "\\", &context).build().unwrap();
        let mysql = SelectStatementBuilder::new(&MySqlDialect, "\\", &context).build().unwrap();
        assert!(h2.sql().ends_with(" offset 2 rows fetch first 3 rows only"));
        assert!(mysql.sql().ends_with(" limit 3 offset 2"));
    }

    #[test]
    fn test_functions_render_in_parentheses() {
        let a = address();
        let context = SelectContext::of(&a.meta)
            .select(avg(&a.version))
            .where_(concat(&a.street, "!").eq("A!"));
        assert_eq!(
            build(&context).unwrap().sql(),
            "select avg(t0_.VERSION) from ADDRESS t0_ where (concat(t0_.STREET, ?)) = ?"
        );

        let context = SelectContext::of(&a.meta).select(count_all()).distinct();
        assert_eq!(
            build(&context).unwrap().sql(),
            "select distinct count(*) from ADDRESS t0_"
        );
    }

    #[test]
    fn test_quoted_names() {
        let table = TableDescriptor::new("ORDER").always_quote().into_ref();
        let id: Column<i32> = Column::new(&table, "ID").quoted();
        let meta = EntityMetamodel::new(&table).id(&id);
        let context = SelectContext::of(&meta);
        let mysql = SelectStatementBuilder::new(&MySqlDialect, "\\", &context).build().unwrap();
        assert_eq!(build(&context).unwrap().sql(), "select t0_.\"ID\" from \"ORDER\" t0_");
        assert_eq!(mysql.sql(), "select t0_.`ID` from `ORDER` t0_");
    }

    #[test]
    fn test_column_outside_context_is_an_error() {
        let a = address();
        let e = employee();
        let context = SelectContext::of(&a.meta).where_(e.id.eq(1));
        assert_eq!(
            build(&context),
            Err(BuildError::NoAlias("EMPLOYEE".to_string()))
        );
    }

    #[test]
    fn test_like_on_non_text_column_is_a_type_mismatch() {
        let a = address();
        let context = SelectContext::of(&a.meta).where_(a.id.like("1%"));
        assert_eq!(
            build(&context),
            Err(BuildError::TypeMismatch {
                column: "ADDRESS.ADDRESS_ID".to_string(),
                expected: SqlType::Int32,
                actual: SqlType::Text,
            })
        );
    }
}
