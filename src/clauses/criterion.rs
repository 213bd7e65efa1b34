use crate::clauses::{ColumnExpr, Expr, IntoOperand, Operand, SortItem, SortOrder};
use crate::context::SelectContext;
use crate::traits::Column;

/// How the right-hand text of a LIKE is turned into a pattern before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeOption {
    /// Bind the text as given
    None,
    /// Escape wildcard characters
    Escape,
    /// Escape, then `text%`
    Prefix,
    /// Escape, then `%text%`
    Infix,
    /// Escape, then `%text`
    Suffix,
}

/// A node of a predicate tree.
/// Lists inside `And`/`Or`/`Not` render nothing when empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Criterion {
    Eq(Operand, Operand),
    NotEq(Operand, Operand),
    Less(Operand, Operand),
    LessEq(Operand, Operand),
    Greater(Operand, Operand),
    GreaterEq(Operand, Operand),
    IsNull(Operand),
    IsNotNull(Operand),
    Like(Operand, Operand, LikeOption),
    NotLike(Operand, Operand, LikeOption),
    Between(Operand, Operand, Operand),
    NotBetween(Operand, Operand, Operand),
    InList(Operand, Vec<Operand>),
    NotInList(Operand, Vec<Operand>),
    InSubQuery(Operand, Box<SelectContext>),
    NotInSubQuery(Operand, Box<SelectContext>),
    Exists(Box<SelectContext>),
    NotExists(Box<SelectContext>),
    And(Vec<Criterion>),
    Or(Vec<Criterion>),
    Not(Vec<Criterion>),
}

impl Criterion {
    /// True when the criterion renders to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Criterion::And(list) | Criterion::Or(list) | Criterion::Not(list) => {
                list.iter().all(Criterion::is_empty)
            }
            _ => false,
        }
    }

    /// Combines with another criterion using AND.
    pub fn and(self, other: Criterion) -> Criterion {
        Criterion::And(vec![self, other])
    }

    /// Combines with another criterion using OR.
    pub fn or(self, other: Criterion) -> Criterion {
        Criterion::Or(vec![self, other])
    }
}

pub fn and(criteria: impl IntoIterator<Item = Criterion>) -> Criterion {
    Criterion::And(criteria.into_iter().collect())
}

pub fn or(criteria: impl IntoIterator<Item = Criterion>) -> Criterion {
    Criterion::Or(criteria.into_iter().collect())
}

pub fn not(criteria: impl IntoIterator<Item = Criterion>) -> Criterion {
    Criterion::Not(criteria.into_iter().collect())
}

pub fn exists(sub_query: SelectContext) -> Criterion {
    Criterion::Exists(Box::new(sub_query))
}

pub fn not_exists(sub_query: SelectContext) -> Criterion {
    Criterion::NotExists(Box::new(sub_query))
}

/// Predicate builders shared by typed columns and expressions.
pub trait ExpressionOps<T> {
    fn to_expr(&self) -> ColumnExpr;

    fn operand(&self) -> Operand {
        Operand::Column(self.to_expr())
    }

    fn eq(&self, other: impl IntoOperand<T>) -> Criterion {
        Criterion::Eq(self.operand(), other.into_operand())
    }

    fn not_eq(&self, other: impl IntoOperand<T>) -> Criterion {
        Criterion::NotEq(self.operand(), other.into_operand())
    }

    fn less(&self, other: impl IntoOperand<T>) -> Criterion {
        Criterion::Less(self.operand(), other.into_operand())
    }

    fn less_eq(&self, other: impl IntoOperand<T>) -> Criterion {
        Criterion::LessEq(self.operand(), other.into_operand())
    }

    fn greater(&self, other: impl IntoOperand<T>) -> Criterion {
        Criterion::Greater(self.operand(), other.into_operand())
    }

    fn greater_eq(&self, other: impl IntoOperand<T>) -> Criterion {
        Criterion::GreaterEq(self.operand(), other.into_operand())
    }

    fn is_null(&self) -> Criterion {
        Criterion::IsNull(self.operand())
    }

    fn is_not_null(&self) -> Criterion {
        Criterion::IsNotNull(self.operand())
    }

    fn like(&self, pattern: impl IntoOperand<String>) -> Criterion {
        Criterion::Like(self.operand(), pattern.into_operand(), LikeOption::Escape)
    }

    fn like_with(&self, pattern: impl IntoOperand<String>, option: LikeOption) -> Criterion {
        Criterion::Like(self.operand(), pattern.into_operand(), option)
    }

    fn not_like(&self, pattern: impl IntoOperand<String>) -> Criterion {
        Criterion::NotLike(self.operand(), pattern.into_operand(), LikeOption::Escape)
    }

    fn starts_with(&self, text: impl IntoOperand<String>) -> Criterion {
        self.like_with(text, LikeOption::Prefix)
    }

    fn contains(&self, text: impl IntoOperand<String>) -> Criterion {
        self.like_with(text, LikeOption::Infix)
    }

    fn ends_with(&self, text: impl IntoOperand<String>) -> Criterion {
        self.like_with(text, LikeOption::Suffix)
    }

    fn between(&self, start: impl IntoOperand<T>, end: impl IntoOperand<T>) -> Criterion {
        Criterion::Between(self.operand(), start.into_operand(), end.into_operand())
    }

    fn not_between(&self, start: impl IntoOperand<T>, end: impl IntoOperand<T>) -> Criterion {
        Criterion::NotBetween(self.operand(), start.into_operand(), end.into_operand())
    }

    fn in_list<O: IntoOperand<T>>(&self, values: impl IntoIterator<Item = O>) -> Criterion {
        let values = values.into_iter().map(IntoOperand::into_operand).collect();
        Criterion::InList(self.operand(), values)
    }

    fn not_in_list<O: IntoOperand<T>>(&self, values: impl IntoIterator<Item = O>) -> Criterion {
        let values = values.into_iter().map(IntoOperand::into_operand).collect();
        Criterion::NotInList(self.operand(), values)
    }

    fn in_sub_query(&self, sub_query: SelectContext) -> Criterion {
        Criterion::InSubQuery(self.operand(), Box::new(sub_query))
    }

    fn not_in_sub_query(&self, sub_query: SelectContext) -> Criterion {
        Criterion::NotInSubQuery(self.operand(), Box::new(sub_query))
    }

    fn asc(&self) -> SortItem {
        SortItem {
            expr: self.to_expr(),
            order: SortOrder::Asc,
        }
    }

    fn desc(&self) -> SortItem {
        SortItem {
            expr: self.to_expr(),
            order: SortOrder::Desc,
        }
    }
}

impl<T> ExpressionOps<T> for Column<T> {
    fn to_expr(&self) -> ColumnExpr {
        ColumnExpr::Column(std::sync::Arc::clone(self.descriptor()))
    }
}

impl<T> ExpressionOps<T> for Expr<T> {
    fn to_expr(&self) -> ColumnExpr {
        self.expr().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TableDescriptor;

    fn street() -> Column<String> {
        Column::new(&TableDescriptor::new("ADDRESS").into_ref(), "STREET")
    }

    #[test]
    fn test_empty_groups_are_empty() {
        assert!(and([]).is_empty());
        assert!(or([not([]), and([])]).is_empty());
        assert!(!or([street().is_null()]).is_empty());
    }

    #[test]
    fn test_criteria_compare_structurally() {
        assert_eq!(street().eq("A"), street().eq("A"));
        assert_ne!(street().eq("A"), street().eq("B"));
        assert_eq!(
            street().starts_with("A"),
            street().like_with("A", LikeOption::Prefix)
        );
    }
}
