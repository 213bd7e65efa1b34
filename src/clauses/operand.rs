use std::marker::PhantomData;
use std::sync::Arc;

use crate::traits::{Column, ColumnRef, ColumnValue};
use crate::types::{BindValue, SqlType, SqlValue};

/// Either a column-valued expression or a bound literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Column(ColumnExpr),
    Parameter(BindValue),
}

impl Operand {
    /// Declared type of the operand, `None` for an untyped NULL.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Operand::Column(expr) => Some(expr.sql_type()),
            Operand::Parameter(bind) if bind.value.is_null() => None,
            Operand::Parameter(bind) => Some(bind.sql_type),
        }
    }
}

/// Expressions that evaluate to a column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnExpr {
    Column(ColumnRef),
    Aggregate(Aggregate),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Operand>,
        right: Box<Operand>,
    },
    Concat(Box<Operand>, Box<Operand>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Avg(Box<ColumnExpr>),
    CountAll,
    Count(Box<ColumnExpr>),
    Max(Box<ColumnExpr>),
    Min(Box<ColumnExpr>),
    Sum(Box<ColumnExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Rem => "%",
        }
    }
}

impl ColumnExpr {
    /// The SQL type the expression evaluates to.
    pub fn sql_type(&self) -> SqlType {
        match self {
            ColumnExpr::Column(column) => column.sql_type,
            ColumnExpr::Aggregate(Aggregate::Avg(_)) => SqlType::Float64,
            ColumnExpr::Aggregate(Aggregate::CountAll | Aggregate::Count(_)) => SqlType::Int64,
            ColumnExpr::Aggregate(
                Aggregate::Max(inner) | Aggregate::Min(inner) | Aggregate::Sum(inner),
            ) => inner.sql_type(),
            ColumnExpr::Arithmetic { left, right, .. } => left
                .sql_type()
                .or_else(|| right.sql_type())
                .unwrap_or(SqlType::Int64),
            ColumnExpr::Concat(_, _) => SqlType::Text,
        }
    }

    /// Name used to describe the expression in errors.
    pub fn describe(&self) -> String {
        match self {
            ColumnExpr::Column(column) => column.qualified_name(),
            ColumnExpr::Aggregate(_) => "aggregate".to_string(),
            ColumnExpr::Arithmetic { op, .. } => format!("arithmetic '{}'", op.symbol()),
            ColumnExpr::Concat(_, _) => "concat".to_string(),
        }
    }
}

/// A typed column expression.
pub struct Expr<T> {
    expr: ColumnExpr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Expr<T> {
    pub(crate) fn new(expr: ColumnExpr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    pub fn expr(&self) -> &ColumnExpr {
        &self.expr
    }

    pub fn into_expr(self) -> ColumnExpr {
        self.expr
    }
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<T> std::fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Expr").field(&self.expr).finish()
    }
}

impl<T> From<&Column<T>> for Expr<T> {
    fn from(column: &Column<T>) -> Self {
        Self::new(ColumnExpr::Column(Arc::clone(column.descriptor())))
    }
}

/// Anything that can stand on the right-hand side of a predicate on a `T` column.
pub trait IntoOperand<T> {
    fn into_operand(self) -> Operand;
}

impl<T: ColumnValue> IntoOperand<T> for T {
    fn into_operand(self) -> Operand {
        Operand::Parameter(BindValue::new(self.to_sql(), T::SQL_TYPE))
    }
}

impl<T> IntoOperand<T> for &Column<T> {
    fn into_operand(self) -> Operand {
        Operand::Column(ColumnExpr::Column(Arc::clone(self.descriptor())))
    }
}

impl<T> IntoOperand<T> for Expr<T> {
    fn into_operand(self) -> Operand {
        Operand::Column(self.expr)
    }
}

impl IntoOperand<String> for &str {
    fn into_operand(self) -> Operand {
        Operand::Parameter(BindValue::new(SqlValue::from(self), SqlType::Text))
    }
}

impl IntoOperand<Option<String>> for &str {
    fn into_operand(self) -> Operand {
        Operand::Parameter(BindValue::new(SqlValue::from(self), SqlType::Text))
    }
}

/// Sort direction of an ORDER BY item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortItem {
    pub expr: ColumnExpr,
    pub order: SortOrder,
}

impl<T> From<&Column<T>> for SortItem {
    fn from(column: &Column<T>) -> Self {
        SortItem {
            expr: ColumnExpr::Column(Arc::clone(column.descriptor())),
            order: SortOrder::Asc,
        }
    }
}

impl<T> From<Expr<T>> for SortItem {
    fn from(expr: Expr<T>) -> Self {
        SortItem {
            expr: expr.into_expr(),
            order: SortOrder::Asc,
        }
    }
}

fn boxed<T>(operand: impl IntoOperand<T>) -> Box<Operand> {
    Box::new(operand.into_operand())
}

fn arithmetic<T>(op: ArithmeticOp, left: impl IntoOperand<T>, right: impl IntoOperand<T>) -> Expr<T> {
    Expr::new(ColumnExpr::Arithmetic {
        op,
        left: boxed(left),
        right: boxed(right),
    })
}

/// `(left + right)`
pub fn plus<T>(left: impl IntoOperand<T>, right: impl IntoOperand<T>) -> Expr<T> {
    arithmetic(ArithmeticOp::Add, left, right)
}

pub fn minus<T>(left: impl IntoOperand<T>, right: impl IntoOperand<T>) -> Expr<T> {
    arithmetic(ArithmeticOp::Sub, left, right)
}

pub fn times<T>(left: impl IntoOperand<T>, right: impl IntoOperand<T>) -> Expr<T> {
    arithmetic(ArithmeticOp::Mul, left, right)
}

pub fn div<T>(left: impl IntoOperand<T>, right: impl IntoOperand<T>) -> Expr<T> {
    arithmetic(ArithmeticOp::Div, left, right)
}

pub fn rem<T>(left: impl IntoOperand<T>, right: impl IntoOperand<T>) -> Expr<T> {
    arithmetic(ArithmeticOp::Rem, left, right)
}

/// `(concat(left, right))`
pub fn concat(left: impl IntoOperand<String>, right: impl IntoOperand<String>) -> Expr<String> {
    Expr::new(ColumnExpr::Concat(boxed(left), boxed(right)))
}

fn aggregate<T, R>(expr: impl Into<Expr<T>>, wrap: fn(Box<ColumnExpr>) -> Aggregate) -> Expr<R> {
    Expr::new(ColumnExpr::Aggregate(wrap(Box::new(expr.into().into_expr()))))
}

/// `count(*)`
pub fn count_all() -> Expr<i64> {
    Expr::new(ColumnExpr::Aggregate(Aggregate::CountAll))
}

pub fn count<T>(expr: impl Into<Expr<T>>) -> Expr<i64> {
    aggregate(expr, Aggregate::Count)
}

/// Aggregates over an empty set yield NULL, hence the `Option`.
pub fn avg<T>(expr: impl Into<Expr<T>>) -> Expr<Option<f64>> {
    aggregate(expr, Aggregate::Avg)
}

pub fn max<T>(expr: impl Into<Expr<T>>) -> Expr<Option<T>> {
    aggregate(expr, Aggregate::Max)
}

pub fn min<T>(expr: impl Into<Expr<T>>) -> Expr<Option<T>> {
    aggregate(expr, Aggregate::Min)
}

pub fn sum<T>(expr: impl Into<Expr<T>>) -> Expr<Option<T>> {
    aggregate(expr, Aggregate::Sum)
}
