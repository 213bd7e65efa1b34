mod criterion;
mod operand;

pub use criterion::{and, exists, not, not_exists, or, Criterion, ExpressionOps, LikeOption};
pub use operand::{
    avg, concat, count, count_all, div, max, min, minus, plus, rem, sum, times, Aggregate,
    ArithmeticOp, ColumnExpr, Expr, IntoOperand, Operand, SortItem, SortOrder,
};
