//! Statement building: contexts in, SQL text with ordered bind values out.
//!
//! Builders are pure; building the same context twice yields equal statements.

mod alias;
mod buffer;
mod select;
mod support;
mod template;
mod write;

pub use alias::AliasManager;
pub use buffer::{Statement, StatementBuffer};
pub use select::SelectStatementBuilder;
pub use template::{NamedParameterBuilder, TemplateStatementBuilder};
pub use write::{
    DeleteStatementBuilder, InsertStatementBuilder, UpdateStatementBuilder, UpsertStatementBuilder,
};

pub(crate) use support::BuilderSupport;

use crate::error::BuildError;

pub type BuildResult<T> = std::result::Result<T, BuildError>;
