//! Executable queries. Each builder owns a context plus the database it runs on.

mod association;
mod delete;
mod insert;
mod select;
mod support;
mod template;
mod update;
mod upsert;

pub use delete::{EntityDelete, SqlDelete};
pub use insert::{EntityInsert, SqlInsert};
pub use select::{EntitySelect, ScalarSelect};
pub use template::TemplateQuery;
pub use update::{EntityUpdate, SqlUpdate};
pub use upsert::EntityUpsert;
