mod select;
mod write;

pub use select::{Join, JoinKind, SelectContext};
pub use write::{DeleteContext, InsertContext, UpdateContext, UpsertAction, UpsertContext};
