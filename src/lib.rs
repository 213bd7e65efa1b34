//! relq - A typed, dialect-aware query builder and executor
//!
//! Entities describe their table through an [`EntityMetamodel`]; queries are
//! built from typed columns, rendered per [`dialect`], and executed through a
//! [`DatabaseDriver`].
//!
//! # Example
//! ```ignore
//! use relq::{Database, ExpressionOps};
//!
//! // Connect to database
//! let db = Database::connect("postgres://localhost/mydb").await?;
//! let querier = db.querier();
//!
//! // Select entities
//! let a = Address::meta();
//! let address = querier
//!     .select::<Address>()
//!     .where_(a.address_id.eq(16))
//!     .single()
//!     .await?;
//!
//! // Update with an optimistic lock check
//! let moved = querier
//!     .update::<Address>()
//!     .single(&Address { street: "NY street".into(), ..address })
//!     .await?;
//! ```

pub mod blocking;
pub mod builders;
pub mod clauses;
pub mod context;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod id;
pub mod querier;
pub mod statement;
pub mod traits;
pub mod types;

mod client;
mod config;

// Re-export main types for convenient access
pub use blocking::{BlockingDatabase, BlockingDriver};
pub use clauses::{and, not, or, Criterion, ExpressionOps};
pub use client::Database;
pub use config::{Clock, DatabaseConfig, SystemClock};
pub use dialect::{Dialect, H2Dialect, MySqlDialect, PostgreSqlDialect};
pub use error::{BuildError, ConstraintKind, DriverError, RelqError, Result};
pub use id::IdGenerator;
pub use querier::Querier;
pub use statement::Statement;
pub use traits::{Column, ColumnValue, DatabaseDriver, Entity, EntityMetamodel, TableDescriptor, TableRef};
pub use types::{BindValue, QueryResult, RawQueryResult, Row, SqlType, SqlValue};
