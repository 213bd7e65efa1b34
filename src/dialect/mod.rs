//! Backend capability sets.
//!
//! Statement builders are written against [`Dialect`] only; everything that
//! differs between backends is answered here.

mod h2;
mod mysql;
mod postgresql;

pub use h2::H2Dialect;
pub use mysql::MySqlDialect;
pub use postgresql::PostgreSqlDialect;

use crate::error::{RelqError, Result};
use crate::statement::{NamedParameterBuilder, StatementBuffer, TemplateStatementBuilder};
use crate::types::{SqlType, SqlValue};

/// How the key of an identity column is read back after an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKeyMode {
    /// The insert carries a `returning` clause and yields rows
    Returning,
    /// The driver reports the keys itself
    Driver,
}

/// Form of an insert that resolves key conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `on conflict (...) do update set ... / do nothing`
    OnConflict,
    /// `on duplicate key update ...` and `insert ignore`
    OnDuplicateKey,
    /// `merge into ... using (values ...)`
    Merge,
}

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quotes an identifier.
    fn quote(&self, identifier: &str) -> String {
        format!("\"{identifier}\"")
    }

    /// Escapes LIKE wildcards, and the escape sequence itself, in `text`.
    fn escape(&self, text: &str, escape_sequence: &str) -> String {
        let mut escaped = String::with_capacity(text.len() + 4);
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if !escape_sequence.is_empty() && rest.starts_with(escape_sequence) {
                escaped.push_str(escape_sequence);
                escaped.push_str(escape_sequence);
                rest = &rest[escape_sequence.len()..];
                continue;
            }
            if c == '%' || c == '_' {
                escaped.push_str(escape_sequence);
            }
            escaped.push(c);
            rest = &rest[c.len_utf8()..];
        }
        escaped
    }

    /// Reads column `index` of a result row as `target`.
    fn value_of(&self, row: &[SqlValue], index: usize, target: SqlType) -> Result<SqlValue> {
        let value = row
            .get(index)
            .cloned()
            .ok_or_else(|| RelqError::ColumnNotFound(format!("#{index}")))?;
        value
            .coerce(target)
            .map_err(|e| RelqError::Mapping(format!("column #{index}: {e}")))
    }

    fn generated_key_mode(&self) -> GeneratedKeyMode;

    /// SQL fetching the next value of a sequence, `None` without sequence support.
    fn sequence_sql(&self, sequence: &str) -> Option<String>;

    fn upsert_style(&self) -> UpsertStyle;

    /// Appends the paging clause.
    fn offset_limit(&self, buf: &mut StatementBuffer, offset: Option<u64>, limit: Option<u64>) {
        if let Some(offset) = offset {
            buf.append(&format!(" offset {offset}"));
        }
        if let Some(limit) = limit {
            buf.append(&format!(" limit {limit}"));
        }
    }

    /// Insert tail used when no column is given.
    fn default_values_clause(&self) -> &'static str {
        " default values"
    }

    fn for_update_clause(&self) -> &'static str {
        " for update"
    }

    /// Builder for raw SQL templates.
    fn template_statement_builder(&self) -> &dyn TemplateStatementBuilder {
        &NamedParameterBuilder
    }
}
