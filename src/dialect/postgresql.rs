use crate::dialect::{Dialect, GeneratedKeyMode, UpsertStyle};

/// PostgreSQL: double-quoted identifiers, `returning` for identity keys,
/// `on conflict` upserts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSqlDialect;

impl Dialect for PostgreSqlDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn generated_key_mode(&self) -> GeneratedKeyMode {
        GeneratedKeyMode::Returning
    }

    fn sequence_sql(&self, sequence: &str) -> Option<String> {
        Some(format!("select nextval('{sequence}')"))
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }
}
