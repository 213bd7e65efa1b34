use crate::dialect::{Dialect, GeneratedKeyMode, UpsertStyle};
use crate::statement::StatementBuffer;

/// MySQL: backtick quoting, no sequences, `limit` before `offset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, identifier: &str) -> String {
        format!("`{identifier}`")
    }

    fn generated_key_mode(&self) -> GeneratedKeyMode {
        GeneratedKeyMode::Driver
    }

    fn sequence_sql(&self, _sequence: &str) -> Option<String> {
        None
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnDuplicateKey
    }

    fn default_values_clause(&self) -> &'static str {
        " () values ()"
    }

    fn offset_limit(&self, buf: &mut StatementBuffer, offset: Option<u64>, limit: Option<u64>) {
        match (offset, limit) {
            (None, None) => {}
            (None, Some(limit)) => {
                buf.append(&format!(" limit {limit}"));
            }
            // MySQL has no offset without a limit
            (Some(offset), limit) => {
                let limit = limit.unwrap_or(u64::MAX);
                buf.append(&format!(" limit {limit} offset {offset}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_with_backticks() {
        assert_eq!(MySqlDialect.quote("ORDER"), "`ORDER`");
    }

    #[test]
    fn test_offset_requires_limit() {
        let mut buf = StatementBuffer::new();
        MySqlDialect.offset_limit(&mut buf, Some(3), None);
        assert_eq!(
            buf.build().sql(),
            format!(" limit {} offset 3", u64::MAX)
        );
    }
}
