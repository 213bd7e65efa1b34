use crate::dialect::{Dialect, GeneratedKeyMode, UpsertStyle};
use crate::statement::StatementBuffer;

/// H2: keys come back through the driver, upserts are `merge` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct H2Dialect;

impl Dialect for H2Dialect {
    fn name(&self) -> &'static str {
        "h2"
    }

    fn generated_key_mode(&self) -> GeneratedKeyMode {
        GeneratedKeyMode::Driver
    }

    fn sequence_sql(&self, sequence: &str) -> Option<String> {
        Some(format!("call next value for {sequence}"))
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Merge
    }

    fn offset_limit(&self, buf: &mut StatementBuffer, offset: Option<u64>, limit: Option<u64>) {
        if let Some(offset) = offset {
            buf.append(&format!(" offset {offset} rows"));
        }
        if let Some(limit) = limit {
            buf.append(&format!(" fetch first {limit} rows only"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_fetch_first() {
        let mut buf = StatementBuffer::new();
        H2Dialect.offset_limit(&mut buf, Some(10), Some(5));
        assert_eq!(buf.build().sql(), " offset 10 rows fetch first 5 rows only");
    }
}
