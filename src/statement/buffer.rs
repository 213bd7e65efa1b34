use std::fmt;

use crate::types::{BindValue, SqlValue};

/// Compiled SQL: text fragments interleaved with bind slots.
///
/// `parts` always holds one more element than `values`; value `i` sits between
/// `parts[i]` and `parts[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    parts: Vec<String>,
    values: Vec<BindValue>,
}

impl Statement {
    /// A statement without bind values.
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            parts: vec![sql.into()],
            values: Vec::new(),
        }
    }

    /// SQL with `?` placeholders in emission order.
    pub fn sql(&self) -> String {
        self.to_sql_with(|_| "?".to_string())
    }

    /// SQL with driver-specific placeholders; `placeholder` receives the 1-based slot index.
    pub fn to_sql_with(&self, placeholder: impl Fn(usize) -> String) -> String {
        let mut sql = String::with_capacity(self.parts.iter().map(String::len).sum::<usize>() + 4 * self.values.len());
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                sql.push_str(&placeholder(i));
            }
            sql.push_str(part);
        }
        sql
    }

    pub fn values(&self) -> &[BindValue] {
        &self.values
    }

    /// The bound values without their declared types.
    pub fn params(&self) -> Vec<SqlValue> {
        self.values.iter().map(|v| v.value.clone()).collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())?;
        if !self.values.is_empty() {
            let params: Vec<String> = self.values.iter().map(|v| v.value.to_string()).collect();
            write!(f, " [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Append-only buffer a statement is built in.
#[derive(Debug)]
pub struct StatementBuffer {
    parts: Vec<String>,
    values: Vec<BindValue>,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self {
            parts: vec![String::with_capacity(256)],
            values: Vec::new(),
        }
    }

    pub fn append(&mut self, text: &str) -> &mut Self {
        if let Some(last) = self.parts.last_mut() {
            last.push_str(text);
        }
        self
    }

    /// Adds a bind slot.
    pub fn bind(&mut self, value: BindValue) -> &mut Self {
        self.values.push(value);
        self.parts.push(String::new());
        self
    }

    /// Removes the last `length` characters of text, e.g. a trailing `", "`.
    /// Never removes a bind slot.
    pub fn cut_back(&mut self, length: usize) -> &mut Self {
        if let Some(last) = self.parts.last_mut() {
            let keep = last.len().saturating_sub(length);
            last.truncate(keep);
        }
        self
    }

    /// Appends a fully built statement, slots included.
    pub fn append_statement(&mut self, statement: Statement) -> &mut Self {
        let mut parts = statement.parts.into_iter();
        if let Some(first) = parts.next() {
            self.append(&first);
        }
        self.parts.extend(parts);
        self.values.extend(statement.values);
        self
    }

    pub fn build(self) -> Statement {
        Statement {
            parts: self.parts,
            values: self.values,
        }
    }
}

impl Default for StatementBuffer {
    fn default() -> Self {
        Self::new()
    }
}
