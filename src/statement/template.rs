use std::collections::HashMap;

use crate::error::BuildError;
use crate::statement::{BuildResult, Statement, StatementBuffer};
use crate::types::BindValue;

/// Turns caller-supplied SQL with named parameters into a statement.
pub trait TemplateStatementBuilder: Send + Sync {
    fn build(&self, template: &str, params: &HashMap<String, BindValue>) -> BuildResult<Statement>;
}

/// Replaces every `:name` with a bind slot.
///
/// Text inside single-quoted literals is copied verbatim and `::` casts are
/// left alone. A name with no bound value is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedParameterBuilder;

impl TemplateStatementBuilder for NamedParameterBuilder {
    fn build(&self, template: &str, params: &HashMap<String, BindValue>) -> BuildResult<Statement> {
        let mut buf = StatementBuffer::new();
        let mut chars = template.char_indices().peekable();
        let mut text_start = 0;

        while let Some((i, c)) = chars.next() {
            match c {
                '\'' => {
                    // skip to the closing quote; '' is an escaped quote
                    while let Some((_, c)) = chars.next() {
                        if c == '\'' {
                            match chars.peek() {
                                Some((_, '\'')) => {
                                    chars.next();
                                }
                                _ => break,
                            }
                        }
                    }
                }
                ':' => {
                    if let Some((_, ':')) = chars.peek() {
                        chars.next();
                        continue;
                    }
                    let name_start = i + 1;
                    let mut name_end = name_start;
                    while let Some(&(j, n)) = chars.peek() {
                        let valid = if j == name_start {
                            n.is_ascii_alphabetic() || n == '_'
                        } else {
                            n.is_ascii_alphanumeric() || n == '_'
                        };
                        if !valid {
                            break;
                        }
                        name_end = j + n.len_utf8();
                        chars.next();
                    }
                    if name_end == name_start {
                        continue;
                    }
                    let name = &template[name_start..name_end];
                    let value = params
                        .get(name)
                        .ok_or_else(|| BuildError::UnboundTemplateParameter(name.to_string()))?;
                    buf.append(&template[text_start..i]).bind(value.clone());
                    text_start = name_end;
                }
                _ => {}
            }
        }
        buf.append(&template[text_start..]);
        Ok(buf.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlValue;

    fn params(pairs: &[(&str, SqlValue)]) -> HashMap<String, BindValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), BindValue::of(v.clone())))
            .collect()
    }

    #[test]
    fn test_named_parameters_become_slots() {
        let statement = NamedParameterBuilder
            .build(
                "select * from ADDRESS where ADDRESS_ID = :id and STREET <> :street",
                &params(&[("id", SqlValue::Int32(1)), ("street", SqlValue::from("X"))]),
            )
            .unwrap();
        assert_eq!(
            statement.sql(),
            "select * from ADDRESS where ADDRESS_ID = ? and STREET <> ?"
        );
        assert_eq!(statement.params(), vec![SqlValue::Int32(1), SqlValue::from("X")]);
    }

    #[test]
    fn test_literals_and_casts_are_left_alone() {
        let statement = NamedParameterBuilder
            .build(
                "select ':skip', 'it''s :x', VERSION::text from ADDRESS where ADDRESS_ID = :id",
                &params(&[("id", SqlValue::Int32(1))]),
            )
            .unwrap();
        assert_eq!(
            statement.sql(),
            "select ':skip', 'it''s :x', VERSION::text from ADDRESS where ADDRESS_ID = ?"
        );
    }

    #[test]
    fn test_unbound_parameter() {
        let result = NamedParameterBuilder.build("select :missing", &HashMap::new());
        assert_eq!(
            result,
            Err(BuildError::UnboundTemplateParameter("missing".to_string()))
        );
    }
}
