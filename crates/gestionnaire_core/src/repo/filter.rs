//! Document query predicates and their SQLite translation.
//!
//! # Invariants
//! - Field paths and operands are always bound as parameters, never spliced
//!   into SQL text.
//! - Equality is type-aware: the string `"507f..."` and the identifier
//!   `{"$oid": "507f..."}` never match each other.
//! - Missing fields compare equal to `null` only.

use super::document_store::{StoreError, StoreResult};
use crate::model::document::{as_object_id, json_path};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Predicate over documents of one collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    /// Type-aware equality on a (dotted) field path.
    Eq { field: String, value: Value },
    /// Regex match on a text field. Non-text values never match.
    Matches { field: String, pattern: String },
    /// Closed range over a text field, compared lexicographically.
    TextRange {
        field: String,
        gte: Option<String>,
        lte: Option<String>,
    },
    /// Field exists and holds a non-null value.
    Present { field: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive literal substring match.
    pub fn contains_ci(field: impl Into<String>, needle: &str) -> Self {
        Self::Matches {
            field: field.into(),
            pattern: format!("(?i){}", regex::escape(needle)),
        }
    }

    /// Case-insensitive whole-value text equality.
    pub fn equals_ci(field: impl Into<String>, text: &str) -> Self {
        Self::Matches {
            field: field.into(),
            pattern: format!("(?i)^{}$", regex::escape(text)),
        }
    }

    pub fn present(field: impl Into<String>) -> Self {
        Self::Present {
            field: field.into(),
        }
    }

    pub fn text_between(
        field: impl Into<String>,
        gte: Option<String>,
        lte: Option<String>,
    ) -> Self {
        Self::TextRange {
            field: field.into(),
            gte,
            lte,
        }
    }

    /// Conjunction; `All` operands are dropped and nested `And`s flattened.
    pub fn and(self, other: Filter) -> Self {
        let mut clauses = Vec::new();
        for clause in [self, other] {
            match clause {
                Self::All => {}
                Self::And(inner) => clauses.extend(inner),
                other => clauses.push(other),
            }
        }
        match clauses.len() {
            0 => Self::All,
            1 => clauses.remove(0),
            _ => Self::And(clauses),
        }
    }

    /// Disjunction of all clauses; nested `Or`s are flattened.
    pub fn any_of(clauses: impl IntoIterator<Item = Filter>) -> Self {
        let mut flat = Vec::new();
        for clause in clauses {
            match clause {
                Self::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::Or(flat)
        }
    }

    /// Compiles into a boolean SQL expression over the `body` column.
    pub(crate) fn to_sql(&self) -> StoreResult<SqlFragment> {
        let mut params = Vec::new();
        let sql = compile(self, &mut params)?;
        Ok(SqlFragment { sql, params })
    }
}

/// SQL expression plus its positional parameters, in order.
#[derive(Debug)]
pub(crate) struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

fn compile(filter: &Filter, params: &mut Vec<SqlValue>) -> StoreResult<String> {
    match filter {
        Filter::All => Ok("1 = 1".to_string()),
        Filter::Eq { field, value } => compile_eq(field, value, params),
        Filter::Matches { field, pattern } => {
            Regex::new(pattern).map_err(|err| {
                StoreError::InvalidQuery(format!("invalid pattern for `{field}`: {err}"))
            })?;
            params.push(SqlValue::Text(json_path(field)));
            params.push(SqlValue::Text(pattern.clone()));
            Ok("(json_extract(body, ?) REGEXP ?)".to_string())
        }
        Filter::TextRange { field, gte, lte } => {
            let path = json_path(field);
            params.push(SqlValue::Text(path.clone()));
            let mut sql = String::from("(json_type(body, ?) = 'text'");
            if let Some(lower) = gte {
                sql.push_str(" AND json_extract(body, ?) >= ?");
                params.push(SqlValue::Text(path.clone()));
                params.push(SqlValue::Text(lower.clone()));
            }
            if let Some(upper) = lte {
                sql.push_str(" AND json_extract(body, ?) <= ?");
                params.push(SqlValue::Text(path));
                params.push(SqlValue::Text(upper.clone()));
            }
            sql.push(')');
            Ok(sql)
        }
        Filter::Present { field } => {
            params.push(SqlValue::Text(json_path(field)));
            // json_type is NULL for a missing path, so absent fields fail too.
            Ok("(json_type(body, ?) != 'null')".to_string())
        }
        Filter::And(clauses) => compile_joined(clauses, " AND ", "1 = 1", params),
        Filter::Or(clauses) => compile_joined(clauses, " OR ", "0 = 1", params),
    }
}

fn compile_joined(
    clauses: &[Filter],
    separator: &str,
    empty: &str,
    params: &mut Vec<SqlValue>,
) -> StoreResult<String> {
    if clauses.is_empty() {
        return Ok(empty.to_string());
    }
    let parts = clauses
        .iter()
        .map(|clause| compile(clause, params))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(format!("({})", parts.join(separator)))
}

fn compile_eq(field: &str, value: &Value, params: &mut Vec<SqlValue>) -> StoreResult<String> {
    let path = json_path(field);
    match value {
        Value::Null => {
            params.push(SqlValue::Text(path.clone()));
            params.push(SqlValue::Text(path));
            Ok("(json_type(body, ?) IS NULL OR json_type(body, ?) = 'null')".to_string())
        }
        Value::Bool(flag) => {
            params.push(SqlValue::Text(path));
            let literal = if *flag { "true" } else { "false" };
            Ok(format!("(json_type(body, ?) = '{literal}')"))
        }
        Value::Number(number) => {
            let operand = if let Some(integer) = number.as_i64() {
                SqlValue::Integer(integer)
            } else if let Some(real) = number.as_f64() {
                SqlValue::Real(real)
            } else {
                return Err(StoreError::InvalidQuery(format!(
                    "number {number} on `{field}` is out of range"
                )));
            };
            params.push(SqlValue::Text(path.clone()));
            params.push(SqlValue::Text(path));
            params.push(operand);
            Ok("(json_type(body, ?) IN ('integer', 'real') AND json_extract(body, ?) = ?)"
                .to_string())
        }
        Value::String(text) => {
            params.push(SqlValue::Text(path.clone()));
            params.push(SqlValue::Text(path));
            params.push(SqlValue::Text(text.clone()));
            Ok("(json_type(body, ?) = 'text' AND json_extract(body, ?) = ?)".to_string())
        }
        other => {
            let id = as_object_id(other).ok_or_else(|| {
                StoreError::InvalidQuery(format!(
                    "equality on `{field}` supports scalars and object ids only"
                ))
            })?;
            params.push(SqlValue::Text(json_path(&format!("{field}.$oid"))));
            params.push(SqlValue::Text(id.to_hex()));
            Ok("(lower(json_extract(body, ?)) = ?)".to_string())
        }
    }
}
