//! Aggregation pipelines: stages, expressions and the in-process executor.
//!
//! A pipeline is data. The store pushes leading `Match` stages down to SQL
//! and feeds the surviving documents, in storage order, through the
//! remaining stages here.
//!
//! # Invariants
//! - `Group` emits one `{_id: key, count: n}` document per key, in the order
//!   keys were first seen.
//! - A document whose group key cannot be evaluated (e.g. an unparseable
//!   date) is skipped, not reported as an error.
//! - `Sort` is stable.
//! - `Unwind` drops documents whose array is missing or empty, which turns a
//!   preceding `Lookup` into an inner join.

use super::document_store::{Collection, StoreError, StoreResult};
use super::filter::Filter;
use crate::model::document::{as_object_id, get_path, object_id_value, Document, ID_FIELD};
use crate::model::object_id::ObjectId;
use crate::model::timestamp::parse_calendar_date;
use chrono::Datelike;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Field holding the group size in `Group` output.
pub const COUNT_FIELD: &str = "count";

/// Calendar bucket size for date grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGranularity {
    Month,
    Day,
}

/// Value expression evaluated per document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Dotted field path; missing reads as `null`.
    Field(String),
    /// First operand that is not `null`.
    Coalesce(Vec<Expr>),
    /// Text form: identifiers become hex, numbers and booleans their literal.
    ToText(Box<Expr>),
    /// Identifier form of a hex string or identifier; anything else is `null`.
    ToObjectId(Box<Expr>),
    /// `{year, month}` or `{year, month, day}` of an ISO-8601 text field.
    /// Unevaluable when the field is missing or does not parse.
    CalendarDate {
        field: String,
        granularity: DateGranularity,
    },
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    /// Returns `None` when the expression cannot be evaluated for `document`.
    pub fn eval(&self, document: &Document) -> Option<Value> {
        match self {
            Self::Field(path) => Some(get_path(document, path).cloned().unwrap_or(Value::Null)),
            Self::Coalesce(operands) => {
                for operand in operands {
                    match operand.eval(document) {
                        Some(Value::Null) | None => continue,
                        Some(value) => return Some(value),
                    }
                }
                Some(Value::Null)
            }
            Self::ToText(inner) => match inner.eval(document)? {
                Value::Null => Some(Value::Null),
                Value::String(text) => Some(Value::String(text)),
                Value::Number(number) => Some(Value::String(number.to_string())),
                Value::Bool(flag) => Some(Value::String(flag.to_string())),
                other => as_object_id(&other).map(|id| Value::String(id.to_hex())),
            },
            Self::ToObjectId(inner) => {
                let value = inner.eval(document)?;
                let id = match &value {
                    Value::String(text) => ObjectId::parse_str(text).ok(),
                    other => as_object_id(other),
                };
                Some(id.map_or(Value::Null, |id| object_id_value(&id)))
            }
            Self::CalendarDate { field, granularity } => {
                let text = get_path(document, field)?.as_str()?;
                let date = parse_calendar_date(text)?;
                let mut parts = Map::new();
                parts.insert("year".to_string(), Value::from(date.year()));
                parts.insert("month".to_string(), Value::from(date.month()));
                if *granularity == DateGranularity::Day {
                    parts.insert("day".to_string(), Value::from(date.day()));
                }
                Some(Value::Object(parts))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// One pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Only valid before any other stage.
    Match(Filter),
    /// Counts documents per key value.
    Group { key: Expr },
    /// Sets `name` to the value of `expr` (`null` when unevaluable).
    AddField { name: String, expr: Expr },
    Sort(Vec<SortKey>),
    Limit(usize),
    /// Attaches all `from` documents whose `foreign_field` equals this
    /// document's `local_field` as an array under `as_field`.
    Lookup {
        from: Collection,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// One output document per element of the array at `field`.
    Unwind(String),
}

/// Splits leading `Match` stages off so the store can push them to SQL.
pub(crate) fn split_leading_match(stages: &[Stage]) -> (Filter, &[Stage]) {
    let mut filter = Filter::All;
    let mut consumed = 0;
    for stage in stages {
        match stage {
            Stage::Match(clause) => {
                filter = filter.and(clause.clone());
                consumed += 1;
            }
            _ => break,
        }
    }
    (filter, &stages[consumed..])
}

/// Runs in-process stages over documents already in storage order.
///
/// `lookup` resolves `Lookup` stages: `(collection, field, value)` → matches.
pub(crate) fn execute<L>(
    mut documents: Vec<Document>,
    stages: &[Stage],
    mut lookup: L,
) -> StoreResult<Vec<Document>>
where
    L: FnMut(Collection, &str, &Value) -> StoreResult<Vec<Document>>,
{
    for stage in stages {
        documents = match stage {
            Stage::Match(_) => {
                return Err(StoreError::InvalidQuery(
                    "match stages must come before every other stage".to_string(),
                ));
            }
            Stage::Group { key } => group_count(&documents, key),
            Stage::AddField { name, expr } => {
                for document in &mut documents {
                    let value = expr.eval(document).unwrap_or(Value::Null);
                    document.insert(name.clone(), value);
                }
                documents
            }
            Stage::Sort(keys) => {
                documents.sort_by(|left, right| compare_documents(left, right, keys));
                documents
            }
            Stage::Limit(limit) => {
                documents.truncate(*limit);
                documents
            }
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                for document in &mut documents {
                    let local = get_path(document, local_field)
                        .cloned()
                        .unwrap_or(Value::Null);
                    let joined = lookup(*from, foreign_field, &local)?;
                    document.insert(
                        as_field.clone(),
                        Value::Array(joined.into_iter().map(Value::Object).collect()),
                    );
                }
                documents
            }
            Stage::Unwind(field) => unwind(documents, field),
        };
    }
    Ok(documents)
}

fn group_count(documents: &[Document], key: &Expr) -> Vec<Document> {
    let mut order: Vec<(Value, u64)> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for document in documents {
        let Some(value) = key.eval(document) else {
            skipped += 1;
            continue;
        };
        let fingerprint = value.to_string();
        match index_by_key.get(&fingerprint) {
            Some(&index) => order[index].1 += 1,
            None => {
                index_by_key.insert(fingerprint, order.len());
                order.push((value, 1));
            }
        }
    }

    if skipped > 0 {
        log::debug!(
            "event=pipeline_group module=repo status=ok skipped_records={} groups={}",
            skipped,
            order.len()
        );
    }

    order
        .into_iter()
        .map(|(value, count)| {
            let mut group = Document::new();
            group.insert(ID_FIELD.to_string(), value);
            group.insert(COUNT_FIELD.to_string(), Value::from(count));
            group
        })
        .collect()
}

fn unwind(documents: Vec<Document>, field: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(documents.len());
    for document in documents {
        match document.get(field) {
            Some(Value::Array(items)) => {
                for item in items.clone() {
                    let mut copy = document.clone();
                    copy.insert(field.to_string(), item);
                    out.push(copy);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => out.push(document),
        }
    }
    out
}

fn compare_documents(left: &Document, right: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(get_path(left, &key.field), get_path(right, &key.field));
        let ordering = match key.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Cross-type order: missing/null < numbers < strings < objects < arrays < booleans.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.unwrap_or(&Value::Null);
    let right = right.unwrap_or(&Value::Null);
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}
