//! Aggregation reports over tasks, users and projects.
//!
//! # Responsibility
//! - Describe each named report as a pipeline and run it through the store.
//! - Turn group rows into typed summary records.
//!
//! # Invariants
//! - Reports are read-only and see a best-effort snapshot.
//! - Records whose date does not parse are skipped, never reported.
//! - Top projects keep only groups that match an existing project.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::document::{get_path, Document, CREATED_AT_FIELD, ID_FIELD};
use crate::model::project::TITLE_FIELD;
use crate::model::task::{ASSIGNEE_FIELD, STATUS_FIELD};
use crate::query::resolver::ProjectRefResolver;
use crate::repo::document_store::{Collection, DocumentStore, StoreError};
use crate::repo::filter::Filter;
use crate::repo::pipeline::{DateGranularity, Expr, SortKey, Stage, COUNT_FIELD};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

const PROJECT_OID_FIELD: &str = "projectOid";
const JOINED_PROJECT_FIELD: &str = "projet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeCount {
    pub assignee: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySignups {
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyProjectCount {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProject {
    #[serde(rename = "projetId")]
    pub project_id: String,
    pub titre: String,
    #[serde(rename = "taskCount")]
    pub task_count: u64,
}

/// Document totals per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub users: u64,
    pub projets: u64,
    pub taches: u64,
}

/// Read-only reporting service.
pub struct ReportService<S: DocumentStore> {
    store: S,
    resolver: ProjectRefResolver,
    top_projects_limit: usize,
}

impl<S: DocumentStore> ReportService<S> {
    pub fn new(store: S, config: &CoreConfig) -> Self {
        Self {
            store,
            resolver: ProjectRefResolver::new(config.include_legacy_project_field),
            top_projects_limit: config.top_projects_limit,
        }
    }

    /// Task count per status, most frequent first.
    pub fn status_counts(&self) -> CoreResult<Vec<StatusCount>> {
        let rows = self.run("status_counts", Collection::Taches, &count_by(STATUS_FIELD))?;
        rows.iter()
            .map(|row| {
                Ok(StatusCount {
                    status: group_text(row),
                    count: row_count(row)?,
                })
            })
            .collect()
    }

    /// Task count per assignee, most frequent first.
    pub fn assignee_counts(&self) -> CoreResult<Vec<AssigneeCount>> {
        let rows = self.run(
            "assignee_counts",
            Collection::Taches,
            &count_by(ASSIGNEE_FIELD),
        )?;
        rows.iter()
            .map(|row| {
                Ok(AssigneeCount {
                    assignee: group_text(row),
                    count: row_count(row)?,
                })
            })
            .collect()
    }

    /// User signups per calendar month, oldest first.
    pub fn monthly_user_signups(&self) -> CoreResult<Vec<MonthlySignups>> {
        let rows = self.run(
            "monthly_user_signups",
            Collection::Users,
            &count_by_date(DateGranularity::Month),
        )?;
        rows.iter()
            .map(|row| {
                Ok(MonthlySignups {
                    year: date_part(row, "year")? as i32,
                    month: date_part(row, "month")? as u32,
                    count: row_count(row)?,
                })
            })
            .collect()
    }

    /// Project creations per calendar day, oldest first.
    pub fn daily_project_counts(&self) -> CoreResult<Vec<DailyProjectCount>> {
        let rows = self.run(
            "daily_project_counts",
            Collection::Projets,
            &count_by_date(DateGranularity::Day),
        )?;
        rows.iter()
            .map(|row| {
                Ok(DailyProjectCount {
                    year: date_part(row, "year")? as i32,
                    month: date_part(row, "month")? as u32,
                    day: date_part(row, "day")? as u32,
                    count: row_count(row)?,
                })
            })
            .collect()
    }

    /// Projects with the most tasks, joined to their titles.
    ///
    /// String and native references to one project count together. Tasks
    /// without a reference are left out before grouping. The limit applies
    /// before the join, so dangling references can leave fewer rows than
    /// the limit.
    pub fn top_projects_by_task_count(&self) -> CoreResult<Vec<TopProject>> {
        let stages = vec![
            Stage::Match(self.resolver.has_reference()),
            Stage::Group {
                key: self.resolver.group_key(),
            },
            Stage::Sort(vec![SortKey::desc(COUNT_FIELD)]),
            Stage::Limit(self.top_projects_limit),
            Stage::AddField {
                name: PROJECT_OID_FIELD.to_string(),
                expr: Expr::ToObjectId(Box::new(Expr::field(ID_FIELD))),
            },
            Stage::Lookup {
                from: Collection::Projets,
                local_field: PROJECT_OID_FIELD.to_string(),
                foreign_field: ID_FIELD.to_string(),
                as_field: JOINED_PROJECT_FIELD.to_string(),
            },
            Stage::Unwind(JOINED_PROJECT_FIELD.to_string()),
        ];
        let rows = self.run("top_projects_by_task_count", Collection::Taches, &stages)?;
        rows.iter()
            .map(|row| {
                let project_id = group_text(row).ok_or_else(|| malformed_row("project id"))?;
                let titre = get_path(row, &format!("{JOINED_PROJECT_FIELD}.{TITLE_FIELD}"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed_row("project title"))?
                    .to_string();
                Ok(TopProject {
                    project_id,
                    titre,
                    task_count: row_count(row)?,
                })
            })
            .collect()
    }

    pub fn collection_counts(&self) -> CoreResult<CollectionCounts> {
        Ok(CollectionCounts {
            users: self.store.count(Collection::Users, &Filter::All)?,
            projets: self.store.count(Collection::Projets, &Filter::All)?,
            taches: self.store.count(Collection::Taches, &Filter::All)?,
        })
    }

    fn run(
        &self,
        report: &'static str,
        collection: Collection,
        stages: &[Stage],
    ) -> CoreResult<Vec<Document>> {
        let started_at = Instant::now();
        match self.store.aggregate(collection, stages) {
            Ok(rows) => {
                info!(
                    "event=report_run module=service status=ok report={} duration_ms={} rows={}",
                    report,
                    started_at.elapsed().as_millis(),
                    rows.len()
                );
                Ok(rows)
            }
            Err(err) => {
                warn!(
                    "event=report_run module=service status=error report={} duration_ms={} error={}",
                    report,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn count_by(field: &str) -> Vec<Stage> {
    vec![
        Stage::Group {
            key: Expr::field(field),
        },
        Stage::Sort(vec![SortKey::desc(COUNT_FIELD)]),
    ]
}

fn count_by_date(granularity: DateGranularity) -> Vec<Stage> {
    let mut order = vec![SortKey::asc("_id.year"), SortKey::asc("_id.month")];
    if granularity == DateGranularity::Day {
        order.push(SortKey::asc("_id.day"));
    }
    vec![
        Stage::Group {
            key: Expr::CalendarDate {
                field: CREATED_AT_FIELD.to_string(),
                granularity,
            },
        },
        Stage::Sort(order),
    ]
}

fn group_text(row: &Document) -> Option<String> {
    match row.get(ID_FIELD)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn row_count(row: &Document) -> CoreResult<u64> {
    row.get(COUNT_FIELD)
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed_row(COUNT_FIELD))
}

fn date_part(row: &Document, part: &str) -> CoreResult<i64> {
    get_path(row, &format!("{ID_FIELD}.{part}"))
        .and_then(Value::as_i64)
        .ok_or_else(|| malformed_row(part))
}

fn malformed_row(what: &str) -> CoreError {
    CoreError::Storage(StoreError::InvalidData(format!(
        "report row is missing its {what}"
    )))
}

#[cfg(test)]
mod tests {
    use super::{count_by_date, group_text};
    use crate::model::document::Document;
    use crate::repo::pipeline::{DateGranularity, SortKey, Stage};
    use serde_json::json;

    #[test]
    fn daily_report_sorts_by_all_three_date_parts() {
        let stages = count_by_date(DateGranularity::Day);
        let Stage::Sort(keys) = &stages[1] else {
            panic!("expected sort stage");
        };
        assert_eq!(
            keys,
            &vec![
                SortKey::asc("_id.year"),
                SortKey::asc("_id.month"),
                SortKey::asc("_id.day")
            ]
        );
    }

    #[test]
    fn null_group_key_reads_as_none() {
        let row: Document = serde_json::from_value(json!({"_id": null, "count": 2})).unwrap();
        assert_eq!(group_text(&row), None);
        let row: Document = serde_json::from_value(json!({"_id": "TODO", "count": 2})).unwrap();
        assert_eq!(group_text(&row).as_deref(), Some("TODO"));
    }
}
