//! Task use-case service.
//!
//! # Responsibility
//! - Create, patch and list tasks; answer per-assignee and per-project reads.
//!
//! # Invariants
//! - New and patched tasks carry the project reference in canonical form.
//! - Patches never change `_id` or `created_at`.
//! - Per-project reads go through [`ProjectRefResolver`], so tasks written by
//!   any historical path are found.

use super::{decode, insert_new, parse_id};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::document::{Document, CREATED_AT_FIELD};
use crate::model::task::{
    prepare_new_task, prepare_task_patch, Task, ASSIGNEE_FIELD, STATUS_FIELD, TITLE_FIELD,
};
use crate::model::timestamp::parse_calendar_date;
use crate::query::pagination::{paginate, Page, PagePolicy, PageRequest};
use crate::query::resolver::ProjectRefResolver;
use crate::repo::document_store::{Collection, DocumentStore, FindQuery};
use crate::repo::filter::Filter;
use log::info;

/// Listing filter for [`TaskService::list_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Exact status match.
    pub status: Option<String>,
    /// Closed `[start, end]` bounds on `created_at`, compared as ISO-8601
    /// text. A bare date bound (`2025-01-31`) sorts before every time on
    /// that day.
    pub created_between: Option<(String, String)>,
}

/// Use-case service for the `taches` collection.
pub struct TaskService<S: DocumentStore> {
    store: S,
    resolver: ProjectRefResolver,
    page_policy: PagePolicy,
}

impl<S: DocumentStore> TaskService<S> {
    pub fn new(store: S, config: &CoreConfig) -> Self {
        Self {
            store,
            resolver: ProjectRefResolver::new(config.include_legacy_project_field),
            page_policy: PagePolicy {
                default_limit: config.tasks_default_limit,
                max_limit: config.max_limit,
            },
        }
    }

    /// Creates a task from caller fields.
    ///
    /// # Contract
    /// - `titre` is required.
    /// - A legacy-named project reference is moved to `projetId`.
    /// - Returns the stored task with generated id and `created_at`.
    pub fn create_task(&self, mut fields: Document) -> CoreResult<Task> {
        prepare_new_task(&mut fields)?;
        let (_, stored) = insert_new(&self.store, Collection::Taches, fields)?;
        let task = decode(Collection::Taches, &stored, Task::from_document)?;
        info!("event=task_create module=service status=ok task={}", task.id);
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> CoreResult<Option<Task>> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(Collection::Taches, &id)?
            .map(|document| decode(Collection::Taches, &document, Task::from_document))
            .transpose()
    }

    /// Replaces the given fields of one task.
    ///
    /// An empty patch changes nothing and returns the current task.
    pub fn update_task(&self, id: &str, mut patch: Document) -> CoreResult<Task> {
        let object_id = parse_id(id)?;
        prepare_task_patch(&mut patch)?;

        let updated = self
            .store
            .update_fields(Collection::Taches, &object_id, &patch)?
            .ok_or_else(|| CoreError::NotFound {
                collection: Collection::Taches,
                id: object_id.to_hex(),
            })?;
        info!(
            "event=task_update module=service status=ok task={} fields={}",
            object_id,
            patch.len()
        );
        decode(Collection::Taches, &updated, Task::from_document)
    }

    /// Lists tasks page by page. `limit < 1` falls back to 5 by default.
    pub fn list_tasks(&self, filter: &TaskFilter, request: PageRequest) -> CoreResult<Page<Task>> {
        let predicate = build_task_filter(filter)?;
        paginate(
            &self.store,
            Collection::Taches,
            &predicate,
            request,
            self.page_policy,
        )?
        .try_map(|document| decode(Collection::Taches, &document, Task::from_document))
    }

    /// All tasks assigned to `user_id`, in storage order.
    pub fn tasks_by_assignee(&self, user_id: &str) -> CoreResult<Vec<Task>> {
        self.find_tasks(Filter::eq(ASSIGNEE_FIELD, user_id))
    }

    /// Tasks owned by `project_id`, optionally narrowed by a case-insensitive
    /// title substring.
    pub fn tasks_by_project(
        &self,
        project_id: &str,
        title_query: Option<&str>,
    ) -> CoreResult<Vec<Task>> {
        let mut predicate = self.resolver.filter_for(project_id);
        if let Some(query) = title_query.map(str::trim).filter(|query| !query.is_empty()) {
            predicate = predicate.and(Filter::contains_ci(TITLE_FIELD, query));
        }
        self.find_tasks(predicate)
    }

    fn find_tasks(&self, predicate: Filter) -> CoreResult<Vec<Task>> {
        self.store
            .find(Collection::Taches, &FindQuery::new(predicate))?
            .iter()
            .map(|document| decode(Collection::Taches, document, Task::from_document))
            .collect()
    }
}

fn build_task_filter(filter: &TaskFilter) -> CoreResult<Filter> {
    let mut predicate = Filter::All;
    if let Some(status) = &filter.status {
        predicate = predicate.and(Filter::eq(STATUS_FIELD, status.as_str()));
    }
    if let Some((start, end)) = &filter.created_between {
        for bound in [start, end] {
            if parse_calendar_date(bound).is_none() {
                return Err(CoreError::InvalidArgument(format!(
                    "date bound `{bound}` is not an ISO-8601 date"
                )));
            }
        }
        predicate = predicate.and(Filter::text_between(
            CREATED_AT_FIELD,
            Some(start.trim().to_string()),
            Some(end.trim().to_string()),
        ));
    }
    Ok(predicate)
}
