//! Project use-case service, including the atomic project + first task write.
//!
//! # Invariants
//! - `create_project_with_first_task` is all-or-nothing across `projets`
//!   and `taches`: on any failure no project from the call remains.
//! - Each call opens its own session; sessions are never shared.
//! - The first task references its project through the canonical field
//!   holding a native identifier.

use super::{decode, insert_new, parse_id};
use crate::error::{CoreError, CoreResult};
use crate::model::document::Document;
use crate::model::object_id::ObjectId;
use crate::model::project::{prepare_new_project, Project, DESCRIPTION_FIELD, TITLE_FIELD};
use crate::model::project_ref::stamp_project_ref;
use crate::model::task::prepare_new_task;
use crate::repo::document_store::{Collection, DocumentStore, FindQuery};
use crate::repo::filter::Filter;
use log::{info, warn};
use serde::Serialize;
use std::time::Instant;

/// Identifiers generated by [`ProjectService::create_project_with_first_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedProjectWithTask {
    #[serde(rename = "projetId")]
    pub project_id: ObjectId,
    #[serde(rename = "tacheId")]
    pub task_id: ObjectId,
}

/// Use-case service for the `projets` collection.
pub struct ProjectService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> ProjectService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_project(&self, fields: Document) -> CoreResult<Project> {
        prepare_new_project(&fields)?;
        let (id, stored) = insert_new(&self.store, Collection::Projets, fields)?;
        info!("event=project_create module=service status=ok project={id}");
        decode(Collection::Projets, &stored, Project::from_document)
    }

    pub fn get_project(&self, id: &str) -> CoreResult<Option<Project>> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(Collection::Projets, &id)?
            .map(|document| decode(Collection::Projets, &document, Project::from_document))
            .transpose()
    }

    /// Projects whose title or description contains `query`, ignoring case.
    ///
    /// `query` is matched literally. A blank query returns nothing.
    pub fn search_projects(&self, query: &str) -> CoreResult<Vec<Project>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let predicate = Filter::any_of([
            Filter::contains_ci(TITLE_FIELD, query),
            Filter::contains_ci(DESCRIPTION_FIELD, query),
        ]);
        self.store
            .find(Collection::Projets, &FindQuery::new(predicate))?
            .iter()
            .map(|document| decode(Collection::Projets, document, Project::from_document))
            .collect()
    }

    /// Creates a project and its first task in one session.
    ///
    /// # Contract
    /// - Steps: insert project, stamp `projetId` on the task, insert task.
    /// - Any failure (validation included) rolls the project back and is
    ///   returned as `TransactionFailed` carrying the cause.
    pub fn create_project_with_first_task(
        &self,
        project: Document,
        mut task: Document,
    ) -> CoreResult<CreatedProjectWithTask> {
        let started_at = Instant::now();
        let outcome = self.store.transaction(|tx| -> CoreResult<CreatedProjectWithTask> {
            prepare_new_project(&project)?;
            let (project_id, _) = insert_new(tx, Collection::Projets, project)?;

            stamp_project_ref(&mut task, &project_id);
            prepare_new_task(&mut task)?;
            let (task_id, _) = insert_new(tx, Collection::Taches, task)?;

            Ok(CreatedProjectWithTask {
                project_id,
                task_id,
            })
        });

        match outcome {
            Ok(created) => {
                info!(
                    "event=project_with_task module=service status=ok duration_ms={} project={} task={}",
                    started_at.elapsed().as_millis(),
                    created.project_id,
                    created.task_id
                );
                Ok(created)
            }
            Err(err) => {
                warn!(
                    "event=project_with_task module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(CoreError::transaction_failed(err))
            }
        }
    }
}
