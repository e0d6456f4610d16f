//! User use-case service.

use super::{decode, insert_new, parse_id};
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::model::document::Document;
use crate::model::user::{prepare_new_user, User, ROLE_FIELD};
use crate::query::pagination::{paginate, Page, PagePolicy, PageRequest};
use crate::repo::document_store::{Collection, DocumentStore};
use crate::repo::filter::Filter;
use log::info;

/// Listing filter for [`UserService::list_users`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<String>,
}

/// Use-case service for the `users` collection.
pub struct UserService<S: DocumentStore> {
    store: S,
    page_policy: PagePolicy,
}

impl<S: DocumentStore> UserService<S> {
    pub fn new(store: S, config: &CoreConfig) -> Self {
        Self {
            store,
            page_policy: PagePolicy {
                default_limit: config.default_limit,
                max_limit: config.max_limit,
            },
        }
    }

    /// Creates a user; profile fields are stored as given.
    pub fn create_user(&self, fields: Document) -> CoreResult<User> {
        prepare_new_user(&fields)?;
        let (id, stored) = insert_new(&self.store, Collection::Users, fields)?;
        info!("event=user_create module=service status=ok user={id}");
        decode(Collection::Users, &stored, User::from_document)
    }

    pub fn get_user(&self, id: &str) -> CoreResult<Option<User>> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(Collection::Users, &id)?
            .map(|document| decode(Collection::Users, &document, User::from_document))
            .transpose()
    }

    /// Lists users page by page. `limit < 1` falls back to 10 by default.
    pub fn list_users(&self, filter: &UserFilter, request: PageRequest) -> CoreResult<Page<User>> {
        let predicate = match &filter.role {
            Some(role) => Filter::eq(ROLE_FIELD, role.as_str()),
            None => Filter::All,
        };
        paginate(
            &self.store,
            Collection::Users,
            &predicate,
            request,
            self.page_policy,
        )?
        .try_map(|document| decode(Collection::Users, &document, User::from_document))
    }
}
