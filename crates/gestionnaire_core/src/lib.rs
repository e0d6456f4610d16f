//! Query and consistency core for the project/task manager.
//! This crate owns reference resolution, pagination, reporting and the
//! atomic project + first task write over the document store.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, LoggingConfig};
pub use error::{CoreError, CoreResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::Document;
pub use model::object_id::ObjectId;
pub use model::project::Project;
pub use model::project_ref::ProjectRef;
pub use model::task::Task;
pub use model::user::User;
pub use query::pagination::{Page, PageRequest};
pub use query::resolver::ProjectRefResolver;
pub use repo::document_store::{
    Collection, DocumentStore, FindQuery, SqliteDocumentStore, StoreError, StoreResult,
};
pub use repo::filter::Filter;
pub use service::backup_service::{
    BackupOutcome, BackupService, BackupSnapshot, ExportSink, ImportBundle, ImportSummary,
};
pub use service::project_service::{CreatedProjectWithTask, ProjectService};
pub use service::report_service::ReportService;
pub use service::task_service::{TaskFilter, TaskService};
pub use service::user_service::{UserFilter, UserService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
