//! Operator CLI over the core services.
//!
//! # Responsibility
//! - Parse flags, load configuration and bootstrap logging and storage.
//! - Print every result as JSON on stdout.

mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Args, Command, ReportName};
use gestionnaire_core::{
    db, init_logging, BackupService, CoreConfig, ImportBundle, ReportService,
    SqliteDocumentStore,
};
use log::info;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::Path;

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(dir) = args.log_dir {
        config.logging.directory = Some(dir);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging).map_err(|err| anyhow!(err))?;
    info!(
        "event=cli_command module=cli status=start command={}",
        args.command.name()
    );

    let output = match args.command {
        Command::Ping => json!({
            "ping": gestionnaire_core::ping(),
            "version": gestionnaire_core::core_version(),
        }),
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let bundle: ImportBundle = serde_json::from_str(&raw)
                .with_context(|| format!("`{}` is not an import bundle", file.display()))?;
            let conn = open_connection(args.db.as_deref())?;
            let store = SqliteDocumentStore::try_new(&conn)?;
            serde_json::to_value(BackupService::new(store).import_bundle(bundle)?)?
        }
        Command::Stats => {
            let conn = open_connection(args.db.as_deref())?;
            let store = SqliteDocumentStore::try_new(&conn)?;
            serde_json::to_value(ReportService::new(store, &config).collection_counts()?)?
        }
        Command::Report { name } => {
            let conn = open_connection(args.db.as_deref())?;
            let store = SqliteDocumentStore::try_new(&conn)?;
            run_report(&ReportService::new(store, &config), name)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn open_connection(path: Option<&Path>) -> Result<Connection> {
    let conn = match path {
        Some(path) => db::open_db(path)?,
        None => db::open_db_in_memory()?,
    };
    Ok(conn)
}

fn run_report(
    reports: &ReportService<SqliteDocumentStore<'_>>,
    name: ReportName,
) -> Result<Value> {
    let value = match name {
        ReportName::Status => serde_json::to_value(reports.status_counts()?)?,
        ReportName::Assignees => serde_json::to_value(reports.assignee_counts()?)?,
        ReportName::Signups => serde_json::to_value(reports.monthly_user_signups()?)?,
        ReportName::DailyProjects => serde_json::to_value(reports.daily_project_counts()?)?,
        ReportName::TopProjects => serde_json::to_value(reports.top_projects_by_task_count()?)?,
    };
    Ok(value)
}
