use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gestionnaire",
    version,
    about = "Operator tool for the project/task store",
    after_help = r#"Examples:
  gestionnaire ping
  gestionnaire --db data.sqlite import seed.json
  gestionnaire --db data.sqlite stats
  gestionnaire --db data.sqlite report top-projects
"#
)]
pub struct Args {
    /// SQLite database file; a throwaway in-memory database when omitted.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Write rotating logs to this absolute directory instead of stderr.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
    /// Overrides the configured log level.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print core liveness and version.
    Ping,
    /// Import a `{users, projets, taches}` JSON bundle.
    Import { file: PathBuf },
    /// Print document totals per collection.
    Stats,
    /// Run a named report.
    Report {
        #[arg(value_enum)]
        name: ReportName,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Import { .. } => "import",
            Self::Stats => "stats",
            Self::Report { .. } => "report",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportName {
    Status,
    Assignees,
    Signups,
    DailyProjects,
    TopProjects,
}
