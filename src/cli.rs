use crate::model::{LogCategory, ProjectStatus, ReportStatus};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "internlog", version, about = "Internship activity tracker")]
pub struct Cli {
    /// Also print diagnostics to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a tracker in the current directory
    Init {
        /// Optional tracker name
        #[arg(long)]
        name: Option<String>,
    },
    /// Daily activity logs
    #[command(subcommand)]
    Log(LogCommand),
    /// Monthly reports
    #[command(subcommand)]
    Report(ReportCommand),
    /// Projects and deliverables
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Print the project timeline
    Timeline {
        /// Width of the text bars
        #[arg(long, default_value_t = 60)]
        width: u16,
    },
    /// Summarize logs with the text assistant
    Summarize {
        /// Only the trailing week
        #[arg(long)]
        week: bool,
        /// Only one month (YYYY-MM)
        #[arg(long, conflicts_with = "week")]
        month: Option<String>,
    },
    /// Show totals for logs, reports and projects
    Stats,
    /// Launch the interactive timeline viewer
    Tui,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive text search
    #[arg(long, short)]
    pub search: Option<String>,
    /// Only records carrying this tag
    #[arg(long, short)]
    pub tag: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// Record a day's activity
    Add {
        /// Short title
        title: String,
        /// Date in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// What was done
        #[arg(long, short, default_value = "")]
        description: String,
        #[arg(long, short, value_enum, default_value_t = LogCategory::Development)]
        category: LogCategory,
        /// Hours spent
        #[arg(long, default_value_t = 8.0)]
        hours: f32,
        /// Tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// What was learned
        #[arg(long)]
        learnings: Option<String>,
    },
    /// List logs, newest last
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, short, value_enum)]
        category: Option<LogCategory>,
        /// Only the trailing week
        #[arg(long, short)]
        week: bool,
    },
    /// Edit a log entry
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, value_enum)]
        category: Option<LogCategory>,
        #[arg(long)]
        hours: Option<f32>,
        /// Replace tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        #[arg(long)]
        clear_tags: bool,
        #[arg(long)]
        learnings: Option<String>,
    },
    /// Delete a log entry
    Remove { id: String },
    /// Rewrite a field with the text assistant
    Improve {
        id: String,
        #[arg(long, value_enum, default_value_t = LogField::Description)]
        field: LogField,
        /// Print the suggestion without saving it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogField {
    Description,
    Learnings,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Create a monthly report
    Add {
        /// Month in YYYY-MM format
        month: String,
        title: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long)]
        achievements: Option<String>,
        #[arg(long)]
        challenges: Option<String>,
        #[arg(long)]
        next_steps: Option<String>,
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// Fill the summary from the month's logs
        #[arg(long)]
        generate: bool,
    },
    /// List reports
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum)]
        status: Option<ReportStatus>,
    },
    /// Edit a report
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        achievements: Option<String>,
        #[arg(long)]
        challenges: Option<String>,
        #[arg(long)]
        next_steps: Option<String>,
        #[arg(long, value_enum)]
        status: Option<ReportStatus>,
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        #[arg(long)]
        clear_tags: bool,
    },
    /// Delete a report
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Add a project
    Add {
        name: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t = ProjectStatus::Planned)]
        status: ProjectStatus,
        /// Start date in YYYY-MM-DD format
        #[arg(long)]
        start: Option<String>,
        /// End date in YYYY-MM-DD format
        #[arg(long)]
        end: Option<String>,
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
    },
    /// List projects
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum)]
        status: Option<ProjectStatus>,
    },
    /// Edit a project
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, value_enum)]
        status: Option<ProjectStatus>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        clear_end: bool,
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        #[arg(long)]
        clear_tags: bool,
    },
    /// Delete a project
    Remove { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_list_filters() {
        let cli = Cli::parse_from([
            "internlog", "log", "list", "--search", "api", "--tag", "bug", "--category",
            "meeting", "--week",
        ]);
        match cli.command {
            Some(Command::Log(LogCommand::List {
                filter,
                category,
                week,
            })) => {
                assert_eq!(filter.search.as_deref(), Some("api"));
                assert_eq!(filter.tag.as_deref(), Some("bug"));
                assert_eq!(category, Some(LogCategory::Meeting));
                assert!(week);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn project_status_uses_kebab_case() {
        let cli = Cli::parse_from([
            "internlog",
            "project",
            "add",
            "Dashboard",
            "--status",
            "in-progress",
            "--start",
            "2024-06-01",
        ]);
        match cli.command {
            Some(Command::Project(ProjectCommand::Add { status, start, .. })) => {
                assert_eq!(status, ProjectStatus::InProgress);
                assert_eq!(start.as_deref(), Some("2024-06-01"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn summarize_week_and_month_conflict() {
        let res = Cli::try_parse_from(["internlog", "summarize", "--week", "--month", "2024-06"]);
        assert!(res.is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
