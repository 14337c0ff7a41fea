mod assist;
mod cli;
mod commands;
mod config;
mod filter;
mod logging;
mod model;
mod storage;
mod timeline;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    let config = config::load_config(args.config.as_deref())?;

    let interactive = matches!(command, cli::Command::Tui);
    if let Err(err) = storage::data_dir().and_then(|dir| {
        logging::enable_logging(
            &dir,
            config.logging.level.as_deref(),
            args.verbose && !interactive,
        )
    }) {
        eprintln!("warning: logging disabled: {:#}", err);
    }

    match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::Log(cmd) => commands::log(cmd, &config),
        cli::Command::Report(cmd) => commands::report(cmd, &config),
        cli::Command::Project(cmd) => commands::project(cmd),
        cli::Command::Timeline { width } => commands::timeline(width),
        cli::Command::Summarize { week, month } => commands::summarize(week, month, &config),
        cli::Command::Stats => commands::stats(),
        cli::Command::Tui => commands::tui(),
    }
}
