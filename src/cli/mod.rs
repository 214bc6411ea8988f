pub mod tasks;
pub mod worklog;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tasks::{process_task_command, TaskCommand};
use tracing::level_filters::LevelFilter;
use worklog::{process_worklog_command, WorklogCommand};

use crate::{
    config::{load_config, Config, CONFIG_FILE_NAME},
    tracker::start_tracker,
    utils::{
        dir::{create_application_default_path, LOGS_DIR},
        logging::{enable_logging, CLI_PREFIX, TRACKER_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Worktally", version, long_about = None)]
#[command(about = "Task list for the day that tracks the time you spend on each task", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Tasks(TaskCommand),
    #[command(about = "Show the work log, time worked per day")]
    Worklog {
        #[command(flatten)]
        command: WorklogCommand,
    },
    #[command(about = "Track time on the current task until ctrl-c or quit")]
    Track,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Track => TRACKER_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir.join(LOGS_DIR), logging_level, args.log)?;

    let config = read_config(&app_dir).await?;

    match args.commands {
        Commands::Tasks(command) => process_task_command(command, &app_dir, &config).await,
        Commands::Worklog { command } => process_worklog_command(command, &app_dir).await,
        Commands::Track => start_tracker(&app_dir, &config).await,
    }
}

async fn read_config(app_dir: &Path) -> Result<Config> {
    Ok(load_config(&app_dir.join(CONFIG_FILE_NAME)).await?)
}
