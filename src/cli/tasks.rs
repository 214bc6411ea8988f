use std::path::Path;

use ansi_term::{Colour, Style};
use anyhow::{anyhow, bail, Result};
use clap::Subcommand;

use crate::{
    config::Config,
    ids::UuidIds,
    notify::ConsoleNotifier,
    session::SessionController,
    storage::{json_storage::JsonTaskStorage, TaskStorage},
    tasks::{
        attribution::{calc_remaining_time, calc_total_estimate},
        collections::flatten_tasks,
        model::{NewTask, Task, TaskId},
    },
    utils::{clock::DefaultClock, dir::TASKS_DIR, duration::TrackedDuration},
};

const SHORT_ID_LENGTH: usize = 8;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    #[command(about = "Add a task for today")]
    Add {
        title: String,
        #[arg(short, long, value_parser = parse_cli_duration, help = "Estimate, e.g. \"30m\", \"1h30m\" or \"PT2H\". Plain numbers are minutes")]
        estimate: Option<TrackedDuration>,
        #[arg(short, long, help = "Id of the parent task, the new task becomes its subtask")]
        parent: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        #[arg(long = "spent", value_parser = parse_cli_duration, help = "Time already spent on the task")]
        time_spent: Option<TrackedDuration>,
        #[arg(long, help = "Make the new task the current one")]
        start: bool,
    },
    #[command(about = "Make a task the current one. Tracked time goes to the current task")]
    Start { id: String },
    #[command(about = "Stop tracking the current task")]
    Stop,
    #[command(about = "Add time spent today to a task, or remove it")]
    Spend {
        id: String,
        #[arg(value_parser = parse_cli_duration)]
        duration: TrackedDuration,
        #[arg(long, help = "Remove the time instead of adding it")]
        remove: bool,
    },
    #[command(about = "Mark a task as done")]
    Done {
        id: String,
        #[arg(long, help = "Mark the task as not done instead")]
        undo: bool,
    },
    #[command(about = "Show today's tasks and the time worked on them")]
    Status {
        #[arg(short, long, help = "Also show the backlog")]
        all: bool,
    },
    #[command(about = "Finish the day. Done tasks go to the done backlog")]
    FinishDay {
        #[arg(long, help = "Leave done tasks in today instead of moving them to the done backlog")]
        keep_done: bool,
        #[arg(long, help = "Leave unfinished tasks in today instead of moving them to the backlog")]
        keep_unfinished: bool,
    },
}

/// Accepts durations the way people type them. `90` is minutes, `1h 30m`, `1d` and anything else
/// humantime understands work, as does ISO-8601 (`PT1H30M`).
pub fn parse_cli_duration(value: &str) -> Result<TrackedDuration> {
    let value = value.trim();
    if let Ok(minutes) = value.parse::<u64>() {
        return minutes
            .checked_mul(60_000)
            .and_then(TrackedDuration::try_from_millis)
            .ok_or_else(|| anyhow!("{value} minutes is too long"));
    }
    if value.starts_with(['P', 'p']) {
        return Ok(TrackedDuration::parse(value)?);
    }
    let duration = humantime::parse_duration(value)
        .map_err(|e| anyhow!("Can't read {value:?} as a duration ({e}), try something like 1h30m"))?;
    Ok(TrackedDuration::try_from_std(duration)?)
}

pub async fn process_task_command(command: TaskCommand, app_dir: &Path, config: &Config) -> Result<()> {
    let storage = JsonTaskStorage::new(app_dir.join(TASKS_DIR))?;
    let (collections, current) = storage.load().await?;
    let mut session = SessionController::new(
        collections,
        current,
        config,
        Box::new(DefaultClock),
        Box::new(UuidIds),
        Box::new(ConsoleNotifier),
    );

    if apply_task_command(&mut session, command)? {
        storage
            .save(session.collections(), session.current_id())
            .await?;
    }
    Ok(())
}

/// Runs the command against the session and prints the result. Returns whether anything changed.
pub fn apply_task_command(session: &mut SessionController, command: TaskCommand) -> Result<bool> {
    match command {
        TaskCommand::Add {
            title,
            estimate,
            parent,
            notes,
            time_spent,
            start,
        } => {
            let parent_id = parent.map(|v| resolve_id(session, &v)).transpose()?;
            let id = session.add_task(NewTask {
                title,
                notes,
                parent_id,
                time_estimate: estimate,
                time_spent,
            })?;
            if start {
                session.update_current(Some(&id))?;
            }
            println!("Added {}", short_id(&id));
        }
        TaskCommand::Start { id } => {
            let id = resolve_id(session, &id)?;
            if let Some(task) = session.update_current(Some(&id))? {
                println!("Tracking {}", task.title);
            }
        }
        TaskCommand::Stop => {
            session.update_current(None)?;
            println!("Stopped tracking");
        }
        TaskCommand::Spend {
            id,
            duration,
            remove,
        } => {
            let id = resolve_id(session, &id)?;
            let task = if remove {
                session.remove_time_spent(&id, duration)?
            } else {
                session.add_time_spent(&id, duration)?
            };
            println!(
                "{}: {} spent",
                task.title,
                task.time_spent.unwrap_or_default()
            );
        }
        TaskCommand::Done { id, undo } => {
            let id = resolve_id(session, &id)?;
            let task = session.set_done(&id, !undo)?;
            let state = if task.is_done { "done" } else { "not done" };
            println!("{} is {state}", task.title);
        }
        TaskCommand::Status { all } => {
            print_status(session, all);
            return Ok(false);
        }
        TaskCommand::FinishDay {
            keep_done,
            keep_unfinished,
        } => {
            let worked = session
                .collections()
                .get_time_worked_today(session.clock().today())
                .unwrap_or_default();
            session.finish_day(!keep_done, !keep_unfinished);
            println!("Day finished, worked {}", paint_total(worked));
        }
    }
    Ok(true)
}

/// Full ids are uuids, so any unambiguous prefix is accepted.
fn resolve_id(session: &SessionController, input: &str) -> Result<TaskId> {
    let collections = session.collections();
    if let Some(task) = collections.get_by_id(&TaskId::from(input)) {
        return Ok(task.id.clone());
    }

    let matching = collections
        .get_all_tasks()
        .flat_map(|v| std::iter::once(v).chain(v.sub_tasks.iter()))
        .filter(|v| v.id.as_str().starts_with(input))
        .map(|v| &v.id)
        .collect::<Vec<_>>();
    match matching.as_slice() {
        [] => bail!("No task with id {input:?}"),
        [first, rest @ ..] if rest.iter().all(|v| v == first) => Ok((*first).clone()),
        _ => bail!("{} tasks start with {input:?}, use a longer id", matching.len()),
    }
}

fn short_id(id: &TaskId) -> &str {
    let id = id.as_str();
    id.char_indices()
        .nth(SHORT_ID_LENGTH)
        .map_or(id, |(i, _)| &id[..i])
}

fn paint_total(duration: TrackedDuration) -> ansi_term::ANSIString<'static> {
    Colour::Cyan.bold().paint(duration.to_string())
}

fn print_status(session: &SessionController, all: bool) {
    let collections = session.collections();
    let today = session.clock().today();

    let worked = collections.get_time_worked_today(today).unwrap_or_default();
    let undone = collections.get_undone_today(true);
    print!("Today {}  worked {}", today, paint_total(worked));
    if let Some(remaining) = calc_remaining_time(undone.iter().copied()) {
        print!("  remaining {}", paint_total(remaining));
    }
    if let Some(estimate) = calc_total_estimate(flatten_tasks(collections.get_today())) {
        print!("  estimated {}", estimate);
    }
    println!();

    if collections.get_today().is_empty() {
        println!("No tasks for today");
    }
    for task in collections.get_today() {
        print_task(session, task, 0);
    }

    if let Some(current) = session.get_current() {
        println!("\nCurrently tracking {}", Style::new().bold().paint(&current.title));
    }

    if all {
        println!("\nBacklog");
        for task in collections.get_backlog() {
            print_task(session, task, 0);
        }
    }
}

fn print_task(session: &SessionController, task: &Task, depth: usize) {
    let is_current = session.current_id() == Some(&task.id);
    let marker = if is_current { "*" } else if task.is_done { "x" } else { " " };
    let title = if task.is_done {
        Colour::Green.paint(task.title.as_str())
    } else if is_current {
        Style::new().bold().paint(task.title.as_str())
    } else {
        Style::new().paint(task.title.as_str())
    };

    let mut line = format!(
        "{:indent$}[{marker}] {} {title}  {}",
        "",
        Colour::Fixed(244).paint(short_id(&task.id)),
        task.time_spent.unwrap_or_default(),
        indent = depth * 2,
    );
    if let Some(estimate) = task.time_estimate {
        line.push_str(&format!(" / {estimate}"));
    }
    if let Some(progress) = task.progress {
        line.push_str(&format!("  {progress}"));
    }
    println!("{line}");

    for sub_task in &task.sub_tasks {
        print_task(session, sub_task, depth + 1);
    }
}
