use std::{fmt::Display, path::Path};

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    ids::UuidIds,
    storage::{json_storage::JsonTaskStorage, TaskStorage},
    utils::{dir::TASKS_DIR, duration::TrackedDuration, time::DAY_KEY_FORMAT},
    worklog::{get_complete_work_log, WorkLog, WorkLogDay},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct WorklogCommand {
    #[arg(
        long = "from",
        short,
        help = "First day shown. Examples are \"yesterday\", \"last monday\", \"15/03/2025\""
    )]
    from_date: Option<String>,
    #[arg(
        long = "to",
        short,
        help = "Last day shown. Examples are \"today\", \"2 days ago\", \"15/03/2025\""
    )]
    to_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, help = "Print tasks worked on each day")]
    tasks: bool,
    #[arg(long, help = "Print the work log as json")]
    json: bool,
}

/// Days shown in the work log. Whole days, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DayRange {
    from: Option<DateTime<Local>>,
    to: Option<DateTime<Local>>,
}

impl DayRange {
    fn contains(&self, day: NaiveDate) -> bool {
        let Some(start) = day
            .and_hms_opt(0, 0, 0)
            .and_then(|v| v.and_local_timezone(Local).earliest())
        else {
            return false;
        };
        self.from.map_or(true, |v| v <= start) && self.to.map_or(true, |v| start <= v)
    }
}

pub async fn process_worklog_command(
    WorklogCommand {
        from_date,
        to_date,
        date_style,
        tasks,
        json,
    }: WorklogCommand,
    app_dir: &Path,
) -> Result<()> {
    let range = parse_range(from_date, to_date, date_style, Local::now())?;

    let storage = JsonTaskStorage::new(app_dir.join(TASKS_DIR))?;
    let (collections, _) = storage.load().await?;
    let work_log = get_complete_work_log(collections.get_all_tasks(), &UuidIds);

    if json {
        println!("{}", work_log_json(work_log, range)?);
        return Ok(());
    }
    print_work_log(&work_log, range, tasks);
    Ok(())
}

fn work_log_json(mut work_log: WorkLog, range: DayRange) -> Result<String> {
    work_log.retain_days(|v| day_date(v).is_some_and(|date| range.contains(date)));
    Ok(serde_json::to_string_pretty(&work_log)?)
}

fn parse_date(
    value: Option<String>,
    now: DateTime<Local>,
    dialect: chrono_english::Dialect,
    name: &str,
) -> Result<Option<DateTime<Local>>> {
    match value.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => Ok(Some(v.with_timezone(&Local))),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
        None => Ok(None),
    }
}

fn parse_range(
    from_date: Option<String>,
    to_date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DayRange> {
    let dialect: chrono_english::Dialect = date_style.into();
    let from = parse_date(from_date, now, dialect, "from")?;
    let to = parse_date(to_date, now, dialect, "to")?;
    Ok(DayRange {
        from: from.map(|v| v.beginning_of_day()),
        to: to.map(|v| v.end_of_day()),
    })
}

fn day_date(day: &WorkLogDay) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&day.date_str, DAY_KEY_FORMAT).ok()
}

fn print_work_log(work_log: &WorkLog, range: DayRange, show_tasks: bool) {
    let days = work_log
        .days()
        .filter(|v| day_date(v).is_some_and(|date| range.contains(date)))
        .collect::<Vec<_>>();
    if days.is_empty() {
        println!("Nothing tracked");
        return;
    }

    let mut total = TrackedDuration::ZERO;
    for day in days {
        total += day.time_spent;
        println!(
            "{}\t{}",
            Style::new().bold().paint(day.date_str.as_str()),
            day.time_spent
        );
        if show_tasks {
            for entry in &day.entries {
                println!("\t{}\t{}", entry.time_spent, entry.task.title);
            }
        }
    }
    println!("Total\t{}", Colour::Cyan.bold().paint(total.to_string()));
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};
    use serde_json::Value;

    use crate::{
        ids::SequentialIds, tasks::model::Task, utils::duration::TrackedDuration,
        worklog::get_complete_work_log,
    };

    use super::{parse_range, work_log_json, DateStyle};

    #[test]
    fn test_json_follows_range() {
        let mut task = Task::new("a", "A");
        for (day, secs) in [("2025-03-14", 60), ("2025-03-15", 120), ("2025-04-01", 30)] {
            task.time_spent_on_day
                .insert(day.into(), TrackedDuration::from_secs(secs));
        }
        let tasks = vec![task];
        let ids = SequentialIds::default();
        let now = Local.with_ymd_and_hms(2025, 3, 16, 15, 0, 0).unwrap();
        let range = parse_range(
            Some("15/03/2025".into()),
            Some("31/03/2025".into()),
            DateStyle::Uk,
            now,
        )
        .unwrap();

        let json = work_log_json(get_complete_work_log(&tasks, &ids), range).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        let months = value["2025"]["entries"].as_object().unwrap();
        assert_eq!(months.keys().collect::<Vec<_>>(), ["3"]);
        let days = months["3"]["entries"].as_object().unwrap();
        assert_eq!(days.keys().collect::<Vec<_>>(), ["15"]);
        assert_eq!(
            value["2025"]["timeSpent"],
            Value::from(TrackedDuration::from_secs(120).to_iso8601())
        );
    }

    #[test]
    fn test_parse_range() {
        let now = Local.with_ymd_and_hms(2025, 3, 16, 15, 0, 0).unwrap();
        let range = parse_range(
            Some("yesterday".into()),
            Some("16/03/2025".into()),
            DateStyle::Uk,
            now,
        )
        .unwrap();
        assert_eq!(
            range.from,
            Some(Local.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap())
        );
        assert!(range.contains(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 3, 17).unwrap()));

        assert!(parse_range(Some("whenever".into()), None, DateStyle::Uk, now).is_err());
    }

    #[test]
    fn test_open_range() {
        let now = Local.with_ymd_and_hms(2025, 3, 16, 15, 0, 0).unwrap();
        let range = parse_range(None, None, DateStyle::Us, now).unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()));
    }
}
