//! Calendar view of all tracked work.
//!
//! The work log is never stored. It's rebuilt from the tasks on every request and borrows them,
//! so it can't outlive a change to the tasks it was built from.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{instrument, warn};

use crate::{
    ids::IdGenerator,
    tasks::{collections::flatten_tasks, model::Task},
    utils::{duration::TrackedDuration, time::parse_day_key},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogEntry<'a> {
    pub task: &'a Task,
    pub time_spent: TrackedDuration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogDay<'a> {
    pub id: String,
    pub date_str: String,
    pub time_spent: TrackedDuration,
    /// In the order the tasks were visited, not by time.
    pub entries: Vec<WorkLogEntry<'a>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogMonth<'a> {
    pub time_spent: TrackedDuration,
    pub entries: BTreeMap<u32, WorkLogDay<'a>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogYear<'a> {
    pub time_spent: TrackedDuration,
    pub entries: BTreeMap<u32, WorkLogMonth<'a>>,
}

/// Year → month → day tree. Every level carries the total of the level below.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct WorkLog<'a> {
    pub years: BTreeMap<i32, WorkLogYear<'a>>,
}

impl<'a> WorkLog<'a> {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn time_spent(&self) -> TrackedDuration {
        self.years.values().map(|v| v.time_spent).sum()
    }

    /// Iterates over all days in calendar order.
    pub fn days(&self) -> impl Iterator<Item = &WorkLogDay<'a>> {
        self.years
            .values()
            .flat_map(|year| year.entries.values())
            .flat_map(|month| month.entries.values())
    }

    /// Keeps the days matching `keep`. Months and years left without days are removed and the
    /// totals of the rest are rolled up again.
    pub fn retain_days(&mut self, mut keep: impl FnMut(&WorkLogDay<'a>) -> bool) {
        for year in self.years.values_mut() {
            for month in year.entries.values_mut() {
                month.entries.retain(|_, day| keep(day));
            }
            year.entries.retain(|_, month| !month.entries.is_empty());
        }
        self.years.retain(|_, year| !year.entries.is_empty());
        self.roll_up_totals();
    }

    fn roll_up_totals(&mut self) {
        for year in self.years.values_mut() {
            for month in year.entries.values_mut() {
                month.time_spent = month.entries.values().map(|v| v.time_spent).sum();
            }
            year.time_spent = year.entries.values().map(|v| v.time_spent).sum();
        }
    }
}

/// Builds the complete work log of the given tasks.
///
/// Parents are replaced by their subtasks first, otherwise the parent rollups would be counted on
/// top of the subtasks' own time.
#[instrument(skip_all)]
pub fn get_complete_work_log<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    ids: &dyn IdGenerator,
) -> WorkLog<'a> {
    let mut work_log = WorkLog::default();

    for task in flatten_tasks(tasks) {
        for (date_str, spent) in &task.time_spent_on_day {
            if spent.is_zero() {
                continue;
            }
            let Some((year, month, day)) = parse_day_key(date_str) else {
                warn!("Skipping illegal day {date_str:?} of task {}", task.id);
                continue;
            };

            let day = work_log
                .years
                .entry(year)
                .or_default()
                .entries
                .entry(month)
                .or_default()
                .entries
                .entry(day)
                .or_insert_with(|| WorkLogDay {
                    id: ids.next_id(),
                    date_str: date_str.clone(),
                    time_spent: TrackedDuration::ZERO,
                    entries: vec![],
                });
            day.time_spent += *spent;
            day.entries.push(WorkLogEntry {
                task,
                time_spent: *spent,
            });
        }
    }

    // Totals are rolled up once all days are complete.
    work_log.roll_up_totals();
    work_log
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{
        ids::SequentialIds,
        tasks::model::Task,
        utils::duration::TrackedDuration,
    };

    use super::get_complete_work_log;

    fn with_days(task: Task, days: &[(&str, u64)]) -> Task {
        let mut task = task;
        for (day, secs) in days {
            task.time_spent_on_day
                .insert(day.to_string(), TrackedDuration::from_secs(*secs));
        }
        task
    }

    #[test]
    fn test_work_log_structure() {
        let sub_a = with_days(Task::new("a", "A"), &[("2024-01-01", 60), ("2024-02-03", 30)]);
        let sub_b = with_days(Task::new("b", "B"), &[("2024-01-01", 40)]);
        let mut parent = Task::new("p", "Parent").with_sub_tasks([sub_a, sub_b]);
        // rollup that must not be counted again
        parent = with_days(parent, &[("2024-01-01", 100), ("2024-02-03", 30)]);
        let single = with_days(Task::new("s", "Single"), &[("2023-12-31", 10)]);
        let tasks = vec![parent, single];

        let ids = SequentialIds::default();
        let log = get_complete_work_log(&tasks, &ids);

        assert_eq!(log.years.len(), 2);
        assert_eq!(log.time_spent(), TrackedDuration::from_secs(140));

        let y2024 = &log.years[&2024];
        assert_eq!(y2024.time_spent, TrackedDuration::from_secs(130));
        assert_eq!(y2024.entries[&1].time_spent, TrackedDuration::from_secs(100));
        assert_eq!(y2024.entries[&2].time_spent, TrackedDuration::from_secs(30));

        let day = &y2024.entries[&1].entries[&1];
        assert_eq!(day.date_str, "2024-01-01");
        let titles = day.entries.iter().map(|v| v.task.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, ["A", "B"]);

        let day_ids = log.days().map(|v| v.id.clone()).collect::<Vec<_>>();
        assert_eq!(day_ids.len(), 3);
        assert!(day_ids.iter().all(|v| !v.is_empty()));
    }

    #[test]
    fn test_retain_days_rolls_up_again() {
        let tasks = vec![
            with_days(Task::new("a", "A"), &[("2023-12-31", 10), ("2024-01-01", 60), ("2024-01-02", 20)]),
            with_days(Task::new("b", "B"), &[("2024-02-03", 30)]),
        ];
        let ids = SequentialIds::default();
        let mut log = get_complete_work_log(&tasks, &ids);

        log.retain_days(|v| v.date_str.as_str() >= "2024-01-02");

        assert_eq!(log.years.len(), 1);
        assert_eq!(log.time_spent(), TrackedDuration::from_secs(50));
        let y2024 = &log.years[&2024];
        assert_eq!(y2024.time_spent, TrackedDuration::from_secs(50));
        assert_eq!(y2024.entries[&1].time_spent, TrackedDuration::from_secs(20));
        assert_eq!(y2024.entries[&1].entries.len(), 1);

        log.retain_days(|_| false);
        assert!(log.is_empty());
    }

    #[test]
    fn test_empty_work_log() {
        let tasks = Vec::<Task>::new();
        let ids = SequentialIds::default();
        let log = get_complete_work_log(&tasks, &ids);
        assert!(log.is_empty());
        assert_eq!(log.time_spent(), TrackedDuration::ZERO);
    }

    proptest! {
        #[test]
        fn prop_levels_sum_up(
            entries in prop::collection::vec(
                (0usize..5, 2020i32..2023, 1u32..13, 1u32..29, 1u64..10_000),
                0..60,
            )
        ) {
            let mut tasks = (0..5).map(|i| Task::new(i.to_string(), format!("Task {i}"))).collect::<Vec<_>>();
            for (task, year, month, day, secs) in entries {
                tasks[task]
                    .time_spent_on_day
                    .entry(format!("{year:04}-{month:02}-{day:02}"))
                    .or_default()
                    .accumulate(TrackedDuration::from_secs(secs));
            }

            let log = get_complete_work_log(&tasks, &SequentialIds::default());
            for year in log.years.values() {
                let months: TrackedDuration = year.entries.values().map(|v| v.time_spent).sum();
                prop_assert_eq!(year.time_spent, months);
                for month in year.entries.values() {
                    let days: TrackedDuration = month.entries.values().map(|v| v.time_spent).sum();
                    prop_assert_eq!(month.time_spent, days);
                    for day in month.entries.values() {
                        let spent: TrackedDuration = day.entries.iter().map(|v| v.time_spent).sum();
                        prop_assert_eq!(day.time_spent, spent);
                    }
                }
            }

            let all: TrackedDuration = tasks.iter().flat_map(|v| v.time_spent_on_day.values()).sum();
            prop_assert_eq!(log.time_spent(), all);
        }
    }
}
