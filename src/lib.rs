//! Task list for the day that keeps track of how long every task took.
//!
//! Time goes to the current task, is bucketed by calendar day and rolled up from subtasks into
//! their parent. The work log shows it all per year, month and day.

pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod notify;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod tracker;
pub mod utils;
pub mod worklog;
