use chrono::{Datelike, NaiveDate};

/// Format of the keys in `Task::time_spent_on_day`. Sortable as plain strings.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a work log day key in worktally.
pub fn date_to_day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Splits a `YYYY-MM-DD` day key into its calendar parts. Returns `None` for keys that aren't
/// valid calendar dates.
pub fn parse_day_key(key: &str) -> Option<(i32, u32, u32)> {
    let date = NaiveDate::parse_from_str(key, DAY_KEY_FORMAT).ok()?;
    Some((date.year(), date.month(), date.day()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_to_day_key, parse_day_key};

    #[test]
    fn test_day_key_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(date_to_day_key(date), "2024-01-05");
        assert_eq!(parse_day_key("2024-01-05"), Some((2024, 1, 5)));
    }

    #[test]
    fn test_invalid_day_key() {
        assert_eq!(parse_day_key("2024-13-05"), None);
        assert_eq!(parse_day_key("yesterday"), None);
    }
}
