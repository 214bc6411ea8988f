use std::{fmt::Display, ops::Deref};

use serde::{Deserialize, Deserializer, Serialize};

use super::duration::TrackedDuration;

/// Progress of a task against its estimate, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Percentage(u8);

impl<'de> Deserialize<'de> for Percentage {
    /// Older data may carry fractional progress, it's floored like freshly computed values.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if !(0. ..=100.).contains(&value) {
            return Err(serde::de::Error::custom(format!(
                "Progress {value} is outside of 0..=100"
            )));
        }
        Ok(Percentage(value.floor() as u8))
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: u64) -> Option<Percentage> {
        if value > 100 {
            None
        } else {
            Some(Percentage(value as u8))
        }
    }
}

impl Deref for Percentage {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `floor(spent_seconds / estimate_seconds * 100)`, computed on whole seconds and capped at 100.
/// An estimate below one second has no meaningful progress and yields `None`.
pub fn duration_percentage(value: TrackedDuration, whole: TrackedDuration) -> Option<Percentage> {
    let whole = whole.as_seconds();
    if whole == 0 {
        return None;
    }
    let ratio = value.as_seconds().saturating_mul(100) / whole;
    Percentage::new_opt(ratio.min(100))
}

#[cfg(test)]
mod tests {
    use crate::utils::duration::TrackedDuration;

    use super::{duration_percentage, Percentage};

    #[test]
    fn test_percentage_floors() {
        let spent = TrackedDuration::from_secs(2);
        let estimate = TrackedDuration::from_secs(3);
        assert_eq!(duration_percentage(spent, estimate), Percentage::new_opt(66));
    }

    #[test]
    fn test_percentage_zero_estimate() {
        assert_eq!(
            duration_percentage(TrackedDuration::from_secs(10), TrackedDuration::ZERO),
            None
        );
        assert_eq!(
            duration_percentage(TrackedDuration::from_secs(10), TrackedDuration::from_millis(900)),
            None
        );
    }

    #[test]
    fn test_percentage_capped() {
        let spent = TrackedDuration::from_minutes(90);
        let estimate = TrackedDuration::from_minutes(60);
        assert_eq!(duration_percentage(spent, estimate), Percentage::new_opt(100));
    }

    #[test]
    fn test_stored_progress() {
        let values: Vec<Percentage> = serde_json::from_str("[33, 66.7, 100]").unwrap();
        assert_eq!(values, [33, 66, 100].map(|v| Percentage::new_opt(v).unwrap()));
        assert!(serde_json::from_str::<Percentage>("101").is_err());
    }
}
