use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign},
    str::FromStr,
};

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("Malformed duration {0:?}")]
    Malformed(String),

    #[error("Duration {0:?} is too large")]
    OutOfRange(String),
}

/// Amount of time spent on or estimated for a task. Never negative.
///
/// Durations cross the storage boundary either as ISO-8601 strings (`PT1H2M3.5S`) or as a number
/// of milliseconds. Both are normalized into this type on read, everything past that point only
/// deals with [TrackedDuration].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackedDuration(Duration);

impl TrackedDuration {
    pub const ZERO: TrackedDuration = TrackedDuration(Duration::zero());
    pub const MAX: TrackedDuration = TrackedDuration(Duration::MAX);

    pub const fn from_whole_seconds(s: u32) -> Self {
        Self(Duration::seconds(s as i64))
    }

    /// Values past the largest representable duration are clamped to it.
    pub fn from_millis(ms: u64) -> Self {
        Self::try_from_millis(ms).unwrap_or(Self::MAX)
    }

    /// `None` for values past the largest representable duration.
    pub fn try_from_millis(ms: u64) -> Option<Self> {
        i64::try_from(ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .map(Self)
    }

    /// Fails for values that can't be represented, so input never gets clamped silently.
    pub fn try_from_std(duration: std::time::Duration) -> Result<Self, DurationError> {
        u64::try_from(duration.as_millis())
            .ok()
            .and_then(Self::try_from_millis)
            .ok_or_else(|| DurationError::OutOfRange(format!("{duration:?}")))
    }

    pub fn from_secs(s: u64) -> Self {
        Self::from_millis(s.saturating_mul(1000))
    }

    pub fn from_minutes(m: u64) -> Self {
        Self::from_secs(m.saturating_mul(60))
    }

    pub fn as_chrono(&self) -> Duration {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0.num_milliseconds() as u64
    }

    pub fn as_seconds(&self) -> u64 {
        self.0.num_seconds() as u64
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// In-place accumulation on a caller owned value.
    pub fn accumulate(&mut self, amount: TrackedDuration) {
        *self = *self + amount;
    }

    /// Returns `None` once the value would drop to zero or below. Callers treat that as "entry
    /// exhausted" and remove whatever bucket held the value.
    pub fn subtract(self, amount: TrackedDuration) -> Option<TrackedDuration> {
        let left = self.0 - amount.0;
        if left > Duration::zero() {
            Some(Self(left))
        } else {
            None
        }
    }

    /// Difference that stops at zero.
    pub fn saturating_sub(self, amount: TrackedDuration) -> TrackedDuration {
        self.subtract(amount).unwrap_or(Self::ZERO)
    }

    /// ISO-8601 form used for storage, e.g. `PT1H30M` or `PT0.25S`.
    pub fn to_iso8601(&self) -> String {
        let total_ms = self.as_millis();
        if total_ms == 0 {
            return "PT0S".into();
        }
        let hours = total_ms / 3_600_000;
        let minutes = total_ms / 60_000 % 60;
        let seconds = total_ms / 1000 % 60;
        let millis = total_ms % 1000;

        let mut result = String::from("PT");
        if hours > 0 {
            result += &format!("{hours}H");
        }
        if minutes > 0 {
            result += &format!("{minutes}M");
        }
        if millis > 0 {
            let fraction = format!("{millis:03}");
            result += &format!("{seconds}.{}S", fraction.trim_end_matches('0'));
        } else if seconds > 0 {
            result += &format!("{seconds}S");
        }
        result
    }

    /// Parses the serialized forms accepted from storage: an ISO-8601 duration or a plain integer
    /// number of milliseconds.
    pub fn parse(value: &str) -> Result<Self, DurationError> {
        let value = value.trim();
        if let Ok(ms) = value.parse::<u64>() {
            return Self::try_from_millis(ms)
                .ok_or_else(|| DurationError::OutOfRange(value.to_string()));
        }
        match parse_iso8601(value) {
            Some(ms) if ms <= i64::MAX as f64 => Ok(Self::from_millis(ms as u64)),
            Some(_) => Err(DurationError::OutOfRange(value.to_string())),
            None => Err(DurationError::Malformed(value.to_string())),
        }
    }
}

/// Supports the day/time subset of ISO-8601 (`P1DT2H3M4.5S`, `PT90S`, `-` not allowed). Years,
/// months and weeks are rejected since they don't map to a fixed amount of milliseconds.
fn parse_iso8601(value: &str) -> Option<f64> {
    let rest = value.strip_prefix('P').or_else(|| value.strip_prefix('p'))?;
    if rest.is_empty() {
        return None;
    }

    let mut total_ms: f64 = 0.;
    let mut in_time = false;
    let mut number = String::new();
    let mut seen_component = false;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            unit => {
                let amount: f64 = number.parse().ok()?;
                number.clear();
                let unit_ms = match (in_time, unit) {
                    (false, 'D') => 86_400_000.,
                    (true, 'H') => 3_600_000.,
                    (true, 'M') => 60_000.,
                    (true, 'S') => 1000.,
                    _ => return None,
                };
                total_ms += amount * unit_ms;
                seen_component = true;
            }
        }
    }

    if !number.is_empty() || !seen_component || !total_ms.is_finite() {
        return None;
    }
    Some(total_ms.round())
}

impl FromStr for TrackedDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for TrackedDuration {
    /// Human readable form, `1h5m0s`, `5m12s` or `42s`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = self.0;
        if v.num_hours() > 0 {
            write!(
                f,
                "{}h{}m{}s",
                v.num_hours(),
                v.num_minutes() % 60,
                v.num_seconds() % 60
            )
        } else if v.num_minutes() > 0 {
            write!(f, "{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
        } else {
            write!(f, "{}s", v.num_seconds() % 60)
        }
    }
}

impl Add for TrackedDuration {
    type Output = TrackedDuration;

    /// Saturates at [TrackedDuration::MAX].
    fn add(self, rhs: Self) -> Self::Output {
        self.0.checked_add(&rhs.0).map_or(Self::MAX, Self)
    }
}

impl AddAssign for TrackedDuration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for TrackedDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a TrackedDuration> for TrackedDuration {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for TrackedDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for TrackedDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(u64),
            Fractional(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Self::try_from_millis(ms).ok_or_else(|| {
                serde::de::Error::custom(DurationError::OutOfRange(ms.to_string()))
            }),
            Raw::Fractional(ms) if ms.is_finite() && ms >= 0. && ms <= i64::MAX as f64 => {
                Ok(Self::from_millis(ms.round() as u64))
            }
            Raw::Fractional(ms) => Err(serde::de::Error::custom(DurationError::Malformed(
                ms.to_string(),
            ))),
            Raw::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}
