//! Weekly Schedule Aggregate
//!
//! Typed form of the merchant's opening hours. The wire format is a JSON
//! object with exactly the seven lowercase English weekday keys:
//!
//! ```json
//! { "monday": { "start": "09:00", "end": "18:00", "isOpen": true }, ... }
//! ```

use chrono::Weekday;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use crate::domain::value_objects::{TimeOfDay, TimeOfDayError};

/// Weekday keys indexed by days from Sunday, so Sunday is index 0.
pub const WEEKDAY_KEYS: [&str; 7] = ["sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DaySchedule {
    start: Option<TimeOfDay>,
    end: Option<TimeOfDay>,
    is_open: bool,
}

impl DaySchedule {
    pub fn open(start: Option<TimeOfDay>, end: Option<TimeOfDay>) -> Self { Self { start, end, is_open: true } }
    pub fn closed() -> Self { Self::default() }

    pub fn is_open(&self) -> bool { self.is_open }
    pub fn start(&self) -> Option<TimeOfDay> { self.start }
    pub fn end(&self) -> Option<TimeOfDay> { self.end }

    /// Opening time, if the day actually opens. An open day without a start never opens.
    pub fn opening(&self) -> Option<TimeOfDay> {
        if self.is_open { self.start } else { None }
    }

    /// Closing time, with a missing end meaning the last minute of the day.
    pub fn closing(&self) -> TimeOfDay { self.end.unwrap_or(TimeOfDay::END_OF_DAY) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl WeeklySchedule {
    /// A schedule with every day closed.
    pub fn closed() -> Self { Self::default() }

    pub fn with_day(mut self, weekday: Weekday, day: DaySchedule) -> Self {
        self.days[weekday.num_days_from_sunday() as usize] = day;
        self
    }

    pub fn day(&self, weekday: Weekday) -> &DaySchedule { &self.days[weekday.num_days_from_sunday() as usize] }

    /// Day by index from Sunday (0 = Sunday, 6 = Saturday), wrapping past 6.
    pub fn day_at(&self, index: usize) -> &DaySchedule { &self.days[index % 7] }

    pub fn has_any_opening(&self) -> bool { self.days.iter().any(|d| d.opening().is_some()) }

    pub fn from_json(raw: &str) -> Result<Self, ScheduleParseError> {
        let mut wire: BTreeMap<String, DayScheduleWire> = serde_json::from_str(raw)?;

        if let Some(unknown) = wire.keys().find(|k| !WEEKDAY_KEYS.contains(&k.as_str())) {
            return Err(ScheduleParseError::UnknownDay(unknown.clone()));
        }

        let mut days = [DaySchedule::default(); 7];
        for (index, &key) in WEEKDAY_KEYS.iter().enumerate() {
            let day = wire.remove(key).ok_or(ScheduleParseError::MissingDay(key))?;
            days[index] = day.into_domain(key)?;
        }
        Ok(Self { days })
    }
}

#[derive(Debug, Deserialize)]
struct DayScheduleWire {
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
    #[serde(rename = "isOpen")]
    is_open: bool,
}

impl DayScheduleWire {
    fn into_domain(self, day: &'static str) -> Result<DaySchedule, ScheduleParseError> {
        // Times on closed days are never read.
        if !self.is_open {
            return Ok(DaySchedule::closed());
        }
        let parse = |value: &str| -> Result<Option<TimeOfDay>, ScheduleParseError> {
            if value.trim().is_empty() {
                return Ok(None);
            }
            TimeOfDay::parse(value).map(Some).map_err(|source| ScheduleParseError::InvalidTime { day, source })
        };
        Ok(DaySchedule::open(parse(&self.start)?, parse(&self.end)?))
    }
}

#[derive(Debug, Error)]
pub enum ScheduleParseError {
    #[error("schedule is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schedule is missing {0}")]
    MissingDay(&'static str),
    #[error("schedule names unknown day {0:?}")]
    UnknownDay(String),
    #[error("{day}: {source}")]
    InvalidTime { day: &'static str, source: TimeOfDayError },
}
