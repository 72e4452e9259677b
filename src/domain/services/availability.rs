//! Store availability
//!
//! Decides from a [`WeeklySchedule`] whether a store is open at a given
//! instant in the merchant's timezone and, when it is not, when it opens next.
//! Never fails: a schedule that cannot be read yields a closed verdict.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::aggregates::schedule::WeeklySchedule;
use crate::domain::value_objects::TimeOfDay;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    OpenUntil(TimeOfDay),
    OpensToday(TimeOfDay),
    OpensLater { weekday: Weekday, days_ahead: u32, at: TimeOfDay },
    ClosedIndefinitely,
    /// The merchant switched the store off, whatever the schedule says.
    ClosedByMerchant,
    /// The stored schedule could not be parsed.
    HoursUnavailable,
    /// The merchant never configured a schedule.
    HoursNotSet,
}

impl Availability {
    pub fn is_open(&self) -> bool { matches!(self, Self::OpenUntil(_)) }

    pub fn to_status(&self) -> StoreStatus { StoreStatus { is_open: self.is_open(), message: self.to_string() } }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenUntil(end) => write!(f, "Open until {end}"),
            Self::OpensToday(start) => write!(f, "Opens today at {start}"),
            Self::OpensLater { days_ahead: 1, at, .. } => write!(f, "Opens tomorrow at {at}"),
            Self::OpensLater { weekday, at, .. } => write!(f, "Opens {} at {at}", weekday_name(*weekday)),
            Self::ClosedIndefinitely => f.write_str("Closed indefinitely"),
            Self::ClosedByMerchant => f.write_str("Closed"),
            Self::HoursUnavailable => f.write_str("Hours unavailable"),
            Self::HoursNotSet => f.write_str("Hours not set"),
        }
    }
}

/// Verdict as shown to the customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub is_open: bool,
    pub message: String,
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// `now` must already be expressed in the merchant's timezone.
pub fn evaluate<Tz: TimeZone>(schedule: &WeeklySchedule, now: &DateTime<Tz>) -> Availability {
    if !schedule.has_any_opening() {
        return Availability::ClosedIndefinitely;
    }
    let today_weekday = now.weekday();
    let minute = now.hour() * 60 + now.minute();
    let today = schedule.day(today_weekday);

    if let Some(start) = today.opening() {
        if start.minutes() <= minute && minute < today.closing().minutes() {
            return Availability::OpenUntil(today.closing());
        }
        if minute < start.minutes() {
            return Availability::OpensToday(start);
        }
    }

    let mut weekday = today_weekday;
    for days_ahead in 1..=7 {
        weekday = weekday.succ();
        if let Some(at) = schedule.day(weekday).opening() {
            return Availability::OpensLater { weekday, days_ahead, at };
        }
    }
    Availability::ClosedIndefinitely
}

pub fn status<Tz: TimeZone>(schedule: &WeeklySchedule, now: &DateTime<Tz>) -> StoreStatus { evaluate(schedule, now).to_status() }

/// Evaluate a stored schedule payload.
pub fn evaluate_json<Tz: TimeZone>(raw: &str, now: &DateTime<Tz>) -> Availability {
    match WeeklySchedule::from_json(raw) {
        Ok(schedule) => evaluate(&schedule, now),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable store schedule");
            Availability::HoursUnavailable
        }
    }
}

pub fn status_from_json<Tz: TimeZone>(raw: &str, now: &DateTime<Tz>) -> StoreStatus { evaluate_json(raw, now).to_status() }

/// Like [`status_from_json`], with a missing schedule reported as not set.
pub fn status_of<Tz: TimeZone>(raw: Option<&str>, now: &DateTime<Tz>) -> StoreStatus {
    match raw {
        None => Availability::HoursNotSet.to_status(),
        Some(raw) => status_from_json(raw, now),
    }
}

pub fn is_open_now<Tz: TimeZone>(raw: Option<&str>, now: &DateTime<Tz>) -> bool { status_of(raw, now).is_open }

/// Verdict honouring the merchant's manual open switch. With the switch off
/// the schedule is not consulted.
pub fn merchant_status<Tz: TimeZone>(switched_on: bool, raw: Option<&str>, now: &DateTime<Tz>) -> StoreStatus {
    if !switched_on {
        return Availability::ClosedByMerchant.to_status();
    }
    status_of(raw, now)
}

pub fn merchant_is_open<Tz: TimeZone>(switched_on: bool, raw: Option<&str>, now: &DateTime<Tz>) -> bool {
    merchant_status(switched_on, raw, now).is_open
}
