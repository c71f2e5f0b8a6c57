//! 📅 Dates: turning "01-02-2024" into two very large integers.
//!
//! The job speaks `DD-MM-YYYY`. The log store speaks epoch milliseconds.
//! This module is the interpreter, and like every interpreter it has opinions
//! about timezones.
//!
//! 🧠 Knowledge graph:
//! - `validate_date_format`: syntax only (`^\d{2}-\d{2}-\d{4}$`). `31-02-2024` passes here.
//! - `parse_job_date`: syntax, then the calendar. `31-02-2024` dies here.
//! - `TimeWindow::for_day`: 00:00:00 → 23:59:59 in the configured zone, whole seconds × 1000.
//! - `yesterday`: the day before "now", in the configured zone, as `DD-MM-YYYY`.
//! - `JobTimeZone`: `local` | `utc` | `+HH:MM`. The `JOB_TIMEZONE` knob.
//!
//! ⚠️ DST: on a day with a transition the window is 23h or 25h long minus a second.
//! The log store doesn't care. Neither do we. But the tests do, so they use UTC
//! and fixed offsets. 🦆

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::errors::JobError;

/// 📅 The one true input format.
pub const JOB_DATE_FORMAT: &str = "%d-%m-%Y";

// -- 📂 the suffix on the export file: same digits, no hyphens
const FILE_SUFFIX_FORMAT: &str = "%d%m%Y";

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // -- ✅ a literal pattern that compiles or the test suite tells us within a second
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("date pattern is valid"))
}

/// 🔍 Syntactic check: two digits, hyphen, two digits, hyphen, four digits.
///
/// Does NOT know that February is short. That's `parse_job_date`'s problem.
pub fn validate_date_format(date: &str) -> Result<(), JobError> {
    if date_pattern().is_match(date) {
        Ok(())
    } else {
        Err(JobError::Validation(format!(
            "Date parameter value '{}' does not match expected format: DD-MM-YYYY",
            date
        )))
    }
}

/// 📅 Syntax first, then the calendar. Returns the real day or a `Validation` error.
pub fn parse_job_date(date: &str) -> Result<NaiveDate, JobError> {
    validate_date_format(date)?;
    NaiveDate::parse_from_str(date, JOB_DATE_FORMAT).map_err(|e| {
        JobError::Validation(format!(
            "Date parameter value '{}' is not a real calendar date: {}",
            date, e
        ))
    })
}

/// 📂 `01-02-2024` → `01022024`. For naming the export file.
pub fn file_suffix(day: NaiveDate) -> String {
    day.format(FILE_SUFFIX_FORMAT).to_string()
}

/// 🌍 Which clock "yesterday" and "midnight" are read from.
///
/// `Local` is the host's zone, which is whatever the scheduler's container
/// happened to boot with. `Utc` and `Fixed` are for people who have been burned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobTimeZone {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl FromStr for JobTimeZone {
    type Err = String;

    /// 🔧 `local`, `utc` (any case), or `+HH:MM` / `-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("local") {
            return Ok(JobTimeZone::Local);
        }
        if value.eq_ignore_ascii_case("utc") || value == "Z" {
            return Ok(JobTimeZone::Utc);
        }

        let sign = match value.as_bytes().first() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Err(format!("unrecognised timezone '{}'", s)),
        };
        let (hh, mm) = value[1..]
            .split_once(':')
            .ok_or_else(|| format!("timezone offset '{}' must look like +HH:MM", s))?;
        let hours = two_digits(hh)
            .filter(|h| *h <= 23)
            .ok_or_else(|| format!("timezone offset '{}' needs an hour from 00 to 23", s))?;
        let minutes = two_digits(mm)
            .filter(|m| *m <= 59)
            .ok_or_else(|| format!("timezone offset '{}' needs minutes from 00 to 59", s))?;

        // -- 🔢 hours <= 23, minutes <= 59
        let seconds = sign * (hours * 3600 + minutes * 60);
        FixedOffset::east_opt(seconds)
            .map(JobTimeZone::Fixed)
            .ok_or_else(|| format!("timezone offset '{}' is out of range", s))
    }
}

// -- exactly two ASCII digits, no sign, no spaces
fn two_digits(field: &str) -> Option<i32> {
    match field.as_bytes() {
        [tens @ b'0'..=b'9', ones @ b'0'..=b'9'] => {
            Some(i32::from(tens - b'0') * 10 + i32::from(ones - b'0'))
        }
        _ => None,
    }
}

impl std::fmt::Display for JobTimeZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobTimeZone::Local => write!(f, "local"),
            JobTimeZone::Utc => write!(f, "utc"),
            JobTimeZone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl JobTimeZone {
    /// 🕛 Epoch seconds of a wall-clock time in this zone.
    ///
    /// `earliest` picks the first instant when the wall clock repeats (DST fall-back),
    /// otherwise the last one. A wall-clock time that never happens is a `Validation` error.
    fn epoch_seconds(&self, wall_clock: NaiveDateTime, earliest: bool) -> Result<i64, JobError> {
        fn pick<Tz: TimeZone>(tz: &Tz, wall_clock: &NaiveDateTime, earliest: bool) -> Option<i64> {
            let mapping = tz.from_local_datetime(wall_clock);
            let instant = if earliest {
                mapping.earliest()
            } else {
                mapping.latest()
            };
            instant.map(|dt| dt.timestamp())
        }

        let seconds = match self {
            JobTimeZone::Local => pick(&Local, &wall_clock, earliest),
            JobTimeZone::Utc => pick(&Utc, &wall_clock, earliest),
            JobTimeZone::Fixed(offset) => pick(offset, &wall_clock, earliest),
        };

        seconds.ok_or_else(|| {
            JobError::Validation(format!(
                "Local time {} does not exist in timezone {}",
                wall_clock, self
            ))
        })
    }

    /// 📆 The calendar day `now` falls on, in this zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            JobTimeZone::Local => now.with_timezone(&Local).date_naive(),
            JobTimeZone::Utc => now.date_naive(),
            JobTimeZone::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }
}

/// ⏪ The day before `now` in `zone`, formatted `DD-MM-YYYY`.
pub fn yesterday(now: DateTime<Utc>, zone: JobTimeZone) -> String {
    let today = zone.today(now);
    // -- 🦖 pred_opt only fails on the first day chrono knows about. We are not there.
    let previous = today.pred_opt().unwrap_or(today);
    previous.format(JOB_DATE_FORMAT).to_string()
}

/// ⏱️ One calendar day as inclusive epoch-millisecond bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_millis: i64,
    pub end_millis: i64,
}

impl TimeWindow {
    /// 🕛 00:00:00 → 23:59:59 of `day` in `zone`.
    pub fn for_day(day: NaiveDate, zone: JobTimeZone) -> Result<Self, JobError> {
        let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(|| {
            JobError::Validation(format!("cannot build midnight for {}", day))
        })?;
        let last_second = day.and_hms_opt(23, 59, 59).ok_or_else(|| {
            JobError::Validation(format!("cannot build 23:59:59 for {}", day))
        })?;

        Ok(Self {
            start_millis: zone.epoch_seconds(midnight, true)? * 1000,
            end_millis: zone.epoch_seconds(last_second, false)? * 1000,
        })
    }
}
