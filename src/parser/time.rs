use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use serde::Serialize;

use super::text;

// Lecture/seminar group markers written before the range ("I 8.00-9.30").
static ROMAN_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:I|II|III|IV|V|VI|VII|VIII|IX|X)\s+").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[:. ]?(\d{2})\s*-\s*(\d{1,2})[:. ]?(\d{2})").unwrap()
});

/// A class time slot. Start and end always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(serialize_with = "ser_hhmm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "ser_hhmm")]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn start_hhmm(&self) -> String {
        hhmm(self.start)
    }

    pub fn end_hhmm(&self) -> String {
        hhmm(self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_hhmm(), self.end_hhmm())
    }
}

pub fn hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parse `HH:MM` as stored in the database.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

fn ser_hhmm<S: serde::Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hhmm(*t))
}

/// First time range found anywhere in the cell; trailing notes are ignored.
pub fn parse_time_range(raw: &str) -> Option<TimeRange> {
    let normalized = text::normalize(raw);
    let s = ROMAN_PREFIX_RE.replace(&normalized, "");
    let caps = RANGE_RE.captures(&s)?;
    let part = |i: usize| caps[i].parse::<u32>().ok();
    let start = NaiveTime::from_hms_opt(part(1)?, part(2)?, 0)?;
    let end = NaiveTime::from_hms_opt(part(3)?, part(4)?, 0)?;
    Some(TimeRange { start, end })
}
