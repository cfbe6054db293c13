use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::text;

// Romanian weekday names, with and without diacritics (comma-below and cedilla forms).
static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:luni|marți|marţi|marti|miercuri|joi|vineri|sâmbătă|sîmbătă|sâmbata|sambata|simbata|duminică|duminica)\b",
    )
    .unwrap()
});
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static DMY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap());
static DM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})$").unwrap());

/// Loose date shape used when sniffing a column sample, not anchored.
pub static DATE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}\.\d{1,2}(?:\.\d{4})?\b").unwrap());

/// Parse a date cell. `year` fills in dates written as `D.M`.
pub fn normalize_date(raw: &str, year: i32) -> Option<NaiveDate> {
    let s = text::normalize(raw);
    let s = WEEKDAY_RE.replace_all(&s, "");
    let s = text::collapse_ws(&s);
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_RE.captures(&s) {
        return ymd(caps[1].parse().ok()?, &caps[2], &caps[3]);
    }
    if let Some(caps) = DMY_RE.captures(&s) {
        return ymd(caps[3].parse().ok()?, &caps[2], &caps[1]);
    }
    if let Some(caps) = DM_RE.captures(&s) {
        return ymd(year, &caps[2], &caps[1]);
    }
    None
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}
