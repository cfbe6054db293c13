use std::fmt;

use super::date::DATE_HINT_RE;
use super::document::Table;
use super::text;
use super::time::parse_time_range;
use crate::cohort::{self, Target, POSITIONAL_SLOTS};

/// Rows read per column when sniffing its content.
const SAMPLE_ROWS: usize = 8;
/// Fewest columns for the positional cohort guess (date, time, two cohorts).
const POSITIONAL_MIN_COLUMNS: usize = 4;

/// Column roles of one classified table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    pub date_col: usize,
    pub time_col: usize,
    pub cohort_col: usize,
}

impl ColumnRoles {
    /// Highest column a data row must reach.
    pub fn max_col(&self) -> usize {
        self.date_col.max(self.time_col).max(self.cohort_col)
    }
}

/// Why a table was not used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSkip {
    TooFewRows,
    NoDateColumn,
    NoTimeColumn,
    NoCohortColumn,
}

impl fmt::Display for TableSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableSkip::TooFewRows => "fewer than two rows",
            TableSkip::NoDateColumn => "no date column",
            TableSkip::NoTimeColumn => "no time column",
            TableSkip::NoCohortColumn => "no column for the requested group",
        };
        f.write_str(s)
    }
}

/// Merged header and content sample of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    pub header: String,
    pub sample: String,
}

/// A named column test. Matchers are tried in order, columns left to right.
struct ColumnMatcher {
    name: &'static str,
    matches: fn(&ColumnProfile) -> bool,
}

const DATE_MATCHERS: &[ColumnMatcher] = &[
    ColumnMatcher {
        name: "date_header",
        matches: date_header,
    },
    ColumnMatcher {
        name: "date_sample",
        matches: date_sample,
    },
];

const TIME_MATCHERS: &[ColumnMatcher] = &[
    ColumnMatcher {
        name: "time_header",
        matches: time_header,
    },
    ColumnMatcher {
        name: "time_sample",
        matches: time_sample,
    },
];

fn date_header(p: &ColumnProfile) -> bool {
    p.header.contains("data") || p.header.contains("date")
}

fn date_sample(p: &ColumnProfile) -> bool {
    DATE_HINT_RE.is_match(&p.sample)
}

fn time_header(p: &ColumnProfile) -> bool {
    p.header.contains("ora") || p.header.contains("time")
}

fn time_sample(p: &ColumnProfile) -> bool {
    parse_time_range(&p.sample).is_some()
}

/// Build per-column profiles from the first two rows (header) and the
/// first few rows (sample).
pub fn profile_columns(table: &Table) -> Vec<ColumnProfile> {
    let sample_rows = table.row_count().min(SAMPLE_ROWS);
    (0..table.column_count())
        .map(|col| {
            let mut header = text::header_key(table.cell(0, col));
            let second = text::header_key(table.cell(1, col));
            if !second.is_empty() && !header.contains(&second) {
                header = format!("{} {}", header, second).trim().to_string();
            }
            let sample = (0..sample_rows)
                .map(|row| text::normalize(table.cell(row, col)))
                .collect::<Vec<_>>()
                .join(" | ");
            ColumnProfile { header, sample }
        })
        .collect()
}

fn find_column(
    profiles: &[ColumnProfile],
    matchers: &[ColumnMatcher],
) -> Option<(usize, &'static str)> {
    profiles.iter().enumerate().find_map(|(col, p)| {
        matchers
            .iter()
            .find(|m| (m.matches)(p))
            .map(|m| (col, m.name))
    })
}

fn cohort_column(profiles: &[ColumnProfile], target: &Target, time_col: usize) -> Option<usize> {
    let by_header = profiles.iter().position(|p| target.named_in(&p.header));
    if by_header.is_some() {
        return by_header;
    }

    let any_named = profiles.iter().any(|p| cohort::any_alias_in(&p.header));
    if any_named || profiles.len() < POSITIONAL_MIN_COLUMNS {
        return None;
    }
    // Headers name no group: assume [date][time][first][second] ordering.
    if time_col + POSITIONAL_SLOTS >= profiles.len() {
        return None;
    }
    target
        .slot
        .filter(|s| *s < POSITIONAL_SLOTS)
        .map(|s| time_col + 1 + s)
}

/// Locate date, time and cohort columns, or say why the table is irrelevant.
pub fn classify(table: &Table, target: &Target) -> Result<ColumnRoles, TableSkip> {
    if table.row_count() < 2 {
        return Err(TableSkip::TooFewRows);
    }
    let profiles = profile_columns(table);

    let (date_col, date_rule) =
        find_column(&profiles, DATE_MATCHERS).ok_or(TableSkip::NoDateColumn)?;
    let (time_col, time_rule) =
        find_column(&profiles, TIME_MATCHERS).ok_or(TableSkip::NoTimeColumn)?;
    let cohort_col =
        cohort_column(&profiles, target, time_col).ok_or(TableSkip::NoCohortColumn)?;

    tracing::debug!(
        date_col,
        date_rule,
        time_col,
        time_rule,
        cohort_col,
        cohort = %target.code,
        "classified table"
    );
    Ok(ColumnRoles {
        date_col,
        time_col,
        cohort_col,
    })
}
