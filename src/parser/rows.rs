use chrono::NaiveDate;

use super::cell::split_cell;
use super::classify::ColumnRoles;
use super::date::normalize_date;
use super::document::Table;
use super::time::parse_time_range;
use crate::db::SessionRecord;

/// Rows searched for the first dated or timed row.
const DATA_ROW_SCAN: usize = 6;

/// Per-table inputs shared by every row step.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub roles: ColumnRoles,
    pub cohort_code: &'a str,
    /// Year assumed for `D.M` dates.
    pub year: i32,
}

/// Index of the first data row. Row 0 is always header.
pub fn first_data_row(table: &Table, roles: &ColumnRoles, year: i32) -> usize {
    let found = (0..table.row_count().min(DATA_ROW_SCAN))
        .find(|&i| {
            normalize_date(table.cell(i, roles.date_col), year).is_some()
                || parse_time_range(table.cell(i, roles.time_col)).is_some()
        })
        .unwrap_or(0);
    found.max(1)
}

/// One row transition: `(last known date, row) -> (next date, record)`.
///
/// A row with no readable date borrows the carried one (merged date cells
/// span several time slots); with nothing carried the row is dropped and
/// the carry stays as it was.
pub fn step(
    carry: Option<NaiveDate>,
    row: &[String],
    ctx: &RowContext<'_>,
) -> (Option<NaiveDate>, Option<SessionRecord>) {
    if row.len() <= ctx.roles.max_col() {
        return (carry, None);
    }
    let Some(date) = normalize_date(&row[ctx.roles.date_col], ctx.year).or(carry) else {
        return (carry, None);
    };

    let time = parse_time_range(&row[ctx.roles.time_col]);
    let content = split_cell(&row[ctx.roles.cohort_col]);
    let record = content
        .title
        .filter(|t| !t.is_empty())
        .map(|title| SessionRecord {
            date,
            time,
            title,
            instructor: content.instructor,
            room: content.room,
            cohort_code: ctx.cohort_code.to_string(),
        });
    (Some(date), record)
}

/// Walk the data rows of a classified table, folding the date carry.
pub fn walk(table: &Table, ctx: &RowContext<'_>) -> Vec<SessionRecord> {
    let start = first_data_row(table, &ctx.roles, ctx.year);
    let (_, records) = table.rows.iter().skip(start).fold(
        (None, Vec::new()),
        |(carry, mut out), row| {
            let (next, record) = step(carry, row, ctx);
            out.extend(record);
            (next, out)
        },
    );
    records
}
