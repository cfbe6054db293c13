use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::import::{CohortLocks, SessionStore};
use crate::parser::time::{parse_hhmm, TimeRange};

const DATE_FMT: &str = "%Y-%m-%d";

/// One scheduled class for one cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub time: Option<TimeRange>,
    pub title: String,
    pub instructor: Option<String>,
    pub room: Option<String>,
    pub cohort_code: String,
}

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            date        TEXT NOT NULL,
            time_start  TEXT,
            time_end    TEXT,
            title       TEXT NOT NULL,
            teacher     TEXT,
            room        TEXT,
            group_code  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_date_group ON events(date, group_code);
        ",
    )?;
    Ok(())
}

/// Delete every event of `group_code` and insert `records`, in one transaction.
pub fn replace_group(conn: &Connection, group_code: &str, records: &[SessionRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM events WHERE group_code = ?1", params![group_code])?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO events (date, time_start, time_end, title, teacher, room, group_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for r in records {
            count += stmt.execute(params![
                r.date.format(DATE_FMT).to_string(),
                r.time.map(|t| t.start_hhmm()),
                r.time.map(|t| t.end_hhmm()),
                r.title,
                r.instructor,
                r.room,
                group_code,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

fn row_to_record(row: &Row) -> rusqlite::Result<SessionRecord> {
    let date: String = row.get(0)?;
    let start: Option<String> = row.get(1)?;
    let end: Option<String> = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let time = match (start.as_deref().and_then(parse_hhmm), end.as_deref().and_then(parse_hhmm)) {
        (Some(start), Some(end)) => Some(TimeRange { start, end }),
        _ => None,
    };
    Ok(SessionRecord {
        date,
        time,
        title: row.get(3)?,
        instructor: row.get(4)?,
        room: row.get(5)?,
        cohort_code: row.get(6)?,
    })
}

const SELECT_EVENTS: &str =
    "SELECT date, time_start, time_end, title, teacher, room, group_code FROM events";

pub fn fetch_day(conn: &Connection, day: NaiveDate, group_code: &str) -> Result<Vec<SessionRecord>> {
    let sql = format!(
        "{} WHERE date = ?1 AND group_code = ?2
         ORDER BY COALESCE(time_start, '99:99'), title",
        SELECT_EVENTS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![day.format(DATE_FMT).to_string(), group_code], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_week(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    group_code: &str,
) -> Result<Vec<SessionRecord>> {
    let sql = format!(
        "{} WHERE date BETWEEN ?1 AND ?2 AND group_code = ?3
         ORDER BY date, COALESCE(time_start, '99:99'), title",
        SELECT_EVENTS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![
                start.format(DATE_FMT).to_string(),
                end.format(DATE_FMT).to_string(),
                group_code
            ],
            row_to_record,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_group(conn: &Connection, group_code: &str) -> Result<usize> {
    let n: usize = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE group_code = ?1",
        params![group_code],
        |r| r.get(0),
    )?;
    Ok(n)
}

/// Shared handle used by import runs. The connection mutex keeps
/// statements from different threads from interleaving; the lock table
/// serializes whole import runs per cohort.
pub struct Store {
    conn: Mutex<Connection>,
    locks: CohortLocks,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Store {
            conn: Mutex::new(conn),
            locks: CohortLocks::default(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path)?;
        init_schema(&conn)?;
        Ok(Store::new(conn))
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))?;
        f(&conn)
    }
}

impl SessionStore for Store {
    fn replace_cohort(&self, cohort_code: &str, records: &[SessionRecord]) -> Result<usize> {
        self.with_conn(|conn| replace_group(conn, cohort_code, records))
    }

    fn cohort_locks(&self) -> &CohortLocks {
        &self.locks
    }
}
