use chrono::{Datelike, Duration, NaiveDate};

use crate::cohort;
use crate::db::SessionRecord;

/// Monday and Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

pub fn format_session(r: &SessionRecord) -> String {
    let time = r.time.map_or_else(|| "—".to_string(), |t| t.to_string());
    let mut line = format!("• {} · {}", time, r.title);

    let mut extras = Vec::new();
    if let Some(instructor) = &r.instructor {
        extras.push(instructor.clone());
    }
    if let Some(room) = &r.room {
        extras.push(format!("room {}", room));
    }
    if !extras.is_empty() {
        line.push_str("\n  ");
        line.push_str(&extras.join(" · "));
    }
    line
}

pub fn format_day(day: NaiveDate, records: &[SessionRecord], group_code: &str) -> String {
    let head = format!(
        "{} — {}",
        day.format("%a, %d.%m.%Y"),
        cohort::label_for(group_code)
    );
    if records.is_empty() {
        return format!("{}\nNo classes.", head);
    }
    let items: Vec<String> = records.iter().map(format_session).collect();
    format!("{}\n{}", head, items.join("\n"))
}

/// Every day from Monday to Sunday, records grouped by date.
pub fn format_week(anchor: NaiveDate, records: &[SessionRecord], group_code: &str) -> String {
    if records.is_empty() {
        return "No classes this week.".to_string();
    }
    let (start, _) = week_bounds(anchor);
    (0..7)
        .map(|offset| {
            let day = start + Duration::days(offset);
            let on_day: Vec<SessionRecord> = records
                .iter()
                .filter(|r| r.date == day)
                .cloned()
                .collect();
            format_day(day, &on_day, group_code)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
