pub mod cell;
pub mod classify;
pub mod date;
pub mod document;
pub mod rows;
pub mod text;
pub mod time;

use crate::cohort::Target;
use crate::db::SessionRecord;
use classify::{ColumnRoles, TableSkip};
use document::{RawDocument, Table};
use rows::RowContext;

/// What happened to one table of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Extracted {
        roles: ColumnRoles,
        records: Vec<SessionRecord>,
    },
    Skipped(TableSkip),
}

/// Two-pass pipeline for one table: classify columns → walk rows.
pub fn extract_table(table: &Table, target: &Target, year: i32) -> TableOutcome {
    match classify::classify(table, target) {
        Ok(roles) => {
            let ctx = RowContext {
                roles,
                cohort_code: &target.code,
                year,
            };
            TableOutcome::Extracted {
                roles,
                records: rows::walk(table, &ctx),
            }
        }
        Err(skip) => TableOutcome::Skipped(skip),
    }
}

/// Every table of a document, classified independently.
pub fn extract_document(doc: &RawDocument, target: &Target, year: i32) -> Vec<TableOutcome> {
    doc.tables
        .iter()
        .map(|t| extract_table(t, target, year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timetable() -> Table {
        Table::from_rows(vec![
            vec!["Data", "Ora", "JFR", "BFR"],
            vec!["", "", "", ""],
            vec![
                "joi 24.09",
                "13:15-14:45",
                "Jurnalism radio\nAsistent universitar V. Cernea\ns. 432",
                "Catalogare\nprof. I. Lungu\naud. 12",
            ],
            vec!["", "I 15.00 - 16.30", "Etica profesională", ""],
            vec!["vineri 25.09", "8:00-9:30", "", "Bibliografie"],
        ])
    }

    #[test]
    fn extracts_cohort_column_only() {
        let doc = RawDocument {
            tables: vec![
                Table::from_rows(vec![vec!["Aprobat", "Decan"], vec!["", ""]]),
                timetable(),
            ],
        };
        let outcomes = extract_document(&doc, &Target::for_code("JFR-237"), 2025);
        assert_eq!(outcomes[0], TableOutcome::Skipped(TableSkip::NoDateColumn));
        let TableOutcome::Extracted { records, .. } = &outcomes[1] else {
            panic!("timetable not classified");
        };
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Jurnalism radio", "Etica profesională"]);
        assert_eq!(records[0].instructor.as_deref(), Some("Asistent universitar V. Cernea"));
        assert_eq!(records[1].date.to_string(), "2025-09-24");
        assert!(records.iter().all(|r| r.cohort_code == "JFR-237"));
    }

    #[test]
    fn other_cohort_reads_its_own_column() {
        let outcome = extract_table(&timetable(), &Target::for_code("BFR-237"), 2025);
        let TableOutcome::Extracted { roles, records } = outcome else {
            panic!("timetable not classified");
        };
        assert_eq!(roles.cohort_col, 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].room.as_deref(), Some("12"));
        assert_eq!(records[1].date.to_string(), "2025-09-25");
    }
}
