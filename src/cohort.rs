/// A student group the timetable has a column for.
#[derive(Debug, Clone)]
pub struct Cohort {
    /// Canonical code, e.g. `JFR-237`.
    pub code: &'static str,
    pub label: &'static str,
    /// Code prefix used to recognise variants such as `JFR - 237`.
    pub prefix: &'static str,
    /// Lower-case fragments that identify this cohort's column header.
    pub header_aliases: &'static [&'static str],
    /// Column offset right of the time column when headers carry no names.
    pub slot: usize,
}

/// Cohorts sharing one timetable, in positional column order.
pub const COHORTS: &[Cohort] = &[
    Cohort {
        code: "JFR-237",
        label: "Jurnalism și procese mediatice — JFR-237",
        prefix: "JFR",
        header_aliases: &["jfr", "jurnalism"],
        slot: 0,
    },
    Cohort {
        code: "BFR-237",
        label: "Biblioteconomie și asistență informațională — BFR-237",
        prefix: "BFR",
        header_aliases: &["bfr", "bibliotec"],
        slot: 1,
    },
];

/// Number of positional cohort columns that follow the time column.
pub const POSITIONAL_SLOTS: usize = 2;

/// Resolve a user-supplied group code or program name to a known cohort.
pub fn resolve(code: &str) -> Option<&'static Cohort> {
    let upper = code.trim().to_uppercase();
    let lower = code.trim().to_lowercase();
    COHORTS.iter().find(|c| {
        upper.starts_with(c.prefix) || c.header_aliases.iter().any(|a| lower.starts_with(a))
    })
}

/// Canonical code for storage: `PREFIX-DIGITS`, upper-cased, whatever the
/// spacing or separator (`jfr - 237`, `JFR 237` → `JFR-237`); a bare
/// program name maps to its cohort.
pub fn canonical_code(code: &str) -> String {
    let compact = code.split_whitespace().collect::<String>().to_uppercase();
    if compact.chars().any(|c| c.is_ascii_digit()) {
        let split = compact
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(compact.len());
        let (prefix, rest) = compact.split_at(split);
        let rest = rest.trim_start_matches('-');
        if !prefix.is_empty() && rest.starts_with(|c: char| c.is_ascii_digit()) {
            return format!("{}-{}", prefix, rest);
        }
        return compact;
    }
    match resolve(code) {
        Some(c) => c.code.to_string(),
        None => code.trim().to_string(),
    }
}

pub fn label_for(code: &str) -> String {
    let canonical = canonical_code(code);
    COHORTS
        .iter()
        .find(|c| c.code == canonical)
        .map(|c| c.label.to_string())
        .unwrap_or(canonical)
}

/// True when a normalized header mentions any known cohort.
pub fn any_alias_in(header: &str) -> bool {
    COHORTS
        .iter()
        .any(|c| c.header_aliases.iter().any(|a| header.contains(a)))
}

/// The cohort an import run extracts, with the header aliases and
/// positional slot used to find its column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub code: String,
    pub aliases: Vec<String>,
    pub slot: Option<usize>,
}

impl Target {
    /// Known cohorts bring their aliases; other codes fall back to the
    /// lower-cased program prefix (`XYZ-1` → `xyz`) and get no slot.
    pub fn for_code(code: &str) -> Self {
        let code = canonical_code(code);
        match resolve(&code) {
            Some(c) => Target {
                code,
                aliases: c.header_aliases.iter().map(|a| a.to_string()).collect(),
                slot: Some(c.slot),
            },
            None => {
                let prefix = code
                    .split(['-', ' '])
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();
                Target {
                    code,
                    aliases: if prefix.is_empty() { Vec::new() } else { vec![prefix] },
                    slot: None,
                }
            }
        }
    }

    pub fn named_in(&self, header: &str) -> bool {
        self.aliases.iter().any(|a| header.contains(a.as_str()))
    }
}
