use std::sync::LazyLock;

use regex::Regex;

use super::text;

// Room keyword ("sală", "s.", "aud.", "cab.", Cyrillic "ауд.") then a room token.
static ROOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sală|sala|s|aud|cab|ауд)(?:\.\s*|\s+)([\p{L}\p{N}./\\-]+)").unwrap()
});
static NAME_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Lu}\.|\p{Lu}\p{Ll}+").unwrap());

const ACADEMIC_TITLES: &[&str] = &[
    "dr.", "conf.", "prof.", "lector", "asistent", "universitar", "univ", "cadru",
];

/// Title, instructor and room pulled out of one cohort cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellContent {
    pub title: Option<String>,
    pub instructor: Option<String>,
    pub room: Option<String>,
}

/// A named instructor rule; rules run in order and the first hit wins.
struct LineMatcher {
    name: &'static str,
    matches: fn(&str) -> bool,
}

const INSTRUCTOR_MATCHERS: &[LineMatcher] = &[
    LineMatcher {
        name: "academic_title",
        matches: has_academic_title,
    },
    LineMatcher {
        name: "name_like",
        matches: looks_like_name,
    },
];

fn has_academic_title(line: &str) -> bool {
    let lower = line.to_lowercase();
    ACADEMIC_TITLES.iter().any(|kw| lower.contains(kw))
}

fn looks_like_name(line: &str) -> bool {
    NAME_LIKE_RE.is_match(line)
}

/// Room token on this line, if any.
pub fn find_room(line: &str) -> Option<String> {
    ROOM_RE.captures_iter(line).find_map(|c| {
        let token = c[2].trim_end_matches(['.', '-']);
        // "S. Popescu" is an initial, not a room.
        let initial = &c[1] == "S" && !token.chars().any(|ch| ch.is_ascii_digit());
        (!initial && !token.is_empty()).then(|| token.to_string())
    })
}

/// Name of the instructor rule that accepts `line`.
fn instructor_rule(line: &str) -> Option<&'static str> {
    INSTRUCTOR_MATCHERS
        .iter()
        .find(|m| (m.matches)(line))
        .map(|m| m.name)
}

/// Split a cohort cell. Only the title is positional; room and instructor
/// are found by content because the cell text is not aligned.
pub fn split_cell(raw: &str) -> CellContent {
    let lines: Vec<String> = raw
        .lines()
        .map(text::collapse_ws)
        .filter(|l| !l.is_empty())
        .collect();
    let Some((title, rest)) = lines.split_first() else {
        return CellContent::default();
    };

    let room_hit = rest
        .iter()
        .enumerate()
        .find_map(|(i, line)| find_room(line).map(|room| (i, room)));
    let room_line = room_hit.as_ref().map(|(i, _)| *i);

    let instructor = rest
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != room_line)
        .find(|(_, line)| instructor_rule(line).is_some())
        .map(|(_, line)| line.clone());

    CellContent {
        title: Some(title.clone()),
        instructor,
        room: room_hit.map(|(_, room)| room),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_instructor_room() {
        let c = split_cell("Jurnalism radio\nAsistent universitar V. Cernea\ns. 432");
        assert_eq!(c.title.as_deref(), Some("Jurnalism radio"));
        assert_eq!(c.instructor.as_deref(), Some("Asistent universitar V. Cernea"));
        assert_eq!(c.room.as_deref(), Some("432"));
    }

    #[test]
    fn blank_cell() {
        assert_eq!(split_cell(""), CellContent::default());
        assert_eq!(split_cell(" \n \n"), CellContent::default());
    }

    #[test]
    fn title_only() {
        let c = split_cell("  Etica   profesională ");
        assert_eq!(c.title.as_deref(), Some("Etica profesională"));
        assert_eq!(c.instructor, None);
        assert_eq!(c.room, None);
    }

    #[test]
    fn room_variants() {
        assert_eq!(find_room("sală 215").as_deref(), Some("215"));
        assert_eq!(find_room("aud. 3/12").as_deref(), Some("3/12"));
        assert_eq!(find_room("Bl.2/s.102").as_deref(), Some("102"));
        assert_eq!(find_room("ауд. 14").as_deref(), Some("14"));
        assert_eq!(find_room("cab.423/biblioteca").as_deref(), Some("423/biblioteca"));
    }

    #[test]
    fn words_starting_with_s_are_not_rooms() {
        assert_eq!(find_room("seminar 2"), None);
        assert_eq!(find_room("conf. univ. S. Popescu"), None);
        assert_eq!(find_room("lector S. Popescu, s. 14").as_deref(), Some("14"));
    }

    #[test]
    fn named_rooms() {
        assert_eq!(find_room("sala biblioteca").as_deref(), Some("biblioteca"));
        assert_eq!(find_room("aud. Mare").as_deref(), Some("Mare"));
        assert_eq!(find_room("S. 12").as_deref(), Some("12"));
        let c = split_cell("Catalogare\nconf. univ. S. Popescu\naud. Mare");
        assert_eq!(c.instructor.as_deref(), Some("conf. univ. S. Popescu"));
        assert_eq!(c.room.as_deref(), Some("Mare"));
    }

    #[test]
    fn room_line_not_taken_as_instructor() {
        let c = split_cell("Istoria presei\nSala 12\ndr. M. Rusu");
        assert_eq!(c.room.as_deref(), Some("12"));
        assert_eq!(c.instructor.as_deref(), Some("dr. M. Rusu"));
    }

    #[test]
    fn name_like_fallback() {
        let c = split_cell("Fotojurnalism\nIon Ciobanu");
        assert_eq!(c.instructor.as_deref(), Some("Ion Ciobanu"));
    }

    #[test]
    fn instructor_scan_stops_at_first_match() {
        let c = split_cell("Retorica\nlector A. Munteanu\nprof. B. Lungu");
        assert_eq!(c.instructor.as_deref(), Some("lector A. Munteanu"));
    }

    #[test]
    fn lowercase_note_is_not_instructor() {
        let c = split_cell("Practica\nonline");
        assert_eq!(c.instructor, None);
        assert_eq!(instructor_rule("online"), None);
        assert_eq!(instructor_rule("conf. dr."), Some("academic_title"));
    }
}
