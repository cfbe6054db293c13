use std::sync::LazyLock;

use regex::Regex;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Glyph substitutions seen in exported timetables: superscript minutes
/// (`13¹⁵`), typographic dashes and the modifier-letter colon.
fn substitute(c: char) -> Option<char> {
    let mapped = match c {
        '⁰' | 'º' => '0',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        '⁴' => '4',
        '⁵' => '5',
        '⁶' => '6',
        '⁷' => '7',
        '⁸' => '8',
        '⁹' => '9',
        '–' | '—' | '‒' | '‑' | '−' => '-',
        '’' | '‘' | 'ʼ' | '`' => '\'',
        'ː' | '∶' => ':',
        '˙' => return None,
        other => other,
    };
    Some(mapped)
}

/// Canonicalize raw cell text. Never fails; empty input yields "".
pub fn normalize(raw: &str) -> String {
    let mapped: String = raw.chars().filter_map(substitute).collect();
    collapse_ws(&mapped)
}

/// Collapse whitespace runs to a single space and trim.
pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Header form of a cell: normalized and lower-cased.
pub fn header_key(raw: &str) -> String {
    normalize(raw).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superscripts_become_digits() {
        assert_eq!(normalize("13¹⁵–14⁴⁵"), "1315-1445");
    }

    #[test]
    fn whitespace_collapsed_and_trimmed() {
        assert_eq!(normalize("  Jurnalism \n\t radio  "), "Jurnalism radio");
    }

    #[test]
    fn punctuation_lookalikes() {
        assert_eq!(normalize("8ː00 — 9ː30"), "8:00 - 9:30");
        assert_eq!(normalize("O’Neil"), "O'Neil");
        assert_eq!(normalize("1˙0"), "10");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n "), "");
    }

    #[test]
    fn header_key_lowercases() {
        assert_eq!(header_key(" Data\n"), "data");
    }
}
