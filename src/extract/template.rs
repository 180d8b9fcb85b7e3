//! Line-prefix extraction for posts written against the interview template:
//!
//! ```text
//! Time stamp: Jan 12
//! Program: MD
//! Result: Invite
//! ...
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::schema::{Extraction, Field};
use crate::TARGET_EXTRACT;

lazy_static! {
    static ref LABEL_PATTERNS: Vec<(Field, Regex)> = Field::ALL
        .into_iter()
        .map(|field| (field, label_pattern(field)))
        .collect();
}

/// Builds the matcher for one label: case-insensitive, anchored at the start
/// of the line, any run (possibly empty) of whitespace or underscores between
/// label words (`Timestamp` matches), and everything after the first colon
/// captured as the value.
fn label_pattern(field: Field) -> Regex {
    let label = field
        .label_words()
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join(r"[\s_]*");

    Regex::new(&format!(r"(?i)^\s*{}\s*:(.*)$", label)).expect("label pattern must compile")
}

/// Returns the field a line is labelled with and its trimmed value.
pub fn match_line(line: &str) -> Option<(Field, &str)> {
    LABEL_PATTERNS.iter().find_map(|(field, pattern)| {
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|value| (*field, value.as_str().trim()))
    })
}

/// Collects every labelled line in `text`. The first line for a field wins.
fn scan(text: &str) -> Extraction {
    let mut extraction = Extraction::new();
    for line in text.lines() {
        if let Some((field, value)) = match_line(line) {
            extraction.insert_first(field, value);
        }
    }
    extraction
}

/// Succeeds only when all eight labels are present.
pub fn extract_strict(text: &str) -> Option<Extraction> {
    let extraction = scan(text);
    if extraction.is_complete() {
        return Some(extraction);
    }

    if !extraction.is_empty() {
        let missing = Field::ALL
            .into_iter()
            .filter(|field| !extraction.contains(*field))
            .map(Field::key)
            .collect::<Vec<_>>()
            .join(", ");
        debug!(target: TARGET_EXTRACT, "Strict template match failed, missing: {}", missing);
    }
    None
}

/// Returns whichever labelled fields were found, or `None` if there were none.
pub fn extract_lenient(text: &str) -> Option<Extraction> {
    let extraction = scan(text);
    if extraction.is_empty() {
        None
    } else {
        Some(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_TEMPLATE: &str = "\
Congrats everyone! Here are my stats.

Time stamp: Jan 12, 9:14am
Program: MD
Result: Invite
OMSAS GPA: 3.92
CARS: 128
Casper: 4th quartile
Geography: IP
Current year: 4th year undergrad
";

    #[test]
    fn test_strict_full_template() {
        let extraction = extract_strict(FULL_TEMPLATE).expect("all labels present");
        assert!(extraction.is_complete());
        assert_eq!(extraction.get(Field::TimeStamp), Some("Jan 12, 9:14am"));
        assert_eq!(extraction.get(Field::Program), Some("MD"));
        assert_eq!(extraction.get(Field::Result), Some("Invite"));
        assert_eq!(extraction.get(Field::OmsasGpa), Some("3.92"));
        assert_eq!(extraction.get(Field::Cars), Some("128"));
        assert_eq!(extraction.get(Field::Casper), Some("4th quartile"));
        assert_eq!(extraction.get(Field::Geography), Some("IP"));
        assert_eq!(extraction.get(Field::CurrentYear), Some("4th year undergrad"));
    }

    #[test]
    fn test_strict_rejects_missing_label() {
        let without_casper: String = FULL_TEMPLATE
            .lines()
            .filter(|line| !line.starts_with("Casper"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(extract_strict(&without_casper), None);
    }

    #[test]
    fn test_lenient_single_field() {
        let extraction = extract_lenient("Program: MD").unwrap();
        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.get(Field::Program), Some("MD"));
    }

    #[test]
    fn test_lenient_partial_template() {
        let text = "Got the email today!\nresult: Waitlist\ngeography: OOP\nGood luck all";
        let extraction = extract_lenient(text).unwrap();
        assert_eq!(extraction.len(), 2);
        assert_eq!(extraction.get(Field::Result), Some("Waitlist"));
        assert_eq!(extraction.get(Field::Geography), Some("OOP"));
    }

    #[test]
    fn test_label_case_insensitive() {
        assert_eq!(match_line("RESULT: Invite"), Some((Field::Result, "Invite")));
        assert_eq!(match_line("result: Invite"), Some((Field::Result, "Invite")));
        assert_eq!(match_line("ReSuLt: Invite"), Some((Field::Result, "Invite")));
    }

    #[test]
    fn test_values_are_trimmed() {
        assert_eq!(match_line("Program:   MD  "), Some((Field::Program, "MD")));
        assert_eq!(match_line("   Program : MD"), Some((Field::Program, "MD")));
    }

    #[test]
    fn test_interior_whitespace_in_label() {
        assert_eq!(match_line("Current  year: 3rd"), Some((Field::CurrentYear, "3rd")));
        assert_eq!(match_line("current\tyear: 3rd"), Some((Field::CurrentYear, "3rd")));
        assert_eq!(match_line("current_year: 3rd"), Some((Field::CurrentYear, "3rd")));
        assert_eq!(match_line("OMSAS   GPA: 3.85"), Some((Field::OmsasGpa, "3.85")));
    }

    #[test]
    fn test_collapsed_multi_word_label() {
        assert_eq!(match_line("Timestamp: Jan 5"), Some((Field::TimeStamp, "Jan 5")));
        assert_eq!(match_line("TIMESTAMP: Jan 5"), Some((Field::TimeStamp, "Jan 5")));
        assert_eq!(match_line("CurrentYear: 2nd"), Some((Field::CurrentYear, "2nd")));
        assert_eq!(match_line("OMSASGPA: 3.7"), Some((Field::OmsasGpa, "3.7")));
    }

    #[test]
    fn test_splits_on_first_colon_only() {
        assert_eq!(
            match_line("Time stamp: 10:45 AM EST"),
            Some((Field::TimeStamp, "10:45 AM EST"))
        );
    }

    #[test]
    fn test_label_must_be_followed_by_colon() {
        assert_eq!(match_line("Programme: MD"), None);
        assert_eq!(match_line("Program director emailed me: yes"), None);
        assert_eq!(match_line("My program: MD"), None);
        assert_eq!(match_line("Program MD"), None);
    }

    #[test]
    fn test_empty_value_counts_as_present() {
        let extraction = extract_lenient("Casper:").unwrap();
        assert_eq!(extraction.get(Field::Casper), Some(""));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let extraction = extract_lenient("Result: Invite\nResult: Reject").unwrap();
        assert_eq!(extraction.get(Field::Result), Some("Invite"));
    }

    #[test]
    fn test_windows_line_endings() {
        let extraction = extract_lenient("Program: MD\r\nCARS: 127\r\n").unwrap();
        assert_eq!(extraction.get(Field::Program), Some("MD"));
        assert_eq!(extraction.get(Field::Cars), Some("127"));
    }

    #[test]
    fn test_empty_text_is_absent() {
        assert_eq!(extract_strict(""), None);
        assert_eq!(extract_lenient(""), None);
        assert_eq!(extract_lenient("no template here\njust chatter"), None);
    }
}
