//! The fixed set of fields an interview post template carries, and the
//! result type the extractors produce.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Rendered in place of a field that was not extracted.
pub const MISSING: &str = "N/A";

/// One of the eight self-reported fields. Variant order is schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    TimeStamp,
    Program,
    Result,
    OmsasGpa,
    Cars,
    Casper,
    Geography,
    CurrentYear,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::TimeStamp,
        Field::Program,
        Field::Result,
        Field::OmsasGpa,
        Field::Cars,
        Field::Casper,
        Field::Geography,
        Field::CurrentYear,
    ];

    /// The snake_case name used as the mapping key.
    pub fn key(self) -> &'static str {
        match self {
            Field::TimeStamp => "time_stamp",
            Field::Program => "program",
            Field::Result => "result",
            Field::OmsasGpa => "omsas_gpa",
            Field::Cars => "cars",
            Field::Casper => "casper",
            Field::Geography => "geography",
            Field::CurrentYear => "current_year",
        }
    }

    /// Lowercase words of the label as it is written in a post, e.g. `Current year:`.
    pub fn label_words(self) -> &'static [&'static str] {
        match self {
            Field::TimeStamp => &["time", "stamp"],
            Field::Program => &["program"],
            Field::Result => &["result"],
            Field::OmsasGpa => &["omsas", "gpa"],
            Field::Cars => &["cars"],
            Field::Casper => &["casper"],
            Field::Geography => &["geography"],
            Field::CurrentYear => &["current", "year"],
        }
    }

    /// Column header used in the HTML report.
    pub fn header(self) -> &'static str {
        match self {
            Field::TimeStamp => "Time Stamp",
            Field::Program => "Program",
            Field::Result => "Result",
            Field::OmsasGpa => "OMSAS GPA",
            Field::Cars => "CARS",
            Field::Casper => "Casper",
            Field::Geography => "Geography",
            Field::CurrentYear => "Current Year",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Field values pulled out of a single post or comment.
///
/// Keys are always [`Field`]s, so a result can never carry a name outside the
/// schema. Iteration follows schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    values: BTreeMap<Field, String>,
}

impl Extraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` unless the field already has one; the first occurrence wins.
    pub fn insert_first(&mut self, field: Field, value: impl Into<String>) {
        self.values.entry(field).or_insert_with(|| value.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// The value for `field`, or [`MISSING`].
    pub fn get_or_missing(&self, field: Field) -> &str {
        self.get(field).unwrap_or(MISSING)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// True when every schema field has a value.
    pub fn is_complete(&self) -> bool {
        self.values.len() == Field::ALL.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

impl Serialize for Extraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.key(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip_through_from_key() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        assert_eq!(Field::from_key("source"), None);
        assert_eq!(Field::from_key("Program"), None);
    }

    #[test]
    fn test_first_value_wins() {
        let mut extraction = Extraction::new();
        extraction.insert_first(Field::Program, "MD");
        extraction.insert_first(Field::Program, "MD/PhD");
        assert_eq!(extraction.get(Field::Program), Some("MD"));
        assert_eq!(extraction.len(), 1);
    }

    #[test]
    fn test_missing_sentinel() {
        let extraction = Extraction::new();
        assert_eq!(extraction.get_or_missing(Field::Cars), "N/A");
        assert!(!extraction.is_complete());
    }

    #[test]
    fn test_serializes_in_schema_order() {
        let mut extraction = Extraction::new();
        extraction.insert_first(Field::CurrentYear, "4th");
        extraction.insert_first(Field::Program, "MD");
        let json = serde_json::to_string(&extraction).unwrap();
        assert_eq!(json, r#"{"program":"MD","current_year":"4th"}"#);
    }
}
