//! Normalized result rows.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Marker rendered in place of a value that could not be determined.
pub const NOT_APPLICABLE: &str = "N/A";

/// One normalized row: an ordered mapping from column name to scalar value.
///
/// Keys keep the order they were inserted in and never repeat. A duplicate column
/// name gets a numeric suffix (`id`, `id_2`, `id_3`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, JsonValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from column/value pairs in column order.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.push(key, value);
        }
        record
    }

    /// Append a column, disambiguating the name if it is already taken.
    pub fn push(&mut self, key: impl Into<String>, value: JsonValue) {
        let key = key.into();
        if !self.0.contains_key(&key) {
            self.0.insert(key, value);
            return;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", key, suffix);
            if !self.0.contains_key(&candidate) {
                self.0.insert(candidate, value);
                return;
            }
            suffix += 1;
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &JsonValue> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text value of a column; `None` for null, missing or non-text values.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    /// Non-negative integer value of a column.
    ///
    /// NUMERIC results arrive as strings, so numeric strings are accepted too.
    pub fn unsigned(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            JsonValue::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value of a column.
    ///
    /// Catalogs disagree on how flags are stored: native booleans, `YES`/`NO`
    /// text, or single letters. All of those are accepted.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "t" | "1" => Some(true),
                "no" | "n" | "false" | "f" | "0" => Some(false),
                _ => None,
            },
            JsonValue::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }

    /// Remove a column and return its value.
    pub fn take(&mut self, key: &str) -> Option<JsonValue> {
        self.0.shift_remove(key)
    }

    pub fn into_map(self) -> Map<String, JsonValue> {
        self.0
    }
}

impl From<Map<String, JsonValue>> for Record {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl IntoIterator for Record {
    type Item = (String, JsonValue);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A row count that is either known exactly or explicitly not applicable.
///
/// Serializes as a number or as `"N/A"`; it is never omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Exact(u64),
    NotApplicable,
}

impl RowCount {
    pub fn exact(&self) -> Option<u64> {
        match self {
            Self::Exact(n) => Some(*n),
            Self::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

impl From<Option<u64>> for RowCount {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::NotApplicable, Self::Exact)
    }
}

impl Serialize for RowCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Exact(n) => serializer.serialize_u64(*n),
            Self::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

impl std::fmt::Display for RowCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{}", n),
            Self::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::from_pairs([
            ("zeta", json!(1)),
            ("alpha", json!(2)),
            ("mid", json!(3)),
        ]);
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"zeta":1,"alpha":2,"mid":3}"#
        );
    }

    #[test]
    fn test_record_disambiguates_duplicate_names() {
        let record = Record::from_pairs([
            ("id", json!(1)),
            ("id", json!(2)),
            ("id_2", json!(3)),
            ("id", json!(4)),
        ]);
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["id", "id_2", "id_2_2", "id_3"]);
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn test_unsigned_accepts_numbers_and_numeric_strings() {
        let record = Record::from_pairs([
            ("a", json!(42)),
            ("b", json!("1234567890123")),
            ("c", json!(-1)),
            ("d", JsonValue::Null),
        ]);
        assert_eq!(record.unsigned("a"), Some(42));
        assert_eq!(record.unsigned("b"), Some(1_234_567_890_123));
        assert_eq!(record.unsigned("c"), None);
        assert_eq!(record.unsigned("d"), None);
        assert_eq!(record.unsigned("missing"), None);
    }

    #[test]
    fn test_flag_accepts_catalog_spellings() {
        let record = Record::from_pairs([
            ("pg", json!("YES")),
            ("vertica", json!(false)),
            ("letter", json!("t")),
            ("junk", json!("maybe")),
        ]);
        assert_eq!(record.flag("pg"), Some(true));
        assert_eq!(record.flag("vertica"), Some(false));
        assert_eq!(record.flag("letter"), Some(true));
        assert_eq!(record.flag("junk"), None);
    }

    #[test]
    fn test_row_count_serialization() {
        assert_eq!(serde_json::to_value(RowCount::Exact(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(RowCount::NotApplicable).unwrap(),
            json!("N/A")
        );
        assert_eq!(RowCount::from(None), RowCount::NotApplicable);
        assert_eq!(RowCount::from(Some(0)).exact(), Some(0));
    }

    #[test]
    fn test_take_keeps_remaining_order() {
        let mut record = Record::from_pairs([
            ("a", json!(1)),
            ("b", json!(2)),
            ("c", json!(3)),
        ]);
        assert_eq!(record.take("b"), Some(json!(2)));
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
