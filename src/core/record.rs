use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One logical row of a CSV document.
///
/// Without a header every row is kept as the raw sequence of its values. With
/// a header the values are keyed by the normalized column name, in header
/// column order. All values are strings: no type inference is performed.
///
/// # Examples
///
/// ```
/// use csvfile::core::record::Record;
///
/// let row = Record::from(vec!["Ann", "30"]);
/// assert_eq!(row.values(), vec!["Ann", "30"]);
///
/// let person: Record = [("first_name", "Ann"), ("age", "30")].into_iter().collect();
/// assert_eq!(person.get("age"), Some("30"));
/// assert_eq!(person.values(), vec!["Ann", "30"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// Row read without a header: values by position.
    Positional(Vec<String>),
    /// Row read with a header: values by normalized column name.
    Named(IndexMap<String, String>),
}

impl Record {
    /// Values of the row in column order, field names discarded.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Record::Positional(values) => values.iter().map(String::as_str).collect(),
            Record::Named(fields) => fields.values().map(String::as_str).collect(),
        }
    }

    /// Value of a named field. Always `None` for positional rows.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Record::Positional(_) => None,
            Record::Named(fields) => fields.get(name).map(String::as_str),
        }
    }

    /// Value at a column position, for both kinds of rows.
    pub fn get_index(&self, index: usize) -> Option<&str> {
        match self {
            Record::Positional(values) => values.get(index).map(String::as_str),
            Record::Named(fields) => fields.get_index(index).map(|(_, value)| value.as_str()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Record::Positional(values) => values.len(),
            Record::Named(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Record::Named(_))
    }
}

impl<S: Into<String>> From<Vec<S>> for Record {
    fn from(values: Vec<S>) -> Self {
        Record::Positional(values.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, String>> for Record {
    fn from(fields: IndexMap<String, String>) -> Self {
        Record::Named(fields)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Record::Named(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Turns a header cell into a record field name.
///
/// The cell is lower-cased and every single space becomes an underscore.
/// Runs of spaces are not collapsed, so `"User  ID"` becomes `"user__id"`.
pub fn normalize_field_name(cell: &str) -> String {
    cell.replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_cells_should_be_lowercased_with_underscores() {
        assert_eq!(normalize_field_name("First Name"), "first_name");
        assert_eq!(normalize_field_name("AGE"), "age");
        assert_eq!(normalize_field_name("User  ID"), "user__id");
        assert_eq!(normalize_field_name(" lead"), "_lead");
        assert_eq!(normalize_field_name("tab\there"), "tab\there");
    }

    #[test]
    fn named_record_keeps_insertion_order() {
        let record: Record = [("zeta", "1"), ("alpha", "2"), ("mid", "3")]
            .into_iter()
            .collect();

        assert!(record.is_named());
        assert_eq!(record.values(), vec!["1", "2", "3"]);
        assert_eq!(record.get_index(1), Some("2"));
        assert_eq!(record.get("mid"), Some("3"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn positional_record_has_no_named_fields() {
        let record = Record::from(vec!["a", "b"]);

        assert!(!record.is_named());
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), None);
        assert_eq!(record.get_index(0), Some("a"));
        assert_eq!(record.get_index(2), None);
    }

    #[test]
    fn records_serialize_as_json_arrays_or_objects() -> Result<(), serde_json::Error> {
        let row = Record::from(vec!["Ann", "30"]);
        let person: Record = [("name", "Ann"), ("age", "30")].into_iter().collect();

        assert_eq!(serde_json::to_string(&row)?, r#"["Ann","30"]"#);
        assert_eq!(serde_json::to_string(&person)?, r#"{"name":"Ann","age":"30"}"#);

        let back: Record = serde_json::from_str(r#"{"name":"Ann","age":"30"}"#)?;
        assert_eq!(back, person);

        Ok(())
    }
}
