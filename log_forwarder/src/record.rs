use serde::ser::{Serialize, SerializeMap, Serializer};

pub const DATE_FIELD: &str = "date";
pub const TIME_FIELD: &str = "time";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One access-log line keyed by the names from the `#Fields:` header.
///
/// Fields are kept in header order so the serialized form is stable; a
/// `timestamp` added by [`merge_date_and_time`] goes last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    fields: Vec<(String, String)>,
}

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets `name` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.fields.iter().position(|(key, _)| key == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical form of the record, as sent to CloudWatch Logs.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LogRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = LogRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Replaces the `date` and `time` columns of every record with a single
/// `{date}T{time}` timestamp. Missing columns count as empty strings.
pub fn merge_date_and_time(records: &mut [LogRecord]) {
    for record in records.iter_mut() {
        let date = record.remove(DATE_FIELD).unwrap_or_default();
        let time = record.remove(TIME_FIELD).unwrap_or_default();
        record.insert(TIMESTAMP_FIELD, format!("{}T{}", date, time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_date_and_time() {
        let mut records = vec![LogRecord::from_iter([
            ("date", "2024-03-01"),
            ("time", "12:00:00"),
            ("x-edge-location", "HEL51-P1"),
        ])];
        merge_date_and_time(&mut records);

        let record = &records[0];
        assert_eq!(record.get(TIMESTAMP_FIELD), Some("2024-03-01T12:00:00"));
        assert!(!record.contains(DATE_FIELD));
        assert!(!record.contains(TIME_FIELD));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["x-edge-location", "timestamp"]);
    }

    #[test]
    fn missing_date_or_time_is_empty() {
        let mut records = vec![
            LogRecord::from_iter([("time", "01:02:03")]),
            LogRecord::from_iter([("date", "2024-03-01")]),
        ];
        merge_date_and_time(&mut records);
        assert_eq!(records[0].get(TIMESTAMP_FIELD), Some("T01:02:03"));
        assert_eq!(records[1].get(TIMESTAMP_FIELD), Some("2024-03-01T"));
    }

    #[test]
    fn serializes_in_field_order() {
        let record = LogRecord::from_iter([("b", "2"), ("a", "1"), ("c", "\"quoted\"")]);
        assert_eq!(record.to_json().unwrap(), r#"{"b":"2","a":"1","c":"\"quoted\""}"#);
    }

    #[test]
    fn insert_replaces_existing_value() {
        let mut record = LogRecord::from_iter([("a", "1")]);
        assert_eq!(record.insert("a", "2"), Some("1".to_string()));
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some("2"));
    }
}
