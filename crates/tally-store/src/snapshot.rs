//! Point-in-time copy of the store, and its on-disk JSON form.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Both kind-spaces of a [`MetricStore`](crate::MetricStore) at one instant.
///
/// Serializes as `{"Gauges": {name: f64}, "Counters": {name: i64}}`.
/// A missing or `null` mapping decodes as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "Gauges", default, deserialize_with = "null_as_empty")]
    pub gauges: BTreeMap<String, f64>,
    #[serde(rename = "Counters", default, deserialize_with = "null_as_empty")]
    pub counters: BTreeMap<String, i64>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty() && self.counters.is_empty()
    }

    /// Total number of metrics across both kinds.
    pub fn len(&self) -> usize {
        self.gauges.len() + self.counters.len()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_wire_format() {
        let mut snapshot = Snapshot::default();
        snapshot.gauges.insert("Alloc".to_string(), 12.5);
        snapshot.counters.insert("PollCount".to_string(), 8);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"Gauges":{"Alloc":12.5},"Counters":{"PollCount":8}}"#);
    }

    #[test]
    fn missing_and_null_mappings_decode_empty() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"Gauges":null}"#).unwrap();
        assert!(snapshot.is_empty());

        let snapshot: Snapshot = serde_json::from_str(r#"{"Counters":{"c":3}}"#).unwrap();
        assert!(snapshot.gauges.is_empty());
        assert_eq!(snapshot.counters["c"], 3);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn rejects_wrong_value_types() {
        assert!(serde_json::from_str::<Snapshot>(r#"{"Counters":{"c":1.5}}"#).is_err());
        assert!(serde_json::from_str::<Snapshot>(r#"{"Gauges":{"g":"x"}}"#).is_err());
    }
}
