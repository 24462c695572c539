//! Metric domain types.
//!
//! A metric is either a counter (deltas accumulate on the server) or a
//! gauge (values replace). The in-process representation is the closed
//! [`MetricValue`] enum; [`MetricPayload`] is the JSON form that travels
//! over HTTP and must be validated before it becomes a [`Metric`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MetricError, MetricResult};

// ── Kinds and values ──────────────────────────────────────────────

/// The two metric kinds understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }

    /// Parse a textual value according to this kind: `i64` for counters,
    /// finite `f64` for gauges.
    pub fn parse_value(self, raw: &str) -> MetricResult<MetricValue> {
        let invalid = |reason: String| MetricError::InvalidValue {
            kind: self,
            raw: raw.to_string(),
            reason,
        };
        match self {
            MetricKind::Counter => raw
                .parse::<i64>()
                .map(MetricValue::Counter)
                .map_err(|e| invalid(e.to_string())),
            MetricKind::Gauge => {
                let value = raw.parse::<f64>().map_err(|e| invalid(e.to_string()))?;
                finite_gauge(value, raw)
            }
        }
    }
}

/// Gauges must be finite: JSON has no encoding for NaN or infinity.
fn finite_gauge(value: f64, raw: &str) -> MetricResult<MetricValue> {
    if value.is_finite() {
        Ok(MetricValue::Gauge(value))
    } else {
        Err(MetricError::InvalidValue {
            kind: MetricKind::Gauge,
            raw: raw.to_string(),
            reason: "value is not finite".to_string(),
        })
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(MetricError::UnknownKind(other.to_string())),
        }
    }
}

/// Payload of a single metric update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Amount to add to the stored counter.
    Counter(i64),
    /// Value that replaces the stored gauge.
    Gauge(f64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Counter(delta) => write!(f, "{delta}"),
            MetricValue::Gauge(value) => write!(f, "{value}"),
        }
    }
}

/// A named metric with its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn counter(name: impl Into<String>, delta: i64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Counter(delta),
        }
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

// ── Wire form ─────────────────────────────────────────────────────

/// JSON representation of a metric on the HTTP surface.
///
/// ```json
/// {"id": "PollCount", "type": "counter", "delta": 5}
/// {"id": "Alloc", "type": "gauge", "value": 12.5}
/// ```
///
/// Read requests (`POST /value`) carry only `id` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl MetricPayload {
    /// A read request for the named metric.
    pub fn query(kind: MetricKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            delta: None,
            value: None,
        }
    }

    /// Whether this payload names a metric and carries the field its kind
    /// requires.
    pub fn is_writable(&self) -> bool {
        self.to_metric().is_ok()
    }

    /// Whether this payload can be used to look a metric up.
    pub fn is_readable(&self) -> bool {
        !self.id.is_empty()
    }

    /// Validate the payload as an update.
    pub fn to_metric(&self) -> MetricResult<Metric> {
        if self.id.is_empty() {
            return Err(MetricError::EmptyName);
        }
        let missing = |field| MetricError::MissingPayload {
            kind: self.kind,
            name: self.id.clone(),
            field,
        };
        let value = match self.kind {
            MetricKind::Counter => MetricValue::Counter(self.delta.ok_or_else(|| missing("delta"))?),
            MetricKind::Gauge => {
                let value = self.value.ok_or_else(|| missing("value"))?;
                finite_gauge(value, &value.to_string())?
            }
        };
        Ok(Metric {
            name: self.id.clone(),
            value,
        })
    }
}

impl From<&Metric> for MetricPayload {
    fn from(metric: &Metric) -> Self {
        let (delta, value) = match metric.value {
            MetricValue::Counter(delta) => (Some(delta), None),
            MetricValue::Gauge(value) => (None, Some(value)),
        };
        Self {
            id: metric.name.clone(),
            kind: metric.kind(),
            delta,
            value,
        }
    }
}

impl fmt::Display for MetricPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────

/// Metrics sampled by the agent in one poll cycle, keyed by name.
///
/// Adding a metric whose name is already present replaces it.
#[derive(Debug, Clone, Default)]
pub struct Report {
    metrics: HashMap<String, Metric>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, metric: Metric) {
        self.metrics.insert(metric.name.clone(), metric);
    }

    /// Parse `raw` according to `kind` and add the result.
    pub fn add_unconverted(&mut self, kind: MetricKind, name: &str, raw: &str) -> MetricResult<()> {
        let value = kind.parse_value(raw)?;
        self.add(Metric {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(MetricKind::Gauge.to_string(), "gauge");
        assert_eq!(MetricKind::Counter.to_string(), "counter");
        assert_eq!("counter".parse::<MetricKind>().unwrap(), MetricKind::Counter);
        assert_eq!(
            "histogram".parse::<MetricKind>(),
            Err(MetricError::UnknownKind("histogram".to_string()))
        );
    }

    #[test]
    fn parse_value_per_kind() {
        assert_eq!(MetricKind::Counter.parse_value("20").unwrap(), MetricValue::Counter(20));
        assert_eq!(MetricKind::Gauge.parse_value("10").unwrap(), MetricValue::Gauge(10.0));
        assert!(MetricKind::Counter.parse_value("1.5").is_err());
        assert!(MetricKind::Counter.parse_value("ggg").is_err());
        assert!(MetricKind::Gauge.parse_value("jj").is_err());
    }

    #[test]
    fn gauges_must_be_finite() {
        for raw in ["NaN", "nan", "inf", "-inf", "infinity", "1e400"] {
            assert!(
                matches!(
                    MetricKind::Gauge.parse_value(raw),
                    Err(MetricError::InvalidValue { kind: MetricKind::Gauge, .. })
                ),
                "{raw}"
            );
        }

        let payload = MetricPayload {
            id: "g".to_string(),
            kind: MetricKind::Gauge,
            delta: None,
            value: Some(f64::NAN),
        };
        assert!(matches!(payload.to_metric(), Err(MetricError::InvalidValue { .. })));
        assert!(!payload.is_writable());

        let payload = MetricPayload {
            value: Some(f64::INFINITY),
            ..payload
        };
        assert!(matches!(payload.to_metric(), Err(MetricError::InvalidValue { .. })));
    }

    #[test]
    fn gauge_display_is_shortest_decimal() {
        assert_eq!(MetricValue::Gauge(7.0).to_string(), "7");
        assert_eq!(MetricValue::Gauge(12.5).to_string(), "12.5");
        assert_eq!(MetricValue::Counter(-3).to_string(), "-3");
    }

    #[test]
    fn payload_omits_absent_fields() {
        let json = serde_json::to_string(&MetricPayload::from(&Metric::counter("PollCount", 5))).unwrap();
        assert_eq!(json, r#"{"id":"PollCount","type":"counter","delta":5}"#);

        let json = serde_json::to_string(&MetricPayload::from(&Metric::gauge("Alloc", 12.5))).unwrap();
        assert_eq!(json, r#"{"id":"Alloc","type":"gauge","value":12.5}"#);
    }

    #[test]
    fn payload_rejects_unknown_type() {
        let err = serde_json::from_str::<MetricPayload>(r#"{"id":"x","type":"histogram","value":1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn writable_requires_matching_payload() {
        let counter_with_value: MetricPayload =
            serde_json::from_str(r#"{"id":"x","type":"counter","value":1.5}"#).unwrap();
        assert!(!counter_with_value.is_writable());
        assert!(counter_with_value.is_readable());

        let gauge: MetricPayload = serde_json::from_str(r#"{"id":"x","type":"gauge","value":1.5}"#).unwrap();
        assert_eq!(gauge.to_metric().unwrap(), Metric::gauge("x", 1.5));

        let unnamed: MetricPayload = serde_json::from_str(r#"{"id":"","type":"counter","delta":1}"#).unwrap();
        assert_eq!(unnamed.to_metric(), Err(MetricError::EmptyName));
        assert!(!unnamed.is_readable());
    }

    #[test]
    fn report_last_add_wins() {
        let mut report = Report::new();
        assert!(!report.has("test"));
        report.add_unconverted(MetricKind::Counter, "test1", "1").unwrap();
        report.add_unconverted(MetricKind::Counter, "test2", "2").unwrap();
        report.add_unconverted(MetricKind::Counter, "test3", "3").unwrap();
        report.add_unconverted(MetricKind::Counter, "test3", "4").unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.has("test1"));
        assert!(!report.has("test4"));
        assert_eq!(report.get("test3").unwrap().value, MetricValue::Counter(4));
    }

    #[test]
    fn report_add_unconverted_rejects_bad_value() {
        let mut report = Report::new();
        assert!(report.add_unconverted(MetricKind::Gauge, "g", "nope").is_err());
        assert!(report.is_empty());
    }
}
