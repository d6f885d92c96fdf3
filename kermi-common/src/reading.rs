use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Register groups polled on the x-center appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadGroup {
    State,
    Power,
    WorkHours,
    Pv,
    Alarm,
}

impl ReadGroup {
    /// Get the string representation used in metric paths and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadGroup::State => "state",
            ReadGroup::Power => "power",
            ReadGroup::WorkHours => "work_hours",
            ReadGroup::Pv => "pv",
            ReadGroup::Alarm => "alarm",
        }
    }
}

impl std::fmt::Display for ReadGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single decoded value read from the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReading {
    /// Unix epoch milliseconds when the value was read.
    pub timestamp: i64,

    /// Device name from configuration.
    pub device: String,

    /// Register group the value came from.
    pub group: ReadGroup,

    /// Metric name (e.g., "global_state", "combined_power").
    pub metric: String,

    /// The decoded value.
    pub value: ReadingValue,

    /// Unit of measurement, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl DeviceReading {
    /// Create a new reading with the current timestamp.
    pub fn new(
        device: impl Into<String>,
        group: ReadGroup,
        metric: impl Into<String>,
        value: ReadingValue,
    ) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            device: device.into(),
            group,
            metric: metric.into(),
            value,
            unit: None,
        }
    }

    /// Attach a unit of measurement.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Typed reading value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReadingValue {
    /// Counter (monotonically increasing, e.g. work hours).
    Counter(u64),

    /// Gauge (can go up or down).
    Gauge(f64),

    /// Boolean value.
    Boolean(bool),

    /// Text value.
    Text(String),
}

impl From<u64> for ReadingValue {
    fn from(v: u64) -> Self {
        ReadingValue::Counter(v)
    }
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        ReadingValue::Gauge(v)
    }
}

impl From<bool> for ReadingValue {
    fn from(v: bool) -> Self {
        ReadingValue::Boolean(v)
    }
}

impl From<&str> for ReadingValue {
    fn from(v: &str) -> Self {
        ReadingValue::Text(v.to_string())
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_creation() {
        let reading = DeviceReading::new(
            "xcenter01",
            ReadGroup::Power,
            "combined_power",
            ReadingValue::Gauge(1250.0),
        )
        .with_unit("W");

        assert_eq!(reading.device, "xcenter01");
        assert_eq!(reading.group, ReadGroup::Power);
        assert_eq!(reading.metric, "combined_power");
        assert_eq!(reading.value, ReadingValue::Gauge(1250.0));
        assert_eq!(reading.unit.as_deref(), Some("W"));
        assert!(reading.timestamp > 0);
    }

    #[test]
    fn test_group_display() {
        assert_eq!(ReadGroup::State.as_str(), "state");
        assert_eq!(ReadGroup::WorkHours.as_str(), "work_hours");
        assert_eq!(format!("{}", ReadGroup::Pv), "pv");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(ReadingValue::from(42u64), ReadingValue::Counter(42));
        assert_eq!(ReadingValue::from(3.14), ReadingValue::Gauge(3.14));
        assert_eq!(ReadingValue::from(true), ReadingValue::Boolean(true));
        assert_eq!(
            ReadingValue::from("heating"),
            ReadingValue::Text("heating".to_string())
        );
    }
}
