//! Configuration for the x-center Thing.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use kermi_common::{LoggingConfig, ReadGroup};
use kermi_thing_framework::{ConnectionConfig, RegisterKind, RegisterRange};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete configuration for one x-center Thing and its bridge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XcenterConfig {
    /// Thing name (used in readings and log lines).
    #[serde(default = "default_name")]
    pub name: String,

    /// Connection of the parent bridge endpoint.
    pub connection: ConnectionConfig,

    /// Modbus slave id (1-247).
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,

    /// Transport timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the photovoltaic extension is installed.
    #[serde(default)]
    pub pv_enabled: bool,

    /// Register groups to poll.
    #[serde(default)]
    pub groups: GroupsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_name() -> String {
    "xcenter".to_string()
}

fn default_slave_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Register ranges polled per group.
///
/// The addresses default to the x-center register map; installations with a
/// different firmware layout override them in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default = "default_state_group")]
    pub state: GroupPollConfig,

    #[serde(default = "default_power_group")]
    pub power: GroupPollConfig,

    #[serde(default = "default_work_hours_group")]
    pub work_hours: GroupPollConfig,

    #[serde(default = "default_pv_group")]
    pub pv: GroupPollConfig,

    #[serde(default = "default_alarm_group")]
    pub alarm: GroupPollConfig,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            state: default_state_group(),
            power: default_power_group(),
            work_hours: default_work_hours_group(),
            pv: default_pv_group(),
            alarm: default_alarm_group(),
        }
    }
}

fn default_state_group() -> GroupPollConfig {
    GroupPollConfig {
        kind: RegisterKind::Holding,
        address: 100,
        count: 1,
        interval_ms: 5_000,
        points: vec![PointConfig::named("global_state", 0)],
    }
}

fn default_power_group() -> GroupPollConfig {
    GroupPollConfig {
        kind: RegisterKind::Holding,
        address: 120,
        count: 4,
        interval_ms: 5_000,
        points: vec![PointConfig::named("combined_power", 0).with_unit("W")],
    }
}

fn default_work_hours_group() -> GroupPollConfig {
    GroupPollConfig {
        kind: RegisterKind::Holding,
        address: 150,
        count: 2,
        interval_ms: 60_000,
        points: vec![PointConfig {
            data_type: DataType::U32,
            ..PointConfig::named("compressor_hours", 0).with_unit("h")
        }],
    }
}

fn default_pv_group() -> GroupPollConfig {
    GroupPollConfig {
        kind: RegisterKind::Holding,
        address: 200,
        count: 2,
        interval_ms: 5_000,
        points: vec![PointConfig::named("pv_power", 0).with_unit("W")],
    }
}

fn default_alarm_group() -> GroupPollConfig {
    GroupPollConfig {
        kind: RegisterKind::Holding,
        address: 250,
        count: 1,
        interval_ms: 5_000,
        points: vec![PointConfig::named("alarm_state", 0)],
    }
}

/// One register group's poll parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPollConfig {
    /// Register table (input or holding).
    #[serde(default)]
    pub kind: RegisterKind,

    /// Starting address (0-based).
    pub address: u16,

    /// Number of registers to read.
    #[serde(default = "default_count")]
    pub count: u16,

    /// Poll interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Decoded points within the range.
    #[serde(default)]
    pub points: Vec<PointConfig>,
}

fn default_count() -> u16 {
    1
}

fn default_interval_ms() -> u64 {
    5_000
}

impl GroupPollConfig {
    /// The register range covered by this group's poll.
    pub fn range(&self) -> RegisterRange {
        RegisterRange {
            kind: self.kind,
            address: self.address,
            count: self.count,
        }
    }

    /// The poll interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// A decoded point within a group's register range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    /// Point name (used as the reading metric).
    pub name: String,

    /// Word offset inside the polled range.
    #[serde(default)]
    pub index: usize,

    /// Data type interpretation.
    #[serde(default)]
    pub data_type: DataType,

    /// Scaling factor (value * scale).
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Offset (value * scale + offset).
    #[serde(default)]
    pub offset: f64,

    /// Unit of measurement (for metadata).
    pub unit: Option<String>,
}

fn default_scale() -> f64 {
    1.0
}

impl PointConfig {
    /// A plain u16 point at `index`.
    pub fn named(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            data_type: DataType::default(),
            scale: default_scale(),
            offset: 0.0,
            unit: None,
        }
    }

    /// Attach a unit of measurement.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Data type interpretation for 16-bit registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unsigned 16-bit integer (default)
    #[default]
    U16,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 32-bit integer (2 registers, big-endian)
    U32,
    /// Signed 32-bit integer (2 registers, big-endian)
    I32,
    /// 32-bit float (2 registers, big-endian)
    F32,
    /// Unsigned 32-bit integer (2 registers, little-endian word order)
    U32Le,
    /// Signed 32-bit integer (2 registers, little-endian word order)
    I32Le,
    /// 32-bit float (2 registers, little-endian word order)
    F32Le,
}

impl DataType {
    /// How many 16-bit registers one value of this type occupies.
    pub fn words(&self) -> usize {
        match self {
            DataType::U16 | DataType::I16 => 1,
            _ => 2,
        }
    }
}

impl XcenterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: XcenterConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation(
                "Thing name cannot be empty".to_string(),
            ));
        }

        if self.slave_id == 0 {
            return Err(ConfigError::Validation(format!(
                "Thing '{}': slave_id must be 1-247",
                self.name
            )));
        }

        self.connection
            .validate()
            .map_err(|e| ConfigError::Validation(format!("Thing '{}': {}", self.name, e)))?;

        for group in self.tracked_groups() {
            let config = self.group(group);
            if config.count == 0 {
                return Err(ConfigError::Validation(format!(
                    "Group '{}': count must be at least 1",
                    group
                )));
            }
            for point in &config.points {
                if point.index + point.data_type.words() > config.count as usize {
                    return Err(ConfigError::Validation(format!(
                        "Group '{}': point '{}' lies outside the polled range",
                        group, point.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// The poll parameters for one group.
    pub fn group(&self, group: ReadGroup) -> &GroupPollConfig {
        match group {
            ReadGroup::State => &self.groups.state,
            ReadGroup::Power => &self.groups.power,
            ReadGroup::WorkHours => &self.groups.work_hours,
            ReadGroup::Pv => &self.groups.pv,
            ReadGroup::Alarm => &self.groups.alarm,
        }
    }

    /// The groups polled on this installation (PV only when enabled).
    pub fn tracked_groups(&self) -> Vec<ReadGroup> {
        let mut groups = vec![ReadGroup::State, ReadGroup::Power, ReadGroup::WorkHours];
        if self.pv_enabled {
            groups.push(ReadGroup::Pv);
        }
        groups.push(ReadGroup::Alarm);
        groups
    }
}
