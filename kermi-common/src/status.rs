//! Thing status model shared between the framework and device handlers.

use serde::{Deserialize, Serialize};

/// Coarse availability status of a Thing or bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThingStatus {
    /// Status has not been established yet.
    #[default]
    Unknown,
    /// The Thing is communicating normally.
    Online,
    /// The Thing is not reachable.
    Offline,
}

impl std::fmt::Display for ThingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThingStatus::Unknown => write!(f, "unknown"),
            ThingStatus::Online => write!(f, "online"),
            ThingStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Detail qualifying an offline or unknown status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThingStatusDetail {
    /// No further detail.
    #[default]
    None,
    /// Communication with the device failed.
    CommunicationError,
    /// The Thing configuration is missing or invalid.
    ConfigurationError,
    /// The parent bridge is not available.
    BridgeOffline,
}

/// A status update as delivered to the status subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingStatusInfo {
    /// The coarse status.
    pub status: ThingStatus,
    /// Detail qualifying the status.
    #[serde(default)]
    pub detail: ThingStatusDetail,
    /// Human-readable description of the detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ThingStatusInfo {
    /// Status for a Thing whose handler is still initializing.
    pub fn unknown() -> Self {
        Self {
            status: ThingStatus::Unknown,
            detail: ThingStatusDetail::None,
            message: None,
        }
    }

    /// Online status, clearing any prior error detail.
    pub fn online() -> Self {
        Self {
            status: ThingStatus::Online,
            detail: ThingStatusDetail::None,
            message: None,
        }
    }

    /// Offline status with a detail and description.
    pub fn offline(detail: ThingStatusDetail, message: impl Into<String>) -> Self {
        Self {
            status: ThingStatus::Offline,
            detail,
            message: Some(message.into()),
        }
    }
}

impl std::fmt::Display for ThingStatusInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status)?;
        if self.detail != ThingStatusDetail::None {
            write!(f, " ({:?})", self.detail)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}
