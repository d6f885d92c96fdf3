//! Resolution errors for the x-center Thing.

use thiserror::Error;

use kermi_common::ThingStatusDetail;

/// Errors that keep the Thing from reaching its endpoint.
///
/// All of these are terminal for the current connection attempt: they are
/// reflected as an offline status and not retried until the framework
/// re-initializes the handler or the bridge comes back online.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XcenterError {
    /// No parent bridge is configured for the Thing.
    #[error("Bridge '<null>' is offline")]
    BridgeMissing,

    /// The parent bridge exists but is not online.
    #[error("Bridge '{label}' is offline")]
    BridgeOffline { label: String },

    /// The parent bridge's handler does not expose a Modbus endpoint.
    #[error("Bridge '{label}' does not expose a Modbus endpoint")]
    BridgeWrongType { label: String },

    /// The endpoint handler exists but has not finished initializing.
    #[error("Slave endpoint not initialized")]
    EndpointNotInitialized,

    /// The endpoint handler is initialized but offers no channel.
    #[error("Bridge '{label}' not completely initialized")]
    BridgeIncomplete { label: String },

    /// The Thing has no configuration.
    #[error("Kermi configuration missing")]
    ConfigurationMissing,
}

impl XcenterError {
    /// The status detail reported alongside this error.
    pub fn status_detail(&self) -> ThingStatusDetail {
        match self {
            XcenterError::BridgeMissing
            | XcenterError::BridgeOffline { .. }
            | XcenterError::BridgeWrongType { .. }
            | XcenterError::BridgeIncomplete { .. } => ThingStatusDetail::BridgeOffline,
            XcenterError::EndpointNotInitialized => ThingStatusDetail::CommunicationError,
            XcenterError::ConfigurationMissing => ThingStatusDetail::ConfigurationError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            XcenterError::BridgeOffline {
                label: "Heat pump".to_string()
            }
            .to_string(),
            "Bridge 'Heat pump' is offline"
        );
        assert_eq!(
            XcenterError::BridgeIncomplete {
                label: "Heat pump".to_string()
            }
            .to_string(),
            "Bridge 'Heat pump' not completely initialized"
        );
        assert_eq!(
            XcenterError::EndpointNotInitialized.to_string(),
            "Slave endpoint not initialized"
        );
    }

    #[test]
    fn test_status_details() {
        assert_eq!(
            XcenterError::BridgeMissing.status_detail(),
            ThingStatusDetail::BridgeOffline
        );
        assert_eq!(
            XcenterError::EndpointNotInitialized.status_detail(),
            ThingStatusDetail::CommunicationError
        );
        assert_eq!(
            XcenterError::ConfigurationMissing.status_detail(),
            ThingStatusDetail::ConfigurationError
        );
    }
}
