//! Endpoint resolution against the parent bridge.

use std::sync::{Arc, Mutex};

use tracing::debug;

use kermi_common::ThingStatus;
use kermi_thing_framework::{BridgeHandle, ModbusInterface};

use crate::error::XcenterError;

/// The resolved connection to the Modbus slave endpoint.
///
/// Either fully resolved (both fields valid) or absent; never partial.
#[derive(Clone)]
pub struct EndpointBinding {
    /// Shared communication channel, owned by the parent bridge.
    pub channel: Arc<dyn ModbusInterface>,
    /// Bus address of the device.
    pub slave_id: u8,
}

impl std::fmt::Debug for EndpointBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointBinding")
            .field("slave_id", &self.slave_id)
            .finish_non_exhaustive()
    }
}

/// Resolves and caches the endpoint binding behind the parent bridge.
///
/// Query-only: reflecting failures as an observable offline status is the
/// caller's job.
pub struct EndpointResolver {
    bridge: Option<Arc<dyn BridgeHandle>>,
    cached: Mutex<Option<EndpointBinding>>,
}

impl EndpointResolver {
    pub fn new(bridge: Option<Arc<dyn BridgeHandle>>) -> Self {
        Self {
            bridge,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached binding, or resolve a fresh one through the bridge.
    pub fn resolve(&self) -> Result<EndpointBinding, XcenterError> {
        let mut cached = self.cached.lock().unwrap();
        if let Some(binding) = cached.as_ref() {
            return Ok(binding.clone());
        }

        let bridge = self.bridge.as_ref().ok_or(XcenterError::BridgeMissing)?;
        let label = bridge.label();

        if bridge.status() != ThingStatus::Online {
            debug!(bridge = %label, "Bridge is not online");
            return Err(XcenterError::BridgeOffline { label });
        }

        let endpoint = bridge.endpoint().ok_or_else(|| {
            debug!(bridge = %label, "Bridge handler does not expose an endpoint");
            XcenterError::BridgeWrongType {
                label: label.clone(),
            }
        })?;

        let slave_id = endpoint
            .slave_id()
            .map_err(|_| XcenterError::EndpointNotInitialized)?;
        let channel = endpoint
            .communication_interface()
            .map_err(|_| XcenterError::EndpointNotInitialized)?
            .ok_or(XcenterError::BridgeIncomplete { label })?;

        let binding = EndpointBinding { channel, slave_id };
        *cached = Some(binding.clone());
        debug!(slave = slave_id, "Endpoint resolved");
        Ok(binding)
    }

    /// Drop the cached binding; the next resolve starts from the bridge again.
    pub fn invalidate(&self) {
        self.cached.lock().unwrap().take();
    }
}
