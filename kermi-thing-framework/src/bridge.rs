//! Parent bridge handler capabilities.
//!
//! A Thing handler never owns its Modbus connection; it reaches the device
//! through the endpoint capability of its parent bridge. The capability is a
//! trait rather than a concrete handler type, so resolution yields a typed
//! capability (or a typed error) instead of a runtime type check.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::info;

use kermi_common::ThingStatus;

use crate::channel::{ModbusConnection, ModbusInterface};
use crate::connection::ConnectionConfig;
use crate::error::{ChannelError, EndpointError};

/// Capability exposed by bridge handlers that own a Modbus slave endpoint.
pub trait EndpointCapability: Send + Sync {
    /// Bus address of the device behind this endpoint.
    fn slave_id(&self) -> Result<u8, EndpointError>;

    /// Communication channel to the endpoint.
    ///
    /// `Ok(None)` means the bridge handler finished initializing but has no
    /// channel to offer (e.g. its own connection attempt failed).
    fn communication_interface(&self)
    -> Result<Option<Arc<dyn ModbusInterface>>, EndpointError>;
}

/// A parent bridge handler as seen by a child Thing handler.
pub trait BridgeHandle: Send + Sync {
    /// Human-readable label used in status messages.
    fn label(&self) -> String;

    /// Current bridge status.
    fn status(&self) -> ThingStatus;

    /// The endpoint capability, or `None` when the bridge's handler does not
    /// expose one.
    fn endpoint(&self) -> Option<Arc<dyn EndpointCapability>>;
}

/// Bridge handler owning the shared Modbus connection for its children.
///
/// Children hold the channel only as a shared reference; the connection is
/// closed here, never by a child.
pub struct ModbusEndpointHandler {
    me: Weak<Self>,
    label: String,
    slave_id: u8,
    config: ConnectionConfig,
    timeout: Duration,
    inner: Mutex<EndpointState>,
}

#[derive(Default)]
struct EndpointState {
    status: ThingStatus,
    channel: Option<Arc<ModbusConnection>>,
}

impl ModbusEndpointHandler {
    /// Create the handler. The endpoint stays uninitialized until
    /// [`connect`](Self::connect) succeeds.
    pub fn new(
        label: impl Into<String>,
        slave_id: u8,
        config: ConnectionConfig,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            label: label.into(),
            slave_id,
            config,
            timeout,
            inner: Mutex::new(EndpointState::default()),
        })
    }

    /// Establish the connection and bring the bridge online.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let channel = ModbusConnection::connect(&self.config, self.slave_id, self.timeout).await?;

        let mut inner = self.inner.lock().unwrap();
        inner.channel = Some(channel);
        inner.status = ThingStatus::Online;
        info!(bridge = %self.label, slave = self.slave_id, "Bridge endpoint connected");
        Ok(())
    }

    /// Close the owned channel and mark the bridge offline.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(channel) = inner.channel.take() {
            channel.close();
        }
        inner.status = ThingStatus::Offline;
        info!(bridge = %self.label, "Bridge endpoint closed");
    }
}

impl EndpointCapability for ModbusEndpointHandler {
    fn slave_id(&self) -> Result<u8, EndpointError> {
        let inner = self.inner.lock().unwrap();
        if inner.status == ThingStatus::Unknown {
            return Err(EndpointError::NotInitialized);
        }
        Ok(self.slave_id)
    }

    fn communication_interface(
        &self,
    ) -> Result<Option<Arc<dyn ModbusInterface>>, EndpointError> {
        let inner = self.inner.lock().unwrap();
        if inner.status == ThingStatus::Unknown {
            return Err(EndpointError::NotInitialized);
        }
        Ok(inner
            .channel
            .clone()
            .map(|channel| channel as Arc<dyn ModbusInterface>))
    }
}

impl BridgeHandle for ModbusEndpointHandler {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn status(&self) -> ThingStatus {
        self.inner.lock().unwrap().status
    }

    fn endpoint(&self) -> Option<Arc<dyn EndpointCapability>> {
        self.me
            .upgrade()
            .map(|handler| handler as Arc<dyn EndpointCapability>)
    }
}
