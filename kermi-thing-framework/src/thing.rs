//! Thing handler lifecycle and sink abstractions.
//!
//! The host framework drives a device integration through [`ThingHandler`];
//! the integration reports back through [`StatusSink`] and [`ReadingSink`].
//! Handlers compose these traits instead of inheriting from a base handler.

use tracing::{debug, info, warn};

use kermi_common::{DeviceReading, ThingStatus, ThingStatusInfo};

/// Commands addressed to a Thing channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Request a fresh read of the channel.
    Refresh,
    /// Switch command.
    OnOff(bool),
    /// Numeric set-point.
    Number(f64),
}

/// Lifecycle surface a Thing handler implements for the host framework.
pub trait ThingHandler: Send + Sync {
    /// Start the handler. Long-running work is scheduled asynchronously; this
    /// call must not block the framework's initialization path.
    fn initialize(&self);

    /// Tear the handler down, releasing every resource it registered.
    ///
    /// Safe to call concurrently with an in-flight initialization.
    fn dispose(&self);

    /// Handle a command addressed to one of the Thing's channels.
    fn handle_command(&self, channel: &str, command: Command);

    /// Notification that the parent bridge changed status.
    fn bridge_status_changed(&self, status: ThingStatusInfo) {
        let _ = status;
    }
}

/// Receiver for Thing status updates.
///
/// Implementations must tolerate repeated identical updates; de-duplication
/// happens downstream.
pub trait StatusSink: Send + Sync {
    fn update_status(&self, info: ThingStatusInfo);
}

/// Receiver for decoded device readings.
pub trait ReadingSink: Send + Sync {
    fn publish(&self, reading: &DeviceReading);
}

/// Status sink that logs transitions through tracing.
#[derive(Debug, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn update_status(&self, info: ThingStatusInfo) {
        match info.status {
            ThingStatus::Offline => warn!(status = %info, "Thing status"),
            _ => info!(status = %info, "Thing status"),
        }
    }
}

/// Reading sink that logs values through tracing.
#[derive(Debug, Default)]
pub struct TracingReadingSink;

impl ReadingSink for TracingReadingSink {
    fn publish(&self, reading: &DeviceReading) {
        debug!(
            device = %reading.device,
            group = %reading.group,
            metric = %reading.metric,
            value = ?reading.value,
            "Reading"
        );
    }
}
