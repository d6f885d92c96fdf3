//! Kermi Thing Framework
//!
//! Common abstractions for building Thing handlers that reach their device
//! through a parent Modbus bridge.
//!
//! # Overview
//!
//! This framework provides:
//! - [`ThingHandler`] lifecycle surface plus [`StatusSink`]/[`ReadingSink`] outputs
//! - [`BridgeHandle`] and [`EndpointCapability`] for the parent bridge
//! - [`ModbusInterface`] with recurring-poll registration and the concrete
//!   [`ModbusConnection`] transport (TCP and RTU)
//! - [`ModbusEndpointHandler`], the bridge handler owning the shared channel
//! - [`ThingArgs`] for common CLI argument parsing
//! - [`mock`] test doubles shared across the workspace
//!
//! # Example
//!
//! ```ignore
//! use kermi_thing_framework::{ModbusEndpointHandler, ThingHandler};
//!
//! let bridge = ModbusEndpointHandler::new("heat pump bridge", 1, connection, timeout);
//! bridge.connect().await?;
//!
//! let handler = MyThingHandler::new(config, bridge.clone());
//! handler.initialize();
//! ```

pub mod args;
pub mod bridge;
pub mod channel;
pub mod connection;
pub mod error;
pub mod mock;
pub mod thing;

pub use args::ThingArgs;
pub use bridge::{BridgeHandle, EndpointCapability, ModbusEndpointHandler};
pub use channel::{
    ModbusConnection, ModbusInterface, PollCallback, PollHandle, PollOutcome, RegisterKind,
    RegisterRange,
};
pub use connection::ConnectionConfig;
pub use error::{ChannelError, EndpointError};
pub use thing::{
    Command, ReadingSink, StatusSink, ThingHandler, TracingReadingSink, TracingStatusSink,
};
