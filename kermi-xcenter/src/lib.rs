//! Thing handler for the Kermi x-center heating/storage appliance.
//!
//! The handler reaches the appliance over Modbus through a parent bridge,
//! polls five register groups (state, power, work-hours, PV, alarm) and
//! consolidates the per-group read outcomes into one online/offline verdict:
//!
//! - the state register is the primary liveness signal,
//! - the alarm register corroborates it,
//! - power, work-hours and PV are informational only.
//!
//! Decoded register values are published as [`kermi_common::DeviceReading`]s.

pub mod aggregator;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod poll;
pub mod reporter;
