//! Error types for the Thing framework.

use thiserror::Error;

/// Errors raised by the Modbus transport channel.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// Establishing the connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A register read failed at the transport level.
    #[error("Read failed: {0}")]
    Read(String),

    /// The device answered with a Modbus exception.
    #[error("Modbus exception: {0}")]
    Exception(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The owning bridge has closed the channel.
    #[error("Channel is closed")]
    Closed,
}

/// Errors raised by the endpoint capability of a bridge handler.
#[derive(Debug, Clone, Error)]
pub enum EndpointError {
    /// The endpoint has not finished its own initialization yet.
    #[error("Slave endpoint not initialized")]
    NotInitialized,
}
