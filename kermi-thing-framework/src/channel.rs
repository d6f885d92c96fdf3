//! Modbus communication channel with recurring-poll registration.
//!
//! The concrete [`ModbusConnection`] wraps a `tokio-modbus` client context
//! (TCP or RTU/serial). Recurring polls run as tokio tasks that read their
//! register range, hand the outcome to the registered callback and sleep for
//! the poll interval.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;
use tracing::debug;

use crate::connection::ConnectionConfig;
use crate::error::ChannelError;

/// Modbus register table selector for a read request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterKind {
    /// Input registers (read-only, 16-bit)
    Input,
    /// Holding registers (read/write, 16-bit)
    #[default]
    Holding,
}

/// A contiguous register range covered by one read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRange {
    /// Register table to read from.
    pub kind: RegisterKind,
    /// Starting address (0-based).
    pub address: u16,
    /// Number of registers to read.
    pub count: u16,
}

/// Outcome of one poll cycle delivered to the registered callback.
pub type PollOutcome = Result<Vec<u16>, ChannelError>;

/// Callback invoked exactly once per poll cycle.
pub type PollCallback = Arc<dyn Fn(PollOutcome) + Send + Sync>;

/// Handle for one registered recurring poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollHandle {
    id: u64,
}

impl PollHandle {
    /// Create a handle with the given registration id.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// The registration id behind this handle.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Register read and recurring-poll surface of a communication channel.
///
/// The parent bridge owns the concrete channel; Thing handlers hold a shared
/// reference and only register and deregister their own polls. Closing the
/// channel is the owner's business.
pub trait ModbusInterface: Send + Sync {
    /// Register a recurring poll over `range`, invoking `callback` once per
    /// cycle with either the raw words or a transport failure.
    ///
    /// Fails when the owning bridge has already closed the channel.
    fn register_regular_poll(
        &self,
        range: RegisterRange,
        interval: Duration,
        callback: PollCallback,
    ) -> Result<PollHandle, ChannelError>;

    /// Deregister a recurring poll.
    ///
    /// Deregistering an unknown or already-deregistered handle is a no-op.
    fn unregister_regular_poll(&self, handle: &PollHandle);
}

/// Concrete communication channel over tokio-modbus (TCP or RTU).
pub struct ModbusConnection {
    me: Weak<Self>,
    ctx: tokio::sync::Mutex<Context>,
    timeout: Duration,
    polls: Mutex<HashMap<u64, JoinHandle<()>>>,
    next_poll_id: AtomicU64,
    closed: AtomicBool,
}

impl ModbusConnection {
    /// Connect to the device endpoint.
    pub async fn connect(
        config: &ConnectionConfig,
        slave_id: u8,
        timeout: Duration,
    ) -> Result<Arc<Self>, ChannelError> {
        let slave = Slave(slave_id);

        let ctx = match config {
            ConnectionConfig::Tcp { host, port } => {
                let addr: SocketAddr = format!("{}:{}", host, port)
                    .parse()
                    .map_err(|e| ChannelError::Connection(format!("Invalid address: {}", e)))?;

                tokio::time::timeout(timeout, tcp::connect_slave(addr, slave))
                    .await
                    .map_err(|_| ChannelError::Connection("Connection timeout".to_string()))?
                    .map_err(|e| ChannelError::Connection(e.to_string()))?
            }
            ConnectionConfig::Rtu {
                port,
                baud_rate,
                data_bits,
                parity,
                stop_bits,
            } => {
                let parity = match parity.to_lowercase().as_str() {
                    "even" => tokio_serial::Parity::Even,
                    "odd" => tokio_serial::Parity::Odd,
                    _ => tokio_serial::Parity::None,
                };

                let stop_bits = match stop_bits {
                    2 => tokio_serial::StopBits::Two,
                    _ => tokio_serial::StopBits::One,
                };

                let data_bits = match data_bits {
                    5 => tokio_serial::DataBits::Five,
                    6 => tokio_serial::DataBits::Six,
                    7 => tokio_serial::DataBits::Seven,
                    _ => tokio_serial::DataBits::Eight,
                };

                let builder = tokio_serial::new(port, *baud_rate)
                    .parity(parity)
                    .stop_bits(stop_bits)
                    .data_bits(data_bits);

                let serial = tokio_serial::SerialStream::open(&builder)
                    .map_err(|e| ChannelError::Connection(format!("Serial open failed: {}", e)))?;

                rtu::attach_slave(serial, slave)
            }
        };

        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ctx: tokio::sync::Mutex::new(ctx),
            timeout,
            polls: Mutex::new(HashMap::new()),
            next_poll_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }))
    }

    /// One-shot read of a register range.
    pub async fn read(&self, range: RegisterRange) -> Result<Vec<u16>, ChannelError> {
        let mut ctx = self.ctx.lock().await;

        let request = async {
            match range.kind {
                RegisterKind::Input => ctx.read_input_registers(range.address, range.count).await,
                RegisterKind::Holding => {
                    ctx.read_holding_registers(range.address, range.count).await
                }
            }
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ChannelError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| ChannelError::Read(e.to_string()))?
            .map_err(|e| ChannelError::Exception(format!("{:?}", e)))
    }

    /// Whether the owning bridge has closed the channel.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of currently registered recurring polls.
    pub fn active_polls(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    /// Close the channel: abort every recurring poll and refuse further
    /// registrations. Only the owning bridge calls this.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut polls = self.polls.lock().unwrap();
        let count = polls.len();
        for (_, task) in polls.drain() {
            task.abort();
        }
        if count > 0 {
            debug!(count = count, "Aborted recurring polls on channel close");
        }
    }
}

impl ModbusInterface for ModbusConnection {
    fn register_regular_poll(
        &self,
        range: RegisterRange,
        interval: Duration,
        callback: PollCallback,
    ) -> Result<PollHandle, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }

        let id = self.next_poll_id.fetch_add(1, Ordering::SeqCst);
        let me = self.me.clone();
        let task = tokio::spawn(async move {
            loop {
                // The task holds no strong reference so an abandoned
                // connection can still be dropped.
                let Some(connection) = me.upgrade() else { break };
                if connection.is_closed() {
                    break;
                }
                let outcome = connection.read(range).await;
                drop(connection);
                callback(outcome);
                tokio::time::sleep(interval).await;
            }
        });

        let mut polls = self.polls.lock().unwrap();
        if self.is_closed() {
            // close() raced the registration; do not leak the task
            task.abort();
            return Err(ChannelError::Closed);
        }
        polls.insert(id, task);
        debug!(
            poll = id,
            address = range.address,
            count = range.count,
            interval_ms = interval.as_millis() as u64,
            "Registered regular poll"
        );

        Ok(PollHandle::new(id))
    }

    fn unregister_regular_poll(&self, handle: &PollHandle) {
        let mut polls = self.polls.lock().unwrap();
        if let Some(task) = polls.remove(&handle.id()) {
            task.abort();
            debug!(poll = handle.id(), "Deregistered regular poll");
        }
    }
}
