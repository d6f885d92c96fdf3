//! Scripted test doubles for the framework surfaces.
//!
//! Kept in-tree so unit tests and the device crates' integration tests share
//! one set of doubles instead of each re-implementing the traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kermi_common::{DeviceReading, ThingStatus, ThingStatusInfo};

use crate::bridge::{BridgeHandle, EndpointCapability};
use crate::channel::{ModbusInterface, PollCallback, PollHandle, PollOutcome, RegisterRange};
use crate::error::{ChannelError, EndpointError};
use crate::thing::{ReadingSink, StatusSink};

struct MockPoll {
    range: RegisterRange,
    callback: PollCallback,
}

/// Channel double that records registrations and lets tests drive the poll
/// callbacks by hand.
pub struct MockInterface {
    polls: Mutex<HashMap<u64, MockPoll>>,
    next_id: AtomicU64,
    attempts: AtomicUsize,
    fail_from: Option<usize>,
}

impl MockInterface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            polls: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            attempts: AtomicUsize::new(0),
            fail_from: None,
        })
    }

    /// A channel whose registrations fail from the `n`-th attempt on
    /// (0-based).
    pub fn failing_from(n: usize) -> Arc<Self> {
        Arc::new(Self {
            polls: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            attempts: AtomicUsize::new(0),
            fail_from: Some(n),
        })
    }

    /// Number of currently registered polls.
    pub fn active_polls(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    /// Total number of registration attempts, successful or not.
    pub fn registration_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Invoke the callback of the poll covering `address`.
    ///
    /// Panics when no poll is registered for that address.
    pub fn fire(&self, address: u16, outcome: PollOutcome) {
        let callback = {
            let polls = self.polls.lock().unwrap();
            polls
                .values()
                .find(|poll| poll.range.address == address)
                .map(|poll| poll.callback.clone())
        };
        let callback = callback.expect("no poll registered for address");
        callback(outcome);
    }
}

impl ModbusInterface for MockInterface {
    fn register_regular_poll(
        &self,
        range: RegisterRange,
        _interval: Duration,
        callback: PollCallback,
    ) -> Result<PollHandle, ChannelError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|n| attempt >= n) {
            return Err(ChannelError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .insert(id, MockPoll { range, callback });
        Ok(PollHandle::new(id))
    }

    fn unregister_regular_poll(&self, handle: &PollHandle) {
        self.polls.lock().unwrap().remove(&handle.id());
    }
}

/// Endpoint double with a controllable initialization state.
pub struct MockEndpoint {
    slave_id: u8,
    initialized: AtomicBool,
    channel: Mutex<Option<Arc<dyn ModbusInterface>>>,
}

impl MockEndpoint {
    /// An initialized endpoint offering `channel`.
    pub fn new(slave_id: u8, channel: Arc<dyn ModbusInterface>) -> Arc<Self> {
        Arc::new(Self {
            slave_id,
            initialized: AtomicBool::new(true),
            channel: Mutex::new(Some(channel)),
        })
    }

    /// An endpoint still in its own startup (queries fail).
    pub fn uninitialized(slave_id: u8) -> Arc<Self> {
        Arc::new(Self {
            slave_id,
            initialized: AtomicBool::new(false),
            channel: Mutex::new(None),
        })
    }

    /// An initialized endpoint that has no channel to offer.
    pub fn without_channel(slave_id: u8) -> Arc<Self> {
        Arc::new(Self {
            slave_id,
            initialized: AtomicBool::new(true),
            channel: Mutex::new(None),
        })
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::SeqCst);
    }
}

impl EndpointCapability for MockEndpoint {
    fn slave_id(&self) -> Result<u8, EndpointError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(EndpointError::NotInitialized);
        }
        Ok(self.slave_id)
    }

    fn communication_interface(
        &self,
    ) -> Result<Option<Arc<dyn ModbusInterface>>, EndpointError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(EndpointError::NotInitialized);
        }
        Ok(self.channel.lock().unwrap().clone())
    }
}

/// Bridge double with settable status and endpoint, counting endpoint
/// queries so caching behavior is observable.
pub struct MockBridge {
    label: String,
    status: Mutex<ThingStatus>,
    endpoint: Mutex<Option<Arc<dyn EndpointCapability>>>,
    endpoint_queries: AtomicUsize,
}

impl MockBridge {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            status: Mutex::new(ThingStatus::Online),
            endpoint: Mutex::new(None),
            endpoint_queries: AtomicUsize::new(0),
        })
    }

    pub fn set_status(&self, status: ThingStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_endpoint(&self, endpoint: Arc<dyn EndpointCapability>) {
        *self.endpoint.lock().unwrap() = Some(endpoint);
    }

    /// How many times a child queried the endpoint capability.
    pub fn endpoint_queries(&self) -> usize {
        self.endpoint_queries.load(Ordering::SeqCst)
    }
}

impl BridgeHandle for MockBridge {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn status(&self) -> ThingStatus {
        *self.status.lock().unwrap()
    }

    fn endpoint(&self) -> Option<Arc<dyn EndpointCapability>> {
        self.endpoint_queries.fetch_add(1, Ordering::SeqCst);
        self.endpoint.lock().unwrap().clone()
    }
}

/// Status sink recording every update it receives.
pub struct RecordingStatusSink {
    events: Mutex<Vec<ThingStatusInfo>>,
}

impl RecordingStatusSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<ThingStatusInfo> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ThingStatusInfo> {
        self.events.lock().unwrap().last().cloned()
    }
}

impl StatusSink for RecordingStatusSink {
    fn update_status(&self, info: ThingStatusInfo) {
        self.events.lock().unwrap().push(info);
    }
}

/// Reading sink recording every published reading.
pub struct RecordingReadingSink {
    readings: Mutex<Vec<DeviceReading>>,
}

impl RecordingReadingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            readings: Mutex::new(Vec::new()),
        })
    }

    pub fn readings(&self) -> Vec<DeviceReading> {
        self.readings.lock().unwrap().clone()
    }
}

impl ReadingSink for RecordingReadingSink {
    fn publish(&self, reading: &DeviceReading) {
        self.readings.lock().unwrap().push(reading.clone());
    }
}
