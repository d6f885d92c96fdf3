//! The x-center Thing handler.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use kermi_common::{ReadGroup, ThingStatus, ThingStatusDetail, ThingStatusInfo};
use kermi_thing_framework::{
    BridgeHandle, Command, PollCallback, ReadingSink, StatusSink, ThingHandler,
};

use crate::aggregator::{ReadAggregator, ReadStatus};
use crate::config::{GroupPollConfig, XcenterConfig};
use crate::decode::decode_group;
use crate::endpoint::EndpointResolver;
use crate::error::XcenterError;
use crate::poll::{PollPlan, PollRegistration, PollScheduler};
use crate::reporter::StatusReporter;

/// Thing handler for the Kermi x-center heating/storage appliance.
///
/// The handler is read-only: it resolves the endpoint through its parent
/// bridge, registers one recurring poll per register group and derives the
/// Thing's availability from the poll outcomes. Commands are not supported by
/// the device in this version.
pub struct XcenterThingHandler {
    config: Option<XcenterConfig>,
    bridge: Option<Arc<dyn BridgeHandle>>,
    resolver: Arc<EndpointResolver>,
    aggregator: Arc<ReadAggregator>,
    status: Arc<dyn StatusSink>,
    readings: Arc<dyn ReadingSink>,
    registrations: Arc<Mutex<Vec<PollRegistration>>>,
    disposed: Arc<AtomicBool>,
}

impl XcenterThingHandler {
    pub fn new(
        config: Option<XcenterConfig>,
        bridge: Option<Arc<dyn BridgeHandle>>,
        status: Arc<dyn StatusSink>,
        readings: Arc<dyn ReadingSink>,
    ) -> Arc<Self> {
        let pv_enabled = config.as_ref().is_some_and(|c| c.pv_enabled);
        let reporter = StatusReporter::new(status.clone());

        Arc::new(Self {
            config,
            bridge: bridge.clone(),
            resolver: Arc::new(EndpointResolver::new(bridge)),
            aggregator: Arc::new(ReadAggregator::new(pv_enabled, reporter)),
            status,
            readings,
            registrations: Arc::new(Mutex::new(Vec::new())),
            disposed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Schedule endpoint resolution and poll registration as one task,
    /// asynchronous with respect to the caller.
    fn spawn_connect(&self) {
        let Some(config) = self.config.clone() else {
            let error = XcenterError::ConfigurationMissing;
            warn!(error = %error, "Cannot initialize");
            self.status.update_status(ThingStatusInfo::offline(
                error.status_detail(),
                error.to_string(),
            ));
            return;
        };

        let resolver = self.resolver.clone();
        let aggregator = self.aggregator.clone();
        let status = self.status.clone();
        let readings = self.readings.clone();
        let registrations = self.registrations.clone();
        let disposed = self.disposed.clone();

        tokio::spawn(async move {
            let binding = match resolver.resolve() {
                Ok(binding) => binding,
                Err(error) => {
                    warn!(error = %error, "Endpoint resolution failed");
                    status.update_status(ThingStatusInfo::offline(
                        error.status_detail(),
                        error.to_string(),
                    ));
                    return;
                }
            };

            let plans = build_plans(&config, &aggregator, &readings);
            match PollScheduler::start(&binding, plans) {
                Ok(created) => {
                    let rolled_back = {
                        let mut slot = registrations.lock().unwrap();
                        if disposed.load(Ordering::SeqCst) {
                            Some(created)
                        } else {
                            info!(
                                thing = %config.name,
                                polls = created.len(),
                                "Polling started"
                            );
                            slot.extend(created);
                            None
                        }
                    };
                    if let Some(created) = rolled_back {
                        // disposal raced the startup task
                        debug!("Disposed during initialization, rolling polls back");
                        PollScheduler::stop(created);
                    }
                }
                Err(error) => {
                    warn!(error = %error, "Poll registration failed");
                    status.update_status(ThingStatusInfo::offline(
                        ThingStatusDetail::CommunicationError,
                        error.to_string(),
                    ));
                }
            }
        });
    }

    fn stop_polls(&self) {
        let registrations = mem::take(&mut *self.registrations.lock().unwrap());
        if !registrations.is_empty() {
            debug!(count = registrations.len(), "Stopping polls");
        }
        PollScheduler::stop(registrations);
    }
}

impl ThingHandler for XcenterThingHandler {
    fn initialize(&self) {
        self.disposed.store(false, Ordering::SeqCst);
        // a re-initialization replaces any polls from the previous attempt
        self.stop_polls();
        self.aggregator.reset();
        self.status.update_status(ThingStatusInfo::unknown());
        self.spawn_connect();
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.stop_polls();
        // The channel itself is owned and closed by the bridge handler.
        self.resolver.invalidate();
    }

    fn handle_command(&self, channel: &str, command: Command) {
        // no control of the Kermi device possible yet
        debug!(channel, ?command, "Ignoring command");
    }

    fn bridge_status_changed(&self, status: ThingStatusInfo) {
        match status.status {
            ThingStatus::Online => {
                if self.disposed.load(Ordering::SeqCst) {
                    return;
                }
                info!("Bridge came online, reinitializing");
                self.initialize();
            }
            _ => {
                info!("Bridge went offline, stopping polls");
                self.stop_polls();
                self.resolver.invalidate();
                let label = self
                    .bridge
                    .as_ref()
                    .map(|bridge| bridge.label())
                    .unwrap_or_else(|| "<null>".to_string());
                let error = XcenterError::BridgeOffline { label };
                self.status.update_status(ThingStatusInfo::offline(
                    error.status_detail(),
                    error.to_string(),
                ));
            }
        }
    }
}

/// Build one poll plan per tracked group.
fn build_plans(
    config: &XcenterConfig,
    aggregator: &Arc<ReadAggregator>,
    readings: &Arc<dyn ReadingSink>,
) -> Vec<PollPlan> {
    config
        .tracked_groups()
        .into_iter()
        .map(|group| {
            let group_config = config.group(group).clone();
            let range = group_config.range();
            let interval = group_config.interval();
            let callback = poll_callback(
                config.name.clone(),
                group,
                group_config,
                aggregator.clone(),
                readings.clone(),
            );
            PollPlan {
                group,
                range,
                interval,
                callback,
            }
        })
        .collect()
}

/// Callback translating one poll outcome into exactly one read-status update
/// per cycle.
fn poll_callback(
    device: String,
    group: ReadGroup,
    config: GroupPollConfig,
    aggregator: Arc<ReadAggregator>,
    readings: Arc<dyn ReadingSink>,
) -> PollCallback {
    Arc::new(move |outcome| match outcome {
        Ok(words) => {
            for reading in decode_group(&device, group, &config, &words) {
                readings.publish(&reading);
            }
            aggregator.update(group, ReadStatus::Success);
        }
        Err(error) => {
            warn!(group = %group, error = %error, "Poll failed");
            aggregator.update(group, ReadStatus::Failed);
        }
    })
}
