//! Poll registration for the tracked register groups.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use kermi_common::ReadGroup;
use kermi_thing_framework::{ChannelError, ModbusInterface, PollCallback, PollHandle, RegisterRange};

use crate::endpoint::EndpointBinding;

/// Plan for one group's recurring poll.
pub struct PollPlan {
    pub group: ReadGroup,
    pub range: RegisterRange,
    pub interval: Duration,
    pub callback: PollCallback,
}

/// One registered recurring poll, owned by the Thing handler.
pub struct PollRegistration {
    group: ReadGroup,
    handle: PollHandle,
    channel: Arc<dyn ModbusInterface>,
}

impl PollRegistration {
    /// The group this registration polls.
    pub fn group(&self) -> ReadGroup {
        self.group
    }

    /// Deregister the poll. Deregistering on a channel the bridge already
    /// tore down is a no-op.
    pub fn cancel(self) {
        self.channel.unregister_regular_poll(&self.handle);
        debug!(group = %self.group, "Poll deregistered");
    }
}

/// Registers the groups' polls all-or-nothing and tears them down
/// idempotently.
pub struct PollScheduler;

impl PollScheduler {
    /// Register one recurring poll per plan against the binding's channel.
    ///
    /// All-or-nothing: when any registration fails, the ones already created
    /// in this call are rolled back before the failure is returned.
    pub fn start(
        binding: &EndpointBinding,
        plans: Vec<PollPlan>,
    ) -> Result<Vec<PollRegistration>, ChannelError> {
        let mut registrations = Vec::with_capacity(plans.len());

        for plan in plans {
            match binding
                .channel
                .register_regular_poll(plan.range, plan.interval, plan.callback)
            {
                Ok(handle) => {
                    debug!(
                        group = %plan.group,
                        address = plan.range.address,
                        count = plan.range.count,
                        "Poll registered"
                    );
                    registrations.push(PollRegistration {
                        group: plan.group,
                        handle,
                        channel: binding.channel.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        group = %plan.group,
                        error = %e,
                        "Poll registration failed, rolling back"
                    );
                    Self::stop(registrations);
                    return Err(e);
                }
            }
        }

        Ok(registrations)
    }

    /// Deregister every handle exactly once.
    ///
    /// Stopping an empty or already-drained set is a no-op, so teardown can
    /// race a concurrent reconnect attempt.
    pub fn stop(registrations: Vec<PollRegistration>) {
        for registration in registrations {
            registration.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kermi_thing_framework::RegisterKind;
    use kermi_thing_framework::mock::MockInterface;

    fn plan(group: ReadGroup, address: u16) -> PollPlan {
        PollPlan {
            group,
            range: RegisterRange {
                kind: RegisterKind::Holding,
                address,
                count: 1,
            },
            interval: Duration::from_secs(5),
            callback: Arc::new(|_| {}),
        }
    }

    fn binding(channel: Arc<MockInterface>) -> EndpointBinding {
        EndpointBinding {
            channel,
            slave_id: 1,
        }
    }

    #[test]
    fn test_start_registers_all_groups() {
        let channel = MockInterface::new();
        let binding = binding(channel.clone());

        let registrations = PollScheduler::start(
            &binding,
            vec![
                plan(ReadGroup::State, 100),
                plan(ReadGroup::Power, 120),
                plan(ReadGroup::Alarm, 250),
            ],
        )
        .unwrap();

        assert_eq!(registrations.len(), 3);
        assert_eq!(channel.active_polls(), 3);
    }

    #[test]
    fn test_partial_start_rolls_back() {
        let channel = MockInterface::failing_from(2);
        let binding = binding(channel.clone());

        let result = PollScheduler::start(
            &binding,
            vec![
                plan(ReadGroup::State, 100),
                plan(ReadGroup::Power, 120),
                plan(ReadGroup::Alarm, 250),
            ],
        );

        assert!(matches!(result, Err(ChannelError::Closed)));
        // the two successful registrations were rolled back
        assert_eq!(channel.active_polls(), 0);
        assert_eq!(channel.registration_attempts(), 3);
    }

    #[test]
    fn test_stop_deregisters_everything() {
        let channel = MockInterface::new();
        let binding = binding(channel.clone());

        let registrations = PollScheduler::start(
            &binding,
            vec![plan(ReadGroup::State, 100), plan(ReadGroup::Alarm, 250)],
        )
        .unwrap();

        PollScheduler::stop(registrations);
        assert_eq!(channel.active_polls(), 0);

        // a second stop has nothing left to do
        PollScheduler::stop(Vec::new());
        assert_eq!(channel.active_polls(), 0);
    }
}
