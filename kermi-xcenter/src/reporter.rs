//! Mapping consolidated verdicts onto the observable Thing status.

use std::sync::Arc;

use kermi_common::{ThingStatusDetail, ThingStatusInfo};
use kermi_thing_framework::StatusSink;

use crate::aggregator::ConsolidatedStatus;

/// Pushes consolidated verdicts to the status subsystem.
///
/// Stateless: identical repeated verdicts produce identical updates, and the
/// downstream framework de-duplicates them.
#[derive(Clone)]
pub struct StatusReporter {
    sink: Arc<dyn StatusSink>,
}

impl StatusReporter {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self { sink }
    }

    /// Reflect one verdict as an observable status.
    pub fn report(&self, verdict: ConsolidatedStatus) {
        match verdict {
            // the first state poll is still outstanding; the Thing keeps its
            // initialization status
            ConsolidatedStatus::Pending => {}
            ConsolidatedStatus::Online => self.sink.update_status(ThingStatusInfo::online()),
            ConsolidatedStatus::Offline(reason) => self.sink.update_status(
                ThingStatusInfo::offline(ThingStatusDetail::CommunicationError, reason.message()),
            ),
        }
    }
}
