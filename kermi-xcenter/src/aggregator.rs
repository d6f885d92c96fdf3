//! Read-status aggregation across register groups.
//!
//! Each poll reports into its own slot; the consolidated verdict is a pure
//! function of the state and alarm slots. The state register is the primary
//! liveness signal and the alarm register corroborates it; power, work-hours
//! and PV are informational.

use std::sync::Mutex;

use tracing::debug;

use kermi_common::ReadGroup;

use crate::reporter::StatusReporter;

/// Read outcome of one register group for the current poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadStatus {
    /// No response for this cycle yet.
    #[default]
    NotReceived,
    /// The last poll answered.
    Success,
    /// The last poll failed.
    Failed,
}

/// Why the Thing is reported offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    /// The state group failed to read.
    StateReadError,
    /// A data group (alarm side) failed to read.
    DataReadError,
    /// Both the state and the alarm group failed to read.
    StateAndAlarmReadErrors,
}

impl OfflineReason {
    /// Human-readable text for the communication-error detail.
    pub fn message(&self) -> &'static str {
        match self {
            OfflineReason::StateReadError => "State read error",
            OfflineReason::DataReadError => "Data read error",
            OfflineReason::StateAndAlarmReadErrors => "State and alarm read errors",
        }
    }
}

impl std::fmt::Display for OfflineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Verdict derived from the current read statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidatedStatus {
    /// The state group has not answered yet; no externally visible change.
    Pending,
    /// State and alarm both read successfully.
    Online,
    /// Reads failed; the reason names the failing side.
    Offline(OfflineReason),
}

/// Derive the consolidated verdict from the state and alarm slots.
///
/// Precedence, first match wins:
/// 1. state not received → pending
/// 2. state and alarm both succeeded → online
/// 3. state and alarm both failed → offline, both sides named
/// 4. the two disagree → offline, the failed side named (a state success
///    with an unanswered alarm counts as the data side)
pub fn consolidate(state: ReadStatus, alarm: ReadStatus) -> ConsolidatedStatus {
    match (state, alarm) {
        (ReadStatus::NotReceived, _) => ConsolidatedStatus::Pending,
        (ReadStatus::Success, ReadStatus::Success) => ConsolidatedStatus::Online,
        (ReadStatus::Failed, ReadStatus::Failed) => {
            ConsolidatedStatus::Offline(OfflineReason::StateAndAlarmReadErrors)
        }
        (ReadStatus::Failed, _) => ConsolidatedStatus::Offline(OfflineReason::StateReadError),
        (ReadStatus::Success, _) => ConsolidatedStatus::Offline(OfflineReason::DataReadError),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ReadSlots {
    state: ReadStatus,
    power: ReadStatus,
    work_hours: ReadStatus,
    pv: Option<ReadStatus>,
    alarm: ReadStatus,
}

/// Tracks per-group read statuses and reports the consolidated verdict.
pub struct ReadAggregator {
    slots: Mutex<ReadSlots>,
    reporter: StatusReporter,
}

impl ReadAggregator {
    /// Create the aggregator. The PV slot is tracked only when the PV
    /// capability is enabled in configuration.
    pub fn new(pv_enabled: bool, reporter: StatusReporter) -> Self {
        Self {
            slots: Mutex::new(ReadSlots {
                pv: pv_enabled.then_some(ReadStatus::NotReceived),
                ..ReadSlots::default()
            }),
            reporter,
        }
    }

    /// Record one group's outcome for this cycle and report the new verdict.
    ///
    /// Store, recompute and report happen under one lock so every report
    /// observes a consistent snapshot.
    pub fn update(&self, group: ReadGroup, status: ReadStatus) -> ConsolidatedStatus {
        let mut slots = self.slots.lock().unwrap();

        match group {
            ReadGroup::State => slots.state = status,
            ReadGroup::Power => slots.power = status,
            ReadGroup::WorkHours => slots.work_hours = status,
            ReadGroup::Pv => match slots.pv.as_mut() {
                Some(slot) => *slot = status,
                None => debug!("Ignoring PV read status: PV capability disabled"),
            },
            ReadGroup::Alarm => slots.alarm = status,
        }

        debug!(
            state = ?slots.state,
            power = ?slots.power,
            work_hours = ?slots.work_hours,
            pv = ?slots.pv,
            alarm = ?slots.alarm,
            "Read status update"
        );

        let verdict = consolidate(slots.state, slots.alarm);
        self.reporter.report(verdict);
        verdict
    }

    /// Reset every tracked slot to not-received for a fresh connection
    /// attempt.
    pub fn reset(&self) {
        let mut slots = self.slots.lock().unwrap();
        let pv_tracked = slots.pv.is_some();
        *slots = ReadSlots {
            pv: pv_tracked.then_some(ReadStatus::NotReceived),
            ..ReadSlots::default()
        };
    }
}
