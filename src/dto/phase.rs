use serde::Serialize;
use utoipa::ToSchema;

use crate::state::recorder::RecorderPhase;

/// Recorder phase as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRecorderPhase {
    /// Presence capture.
    Roster,
    /// Match running, counters editable.
    Live,
    /// Results persisted.
    Done,
    /// Attendance already recorded; read-only.
    Locked,
}

impl From<RecorderPhase> for VisibleRecorderPhase {
    fn from(value: RecorderPhase) -> Self {
        match value {
            RecorderPhase::Roster => VisibleRecorderPhase::Roster,
            RecorderPhase::Live => VisibleRecorderPhase::Live,
            RecorderPhase::Done => VisibleRecorderPhase::Done,
            RecorderPhase::Locked => VisibleRecorderPhase::Locked,
        }
    }
}
