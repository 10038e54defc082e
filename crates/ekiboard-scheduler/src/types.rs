use chrono::NaiveDateTime;
use ekiboard_fetch::TaskReport;
use uuid::Uuid;

use crate::daily::DailyFlag;
use crate::trigger::Decision;

/// Mutable scheduler flags. Owned by the engine loop; cycles report back
/// through [`CycleFinished`] instead of touching this directly.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    pub in_flight: bool,
    /// Completion time of the most recent search cycle.
    pub last_search: Option<NaiveDateTime>,
    pub daily: DailyFlag,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            in_flight: false,
            last_search: None,
            daily: DailyFlag::Done,
        }
    }
}

/// The tasks of one search cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTask {
    Departure,
    Operation,
    Weather,
}

impl CycleTask {
    pub const ORDER: [CycleTask; 3] = [Self::Departure, Self::Operation, Self::Weather];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Departure => "departure",
            Self::Operation => "operation",
            Self::Weather => "weather",
        }
    }
}

/// Sent by a search cycle when its last task returns.
#[derive(Debug, Clone)]
pub struct CycleFinished {
    pub cycle_id: Uuid,
    pub finished_at: NaiveDateTime,
    pub reports: Vec<(CycleTask, TaskReport)>,
}

/// What a single tick decided and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub decision: Decision,
    /// A search cycle was spawned by this tick.
    pub cycle_started: bool,
    /// The daily first/last refresh was spawned by this tick.
    pub daily_refresh: bool,
    pub renderer_restarted: bool,
}
