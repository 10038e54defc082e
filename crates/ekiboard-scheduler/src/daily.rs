use tracing::info;

/// Whether today's first/last-train refresh has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyFlag {
    Pending,
    Done,
}

impl DailyFlag {
    /// Startup runs the refresh itself, so the flag starts `Done`, except
    /// inside the reset hour where the scheduled run is still ahead.
    pub fn initial(hour: u32, reset_hour: u32) -> Self {
        if hour == reset_hour {
            info!(hour, "started in the reset hour; first/last refresh still pending");
            Self::Pending
        } else {
            Self::Done
        }
    }

    /// Apply this tick's transition. Returns true when the refresh must run now.
    pub fn advance(&mut self, hour: u32, reset_hour: u32, run_hour: u32) -> bool {
        match *self {
            Self::Pending if hour == run_hour => {
                info!(hour, "daily first/last refresh due");
                *self = Self::Done;
                true
            }
            Self::Done if hour == reset_hour => {
                info!(hour, "resetting daily first/last flag");
                *self = Self::Pending;
                false
            }
            _ => false,
        }
    }
}
