//! When to run the next search cycle.
//!
//! [`evaluate`] is a pure function of the clock, the departure snapshot and
//! the scheduler flags, so every branch is testable without a runtime.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use ekiboard_core::config::ScheduleConfig;
use ekiboard_core::time::parse_clock;
use ekiboard_core::DepartureSnapshot;

/// Read-only view of everything the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct TriggerInput<'a> {
    pub now: NaiveDateTime,
    pub departures: Option<&'a DepartureSnapshot>,
    pub last_search: Option<NaiveDateTime>,
    pub in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Wait(WaitReason),
    Fetch(FetchReason),
}

impl Decision {
    pub fn should_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReason {
    InFlight,
    Cooldown,
    /// Too early: nothing to do before `trigger_at`.
    BeforeWindow { trigger_at: NaiveDateTime },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReason {
    /// Missing, `null` or empty snapshot.
    NoSnapshot,
    /// No destination has a departure time (typically after the last train).
    NoDepartureTimes,
    /// The earliest departure left long ago.
    Stale { departure: NaiveDateTime },
    /// Inside the lookahead window of the earliest departure.
    WindowReached { departure: NaiveDateTime },
    /// Something could not be evaluated; fetching is the safe answer.
    Unevaluable(String),
}

impl std::fmt::Display for FetchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSnapshot => write!(f, "no departure data"),
            Self::NoDepartureTimes => write!(f, "no departure times (after last train?)"),
            Self::Stale { departure } => write!(f, "departure {departure} is in the past"),
            Self::WindowReached { departure } => write!(f, "window before {departure} reached"),
            Self::Unevaluable(why) => write!(f, "could not evaluate: {why}"),
        }
    }
}

pub fn evaluate(input: TriggerInput<'_>, schedule: &ScheduleConfig) -> Decision {
    if input.in_flight {
        return Decision::Wait(WaitReason::InFlight);
    }
    if let Some(last) = input.last_search {
        if input.now - last < schedule.cooldown() {
            return Decision::Wait(WaitReason::Cooldown);
        }
    }
    let Some(departures) = input.departures.filter(|d| !d.is_empty()) else {
        return Decision::Fetch(FetchReason::NoSnapshot);
    };

    let earliest = match earliest_departure(departures) {
        Ok(Some(t)) => t,
        Ok(None) => return Decision::Fetch(FetchReason::NoDepartureTimes),
        Err(why) => return Decision::Fetch(FetchReason::Unevaluable(why)),
    };

    match resolve(input.now, earliest, schedule) {
        Some(d) => d,
        None => Decision::Fetch(FetchReason::Unevaluable(format!(
            "date arithmetic overflow around {}",
            input.now
        ))),
    }
}

/// Earliest time of day across all found routes. `Err` on an unreadable time.
fn earliest_departure(departures: &DepartureSnapshot) -> Result<Option<NaiveTime>, String> {
    let mut earliest: Option<NaiveTime> = None;
    for (destination, route) in departures.iter() {
        let Some(route) = route else { continue };
        if route.departure_time.is_empty() {
            continue;
        }
        let t = parse_clock(&route.departure_time)
            .map_err(|e| format!("{destination}: {e}"))?;
        earliest = Some(earliest.map_or(t, |e| e.min(t)));
    }
    Ok(earliest)
}

fn resolve(now: NaiveDateTime, earliest: NaiveTime, schedule: &ScheduleConfig) -> Option<Decision> {
    let mut departure = now.date().and_time(earliest);
    // A small-hours departure seen late in the evening belongs to tomorrow.
    if earliest < schedule.rollover_departure_before && now.time() > schedule.rollover_now_after {
        departure = departure.checked_add_signed(Duration::days(1))?;
    }

    if departure < now && now - departure > schedule.stale_after() {
        return Some(Decision::Fetch(FetchReason::Stale { departure }));
    }

    let trigger_at = departure.checked_sub_signed(schedule.lookahead())?;
    Some(if now >= trigger_at {
        Decision::Fetch(FetchReason::WindowReached { departure })
    } else {
        Decision::Wait(WaitReason::BeforeWindow { trigger_at })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ekiboard_core::{ByDestination, RouteInfo, RouteSegment};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn route(dep: &str) -> Option<RouteInfo> {
        Some(RouteInfo {
            departure_time: dep.into(),
            arrival_time: "".into(),
            segments: vec![RouteSegment {
                line: "小田原線".into(),
                train_type: "急行".into(),
                destination: "新宿".into(),
                departure: dep.into(),
                arrival: "".into(),
            }],
            status: Default::default(),
        })
    }

    fn snapshot(times: &[Option<&str>]) -> DepartureSnapshot {
        let mut snap = ByDestination::new();
        for (i, t) in times.iter().enumerate() {
            snap.insert(format!("駅{i}"), t.and_then(route));
        }
        snap
    }

    fn decide(now: NaiveDateTime, snap: Option<&DepartureSnapshot>) -> Decision {
        evaluate(
            TriggerInput {
                now,
                departures: snap,
                last_search: None,
                in_flight: false,
            },
            &ScheduleConfig::default(),
        )
    }

    #[test]
    fn fourteen_minute_window() {
        let snap = snapshot(&[Some("07:00"), Some("07:20")]);
        assert_eq!(
            decide(at(6, 46), Some(&snap)),
            Decision::Fetch(FetchReason::WindowReached { departure: at(7, 0) })
        );
        assert_eq!(
            decide(at(6, 45), Some(&snap)),
            Decision::Wait(WaitReason::BeforeWindow { trigger_at: at(6, 46) })
        );
    }

    #[test]
    fn earliest_destination_drives_the_window() {
        let snap = snapshot(&[Some("07:20"), None, Some("07:00")]);
        assert!(decide(at(6, 46), Some(&snap)).should_fetch());
    }

    #[test]
    fn rollover_keeps_after_midnight_departure_in_future() {
        let snap = snapshot(&[Some("00:30")]);
        let tomorrow = at(0, 30) + Duration::days(1);
        assert_eq!(
            decide(at(23, 50), Some(&snap)),
            Decision::Wait(WaitReason::BeforeWindow {
                trigger_at: tomorrow - Duration::minutes(14)
            })
        );
        assert_eq!(
            decide(at(23, 10), Some(&snap)),
            Decision::Wait(WaitReason::BeforeWindow {
                trigger_at: tomorrow - Duration::minutes(14)
            })
        );
    }

    #[test]
    fn no_rollover_before_evening_threshold() {
        // 20:00 is not after 21:00, so 00:30 is today and long gone.
        let snap = snapshot(&[Some("00:30")]);
        assert_eq!(
            decide(at(20, 0), Some(&snap)),
            Decision::Fetch(FetchReason::Stale { departure: at(0, 30) })
        );
    }

    #[test]
    fn stale_only_after_an_hour() {
        let snap = snapshot(&[Some("00:30")]);
        assert_eq!(
            decide(at(1, 31), Some(&snap)),
            Decision::Fetch(FetchReason::Stale { departure: at(0, 30) })
        );
        // 59 minutes late is still inside the window, not stale
        assert_eq!(
            decide(at(1, 29), Some(&snap)),
            Decision::Fetch(FetchReason::WindowReached { departure: at(0, 30) })
        );
    }

    #[test]
    fn missing_or_empty_snapshot_fetches() {
        assert_eq!(decide(at(7, 0), None), Decision::Fetch(FetchReason::NoSnapshot));
        let empty = DepartureSnapshot::new();
        assert_eq!(
            decide(at(7, 0), Some(&empty)),
            Decision::Fetch(FetchReason::NoSnapshot)
        );
    }

    #[test]
    fn no_times_fetches() {
        let snap = snapshot(&[None, None]);
        assert_eq!(
            decide(at(1, 0), Some(&snap)),
            Decision::Fetch(FetchReason::NoDepartureTimes)
        );
        let blank = snapshot(&[Some("")]);
        assert_eq!(
            decide(at(1, 0), Some(&blank)),
            Decision::Fetch(FetchReason::NoDepartureTimes)
        );
    }

    #[test]
    fn unreadable_time_fails_open() {
        let snap = snapshot(&[Some("07:00"), Some("soon")]);
        assert!(matches!(
            decide(at(6, 0), Some(&snap)),
            Decision::Fetch(FetchReason::Unevaluable(_))
        ));
    }

    #[test]
    fn in_flight_and_cooldown_block_everything() {
        let schedule = ScheduleConfig::default();
        let input = TriggerInput {
            now: at(7, 0),
            departures: None,
            last_search: None,
            in_flight: true,
        };
        assert_eq!(evaluate(input, &schedule), Decision::Wait(WaitReason::InFlight));

        let cooling = TriggerInput {
            in_flight: false,
            last_search: Some(at(6, 59) + Duration::seconds(30)),
            ..input
        };
        assert_eq!(evaluate(cooling, &schedule), Decision::Wait(WaitReason::Cooldown));

        let cooled = TriggerInput {
            last_search: Some(at(6, 59)),
            ..cooling
        };
        assert_eq!(
            evaluate(cooled, &schedule),
            Decision::Fetch(FetchReason::NoSnapshot)
        );
    }
}
