use chrono::NaiveDateTime;
use ekiboard_core::{DepartureSnapshot, DepartureTag, FirstLastSnapshot, RouteInfo, TrainTimes};
use ekiboard_extract::{extract_departure, RouteOutcome};
use tracing::{error, info, warn};

use super::{FetchContext, TaskReport};
use crate::error::{FetchError, Result};
use crate::upstream::{SearchMode, TransitQuery};

/// Search the next train to every destination and replace `departure.json`.
///
/// The search time is pushed past the imminent departure so the page
/// returns the train after it. A transport failure aborts the whole task
/// and writes `null`; a bad page only blanks that destination.
pub async fn fetch_departure(ctx: &FetchContext, now: NaiveDateTime) -> TaskReport {
    let search_at = now + ctx.config.schedule.search_offset();
    info!(%search_at, "searching departures");

    let mut snapshot = match search_all(ctx, search_at).await {
        Ok(s) => s,
        Err(e) => {
            error!(code = e.code(), "departure search failed: {e}");
            return write(ctx, None);
        }
    };

    match ctx.store.read_first_last() {
        Some(first_last) => {
            tag_departures(&mut snapshot, &first_last);
            if showing_first_trains(&snapshot, &first_last) {
                info!("last train has passed; showing first trains");
            }
        }
        None => warn!("no first/last data; departures left untagged"),
    }

    write(ctx, Some(&snapshot))
}

async fn search_all(ctx: &FetchContext, at: NaiveDateTime) -> Result<DepartureSnapshot> {
    let stations = &ctx.config.stations;
    let mut snapshot = DepartureSnapshot::new();
    for destination in &stations.destinations {
        let query = TransitQuery {
            from: stations.origin.clone(),
            to: destination.clone(),
            at,
            mode: SearchMode::Departure,
        };
        let route = match ctx.upstream.transit_search(&query).await {
            Ok(html) => route_from_page(destination, &html),
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                warn!(%destination, code = e.code(), "departure page unavailable: {e}");
                None
            }
        };
        snapshot.insert(destination.clone(), route);
    }
    Ok(snapshot)
}

fn route_from_page(destination: &str, html: &str) -> Option<RouteInfo> {
    match extract_departure(html) {
        Ok(RouteOutcome::Found(route)) => {
            info!(
                %destination,
                departure = %route.departure_time,
                segments = route.segments.len(),
                "route found"
            );
            Some(route)
        }
        Ok(RouteOutcome::NoRoute { notice }) => {
            match notice {
                Some(notice) => info!(%destination, %notice, "no route"),
                None => info!(%destination, "no route"),
            }
            None
        }
        Err(e) => {
            let e = FetchError::from(e);
            warn!(%destination, code = e.code(), "route page changed shape: {e}");
            None
        }
    }
}

/// Mark routes that leave at the cached first- or last-train time.
fn tag_departures(snapshot: &mut DepartureSnapshot, first_last: &FirstLastSnapshot) {
    for (destination, route) in snapshot.iter_mut() {
        let Some(route) = route.as_mut() else {
            continue;
        };
        let Some(info) = first_last.get(destination) else {
            route.status = DepartureTag::None;
            continue;
        };
        let departure = route.departure_time.as_str();
        let leaves_at = |times: &Option<TrainTimes>| {
            !departure.is_empty() && times.as_ref().is_some_and(|t| t.departure == departure)
        };
        let tag = if leaves_at(&info.first_train) {
            DepartureTag::FirstTrain
        } else if leaves_at(&info.last_train) {
            DepartureTag::LastTrain
        } else {
            DepartureTag::None
        };
        route.status = tag;
    }
}

/// True when every found route is that destination's first train.
///
/// A destination without first-train data disqualifies the board.
fn showing_first_trains(snapshot: &DepartureSnapshot, first_last: &FirstLastSnapshot) -> bool {
    if snapshot.is_empty() || first_last.is_empty() {
        return false;
    }
    snapshot.iter().all(|(destination, route)| {
        let Some(route) = route else {
            return true;
        };
        match first_last
            .get(destination)
            .and_then(|info| info.first_train.as_ref())
        {
            Some(first) => first.departure == route.departure_time,
            None => {
                warn!(%destination, "missing first-train data");
                false
            }
        }
    })
}

fn write(ctx: &FetchContext, snapshot: Option<&DepartureSnapshot>) -> TaskReport {
    match ctx.store.write_departure(snapshot) {
        Ok(()) if snapshot.is_some() => TaskReport::Written,
        Ok(()) => TaskReport::WrittenFailure,
        Err(e) => {
            error!("could not write departure snapshot: {e}");
            TaskReport::Skipped
        }
    }
}
