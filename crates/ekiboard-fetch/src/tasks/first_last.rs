use chrono::{Duration, NaiveDateTime, NaiveTime};
use ekiboard_core::{FirstLastInfo, FirstLastSnapshot, TrainTimes};
use ekiboard_extract::{extract_first_last, RouteOutcome};
use tracing::{error, info, warn};

use super::{FetchContext, TaskReport};
use crate::error::Result;
use crate::upstream::{SearchMode, TransitQuery};

/// First/last searches ask about this hour of the service day.
const SERVICE_DAY_PROBE_HOUR: i64 = 6;

/// Refresh `first_last_train.json` for the current service day.
///
/// Runs shortly after the service day changes, so the day is taken from
/// `now` shifted back a few hours. A transport failure keeps the previous
/// file: yesterday's first/last times beat none at all.
pub async fn fetch_first_last(ctx: &FetchContext, now: NaiveDateTime) -> TaskReport {
    let service_day = (now - ctx.config.schedule.first_last_day_shift()).date();
    info!(%service_day, "searching first/last trains");
    let at = service_day.and_time(NaiveTime::MIN) + Duration::hours(SERVICE_DAY_PROBE_HOUR);

    let snapshot = match search_all(ctx, at).await {
        Ok(s) => s,
        Err(e) => {
            error!(code = e.code(), "first/last search failed, keeping previous data: {e}");
            return TaskReport::Skipped;
        }
    };

    match ctx.store.write_first_last(&snapshot) {
        Ok(()) => {
            info!(destinations = snapshot.len(), "first/last train info updated");
            TaskReport::Written
        }
        Err(e) => {
            error!("could not write first/last snapshot: {e}");
            TaskReport::Skipped
        }
    }
}

async fn search_all(ctx: &FetchContext, at: NaiveDateTime) -> Result<FirstLastSnapshot> {
    let stations = &ctx.config.stations;
    let mut snapshot = FirstLastSnapshot::new();
    for destination in &stations.destinations {
        let mut info = FirstLastInfo::default();
        for mode in [SearchMode::FirstTrain, SearchMode::LastTrain] {
            let query = TransitQuery {
                from: stations.origin.clone(),
                to: destination.clone(),
                at,
                mode,
            };
            let times = search_one(ctx, &query).await?;
            match mode {
                SearchMode::FirstTrain => info.first_train = times,
                _ => info.last_train = times,
            }
        }
        snapshot.insert(destination.clone(), info);
    }
    Ok(snapshot)
}

/// `Err` only for transport failures; everything else degrades to `None`.
async fn search_one(ctx: &FetchContext, query: &TransitQuery) -> Result<Option<TrainTimes>> {
    let destination = &query.to;
    let mode = query.mode.as_str();
    let html = match ctx.upstream.transit_search(query).await {
        Ok(html) => html,
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => {
            error!(%destination, mode, code = e.code(), "first/last page unavailable: {e}");
            return Ok(None);
        }
    };
    Ok(match extract_first_last(&html) {
        Ok(RouteOutcome::Found(times)) => {
            info!(%destination, mode, departure = %times.departure, arrival = %times.arrival, "found");
            Some(times)
        }
        Ok(RouteOutcome::NoRoute { notice }) => {
            warn!(%destination, mode, notice = ?notice.map(|n| n.to_string()), "no itinerary");
            None
        }
        Err(e) => {
            warn!(%destination, mode, "first/last page changed shape: {e}");
            None
        }
    })
}
