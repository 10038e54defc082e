//! Transit search page extraction ("route 1" only).
//!
//! Page anatomy we rely on:
//!
//! ```text
//! div#route01
//!   div.routeDetail
//!     div.station      ul.time > li ...      (N stations)
//!     div.fareSection  li.transport > div    (N-1 sections)
//!       span.destination
//! ```
//!
//! When `#route01` is absent the page shows a banner instead; a short chain
//! of notice strategies decides which one to surface.

use ekiboard_core::time::normalize_clock;
use ekiboard_core::{DepartureTag, RouteInfo, RouteSegment, TrainTimes};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::html::{child_divs_with_class, first, selector, stripped_text};
use crate::lexicon::{split_train_type_and_line, strip_bound_suffix};

/// Banner text: the last train of the day has left.
pub const LAST_TRAIN_DEPARTED: &str = "終電時刻を過ぎています";
/// Banner text: nothing departs right now.
pub const NO_TRAINS_DEPARTING: &str = "現在発車する列車はありません";
/// Detour banners are only surfaced when they mention a delay.
const DELAY_KEYWORD: &str = "遅延";

/// Which question the search page answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Next train from now; full segment breakdown.
    LiveDeparture,
    /// First- or last-train query; only the overall times are read.
    FirstLast,
}

/// Why a page had no itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LastTrainDeparted,
    NoTrainsDeparting,
    /// Free-text detour/delay banner.
    Detour(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastTrainDeparted => write!(f, "{LAST_TRAIN_DEPARTED}。"),
            Self::NoTrainsDeparting => write!(f, "{NO_TRAINS_DEPARTING}。"),
            Self::Detour(text) => write!(f, "{text}"),
        }
    }
}

/// Outcome of a route extraction that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome<T> {
    Found(T),
    /// No itinerary on the page. `notice` explains why, when a banner says so.
    NoRoute { notice: Option<Notice> },
}

impl<T> RouteOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::NoRoute { .. } => None,
        }
    }
}

/// Extract the live-departure itinerary with its segments.
pub fn extract_departure(html: &str) -> Result<RouteOutcome<RouteInfo>> {
    let document = Html::parse_document(html);
    let Some(detail) = locate_itinerary(&document, RouteMode::LiveDeparture)? else {
        return Ok(RouteOutcome::NoRoute {
            notice: find_notice(&document, RouteMode::LiveDeparture)?,
        });
    };
    let times = overall_times(&detail)?;
    let segments = parse_segments(&detail)?;
    Ok(RouteOutcome::Found(RouteInfo {
        departure_time: times.departure,
        arrival_time: times.arrival,
        segments,
        status: DepartureTag::None,
    }))
}

/// Extract only the overall departure/arrival of a first/last-train search.
pub fn extract_first_last(html: &str) -> Result<RouteOutcome<TrainTimes>> {
    let document = Html::parse_document(html);
    let Some(detail) = locate_itinerary(&document, RouteMode::FirstLast)? else {
        return Ok(RouteOutcome::NoRoute {
            notice: find_notice(&document, RouteMode::FirstLast)?,
        });
    };
    Ok(RouteOutcome::Found(overall_times(&detail)?))
}

// ---------------------------------------------------------------------------
// Itinerary
// ---------------------------------------------------------------------------

/// Stations and fare sections of the first itinerary.
struct ItineraryDetail<'a> {
    stations: Vec<ElementRef<'a>>,
    sections: Vec<ElementRef<'a>>,
    time_sel: Selector,
    time_item_sel: Selector,
    any_time_sel: Selector,
}

/// `Ok(None)` when the page has no itinerary at all.
fn locate_itinerary(document: &Html, mode: RouteMode) -> Result<Option<ItineraryDetail<'_>>> {
    let route_sel = selector("div#route01")?;
    let Some(route) = document.select(&route_sel).next() else {
        debug!(?mode, "no itinerary block on page");
        return Ok(None);
    };

    let detail_sel = selector("div.routeDetail")?;
    let detail = first(route, &detail_sel).ok_or_else(|| {
        ExtractError::PageStructureChanged("div.routeDetail not found in #route01".to_string())
    })?;

    let stations = child_divs_with_class(detail, "station");
    let sections = child_divs_with_class(detail, "fareSection");
    if stations.len() < 2 {
        return Err(ExtractError::NotEnoughStations {
            found: stations.len(),
        });
    }

    Ok(Some(ItineraryDetail {
        stations,
        sections,
        time_sel: selector("ul.time")?,
        time_item_sel: selector("li")?,
        any_time_sel: selector(".time")?,
    }))
}

/// Time entries listed at one station, in page order.
fn station_times(detail: &ItineraryDetail<'_>, station: ElementRef<'_>) -> Vec<String> {
    first(station, &detail.time_sel)
        .map(|ul| {
            ul.select(&detail.time_item_sel)
                .map(|li| normalize_clock(&stripped_text(li)))
                .collect()
        })
        .unwrap_or_default()
}

fn overall_times(detail: &ItineraryDetail<'_>) -> Result<TrainTimes> {
    let origin = detail.stations[0];
    let terminal = detail.stations[detail.stations.len() - 1];

    let departure = station_times(detail, origin)
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::MissingField("departure time at origin".to_string()))?;

    // The terminal sometimes marks its time up without the `ul`.
    let arrival = station_times(detail, terminal)
        .into_iter()
        .next()
        .or_else(|| {
            first(terminal, &detail.any_time_sel)
                .and_then(|t| t.select(&detail.time_item_sel).next())
                .map(|li| normalize_clock(&stripped_text(li)))
        })
        .ok_or_else(|| ExtractError::MissingField("arrival time at destination".to_string()))?;

    Ok(TrainTimes { departure, arrival })
}

fn parse_segments(detail: &ItineraryDetail<'_>) -> Result<Vec<RouteSegment>> {
    let stations = detail.stations.len();
    let sections = detail.sections.len();
    if stations != sections + 1 {
        warn!(stations, sections, "station and fare-section counts disagree");
    }
    let count = (stations - 1).min(sections);

    let transport_sel = selector("li.transport")?;
    let div_sel = selector("div")?;
    let destination_sel = selector("span.destination")?;

    let mut segments = Vec::with_capacity(count);
    for i in 0..count {
        match parse_segment(detail, i, &transport_sel, &div_sel, &destination_sel) {
            Ok(segment) => segments.push(segment),
            Err(e) => warn!(segment = i, "skipping segment: {e}"),
        }
    }

    if segments.is_empty() {
        return Err(ExtractError::NoSegments);
    }
    Ok(segments)
}

fn parse_segment(
    detail: &ItineraryDetail<'_>,
    i: usize,
    transport_sel: &Selector,
    div_sel: &Selector,
    destination_sel: &Selector,
) -> Result<RouteSegment> {
    let section = detail.sections[i];
    let transport = first(section, transport_sel)
        .and_then(|li| first(li, div_sel))
        .ok_or_else(|| ExtractError::MissingField(format!("transport block in segment {i}")))?;

    let (line_raw, destination_raw) = match first(transport, destination_sel) {
        Some(span) => {
            let destination = stripped_text(span);
            let full = stripped_text(transport);
            (full.replace(&destination, "").trim().to_string(), destination)
        }
        None => (stripped_text(transport), String::new()),
    };
    debug!(segment = i, raw_line = %line_raw, "raw line info");

    let (train_type, line) = split_train_type_and_line(&line_raw);

    // A transfer station lists the inbound arrival first, then our departure.
    let boarding = station_times(detail, detail.stations[i]);
    let departure = match boarding.as_slice() {
        [] => {
            return Err(ExtractError::MissingField(format!(
                "departure time in segment {i}"
            )))
        }
        [only] => only.clone(),
        [_, second, ..] => second.clone(),
    };
    let arrival = station_times(detail, detail.stations[i + 1])
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::MissingField(format!("arrival time in segment {i}")))?;

    Ok(RouteSegment {
        line,
        train_type,
        destination: strip_bound_suffix(&destination_raw),
        departure,
        arrival,
    })
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

type NoticeStrategy = fn(&Html, RouteMode) -> Result<Option<Notice>>;

/// Tried in order; the first strategy that yields a notice wins.
const NOTICE_STRATEGIES: &[(&str, NoticeStrategy)] = &[
    ("detour", detour_notice as NoticeStrategy),
    ("attention", attention_notice as NoticeStrategy),
];

fn find_notice(document: &Html, mode: RouteMode) -> Result<Option<Notice>> {
    for (name, strategy) in NOTICE_STRATEGIES {
        if let Some(notice) = strategy(document, mode)? {
            debug!(strategy = name, %notice, "route notice");
            return Ok(Some(notice));
        }
    }
    Ok(None)
}

fn detour_notice(document: &Html, _mode: RouteMode) -> Result<Option<Notice>> {
    let sel = selector("div#detourinfo span.subText")?;
    Ok(document
        .select(&sel)
        .next()
        .map(stripped_text)
        .filter(|text| text.contains(DELAY_KEYWORD))
        .map(Notice::Detour))
}

fn attention_notice(document: &Html, mode: RouteMode) -> Result<Option<Notice>> {
    let sel = selector(".attention")?;
    let Some(text) = document.select(&sel).next().map(stripped_text) else {
        return Ok(None);
    };
    if text.contains(LAST_TRAIN_DEPARTED) {
        // A first/last query is expected to run after the last train.
        if mode == RouteMode::FirstLast {
            return Ok(None);
        }
        return Ok(Some(Notice::LastTrainDeparted));
    }
    if text.contains(NO_TRAINS_DEPARTING) {
        return Ok(Some(Notice::NoTrainsDeparting));
    }
    Ok(None)
}
