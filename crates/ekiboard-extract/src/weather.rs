//! JMA forecast document extraction.
//!
//! `forecast[0]` is the today/tomorrow block. Its `timeSeries[0]` carries
//! weather, wind and waves per *region*; `timeSeries[2]` carries
//! temperatures per *city*. The board shows the city name, so the area name
//! comes from the temperature series while the texts come from the region
//! series.

use chrono::DateTime;
use ekiboard_core::WeatherSnapshot;
use serde_json::Value;

use crate::error::{ExtractError, Result};

/// Publishing office reported when the document omits it.
pub const UNKNOWN_OFFICE: &str = "不明な発表元";

/// Parse the raw forecast body. Kept separate so callers can archive the
/// document verbatim before extracting from it.
pub fn parse_forecast(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}

/// Build a [`WeatherSnapshot`] from a parsed forecast document.
///
/// Fails closed on any missing key except `publishingOffice`.
pub fn extract_weather(
    doc: &Value,
    latest_update: Option<String>,
    fetched_at: String,
) -> Result<WeatherSnapshot> {
    let today = doc.get(0).ok_or_else(|| missing("[0]"))?;

    let publishing_office = today
        .get("publishingOffice")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_OFFICE)
        .to_string();

    let report_raw = str_at(today, "/reportDatetime")?;
    let report_time = DateTime::parse_from_rfc3339(report_raw)
        .map_err(|e| ExtractError::MissingField(format!("reportDatetime {report_raw:?}: {e}")))?
        .format("%H:%M")
        .to_string();

    let area_name = str_at(today, "/timeSeries/2/areas/0/area/name")?.to_string();
    let region = today
        .pointer("/timeSeries/0/areas/0")
        .ok_or_else(|| missing("timeSeries[0].areas[0]"))?;

    Ok(WeatherSnapshot {
        publishing_office,
        area_name,
        report_time,
        weather: str_at(region, "/weathers/0")?.to_string(),
        wind: str_at(region, "/winds/0")?.to_string(),
        wave: str_at(region, "/waves/0")?.to_string(),
        jma_latest_update: latest_update,
        last_fetched: fetched_at,
    })
}

fn str_at<'a>(v: &'a Value, pointer: &str) -> Result<&'a str> {
    v.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(pointer))
}

fn missing(what: &str) -> ExtractError {
    ExtractError::MissingField(format!("forecast {what}"))
}
