use chrono::NaiveDateTime;
use ekiboard_core::time::format_timestamp;
use ekiboard_core::WeatherSnapshot;
use ekiboard_extract::{extract_weather, parse_forecast};
use ekiboard_store::{lookup_weather, WeatherLookup};
use tracing::{error, info, warn};

use super::{FetchContext, TaskReport};
use crate::error::Result;

/// Refresh `weather_forecast.json` at most once per cache TTL.
///
/// A fresh cache is returned untouched. When a refresh fails the old file
/// is kept as is, so its `last_fetched` keeps counting towards the next
/// attempt.
pub async fn fetch_weather(ctx: &FetchContext, now: NaiveDateTime) -> TaskReport {
    let ttl = ctx.config.weather.cache_ttl();
    let cached = match lookup_weather(&ctx.store, now, ttl) {
        WeatherLookup::Fresh(_) => {
            info!("weather fetched less than {} minutes ago, using cache", ttl.num_minutes());
            return TaskReport::Cached;
        }
        other => other.into_cached(),
    };

    info!("updating weather info");
    let fresh = match download(ctx, now).await {
        Ok(w) => w,
        Err(e) => {
            error!(code = e.code(), "weather fetch failed: {e}");
            return match cached {
                Some(_) => {
                    warn!("keeping previous weather snapshot");
                    TaskReport::Cached
                }
                None => TaskReport::Skipped,
            };
        }
    };

    match ctx.store.write_weather(&fresh) {
        Ok(()) => {
            info!(area = %fresh.area_name, weather = %fresh.weather, "weather info updated");
            TaskReport::Written
        }
        Err(e) => {
            error!("could not write weather snapshot: {e}");
            TaskReport::Skipped
        }
    }
}

async fn download(ctx: &FetchContext, now: NaiveDateTime) -> Result<WeatherSnapshot> {
    let latest = match ctx.upstream.latest_update().await {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("latest update time unavailable: {e}");
            None
        }
    };

    let raw = ctx.upstream.forecast().await?;
    let document = parse_forecast(&raw)?;
    if let Err(e) = ctx.store.write_weather_raw(&document) {
        warn!("could not save raw forecast: {e}");
    }

    Ok(extract_weather(&document, latest, format_timestamp(now))?)
}
