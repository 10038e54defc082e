//! Time-boxed weather cache.
//!
//! Freshness is judged only by our own `last_fetched`, never by the
//! upstream report time.

use chrono::{Duration, NaiveDateTime};
use ekiboard_core::time::parse_timestamp;
use ekiboard_core::WeatherSnapshot;
use tracing::warn;

use crate::snapshot::SnapshotStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherLookup {
    /// Younger than the TTL: use as is.
    Fresh(WeatherSnapshot),
    /// Too old, or its timestamp is unreadable. Still usable as a fallback.
    Stale(WeatherSnapshot),
    Missing,
}

impl WeatherLookup {
    /// The cached record regardless of age.
    pub fn into_cached(self) -> Option<WeatherSnapshot> {
        match self {
            Self::Fresh(w) | Self::Stale(w) => Some(w),
            Self::Missing => None,
        }
    }
}

pub fn lookup_weather(store: &SnapshotStore, now: NaiveDateTime, ttl: Duration) -> WeatherLookup {
    let Some(cached) = store.read_weather() else {
        return WeatherLookup::Missing;
    };
    match parse_timestamp(&cached.last_fetched) {
        Ok(fetched) if now - fetched < ttl => WeatherLookup::Fresh(cached),
        Ok(_) => WeatherLookup::Stale(cached),
        Err(_) => {
            warn!(last_fetched = %cached.last_fetched, "unreadable weather timestamp, treating as stale");
            WeatherLookup::Stale(cached)
        }
    }
}
