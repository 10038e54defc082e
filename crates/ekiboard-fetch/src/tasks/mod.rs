//! The four fetch tasks.
//!
//! | Task        | Writes                  | On failure                         |
//! |-------------|-------------------------|------------------------------------|
//! | departure   | `departure.json`        | `null`                             |
//! | first/last  | `first_last_train.json` | previous file kept                 |
//! | operation   | `operation.json`        | `null`                             |
//! | weather     | `weather_forecast.json` | previous file kept, never rewritten |

mod departure;
mod first_last;
mod operation;
mod weather;

use std::sync::Arc;

use ekiboard_core::EkiboardConfig;
use ekiboard_store::SnapshotStore;

use crate::upstream::Upstream;

pub use departure::fetch_departure;
pub use first_last::fetch_first_last;
pub use operation::fetch_operation;
pub use weather::fetch_weather;

/// What a task did with its snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskReport {
    /// Fresh data written.
    Written,
    /// The explicit failure record (`null`) was written.
    WrittenFailure,
    /// The cached record is still the answer; the file was not touched.
    Cached,
    /// Nothing was written.
    Skipped,
}

impl TaskReport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::WrittenFailure => "written_failure",
            Self::Cached => "cached",
            Self::Skipped => "skipped",
        }
    }
}

/// Shared handles every task runs against.
#[derive(Clone)]
pub struct FetchContext {
    pub upstream: Arc<dyn Upstream>,
    pub store: SnapshotStore,
    pub config: Arc<EkiboardConfig>,
}

impl FetchContext {
    pub fn new(upstream: Arc<dyn Upstream>, store: SnapshotStore, config: Arc<EkiboardConfig>) -> Self {
        Self {
            upstream,
            store,
            config,
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    use super::*;
    use crate::error::{FetchError, Result};
    use crate::upstream::{SearchMode, TransitQuery};

    #[derive(Debug, Clone)]
    pub enum Reply {
        Body(String),
        Status(u16),
        Down,
    }

    impl Reply {
        fn into_result(self, what: &str) -> Result<String> {
            match self {
                Reply::Body(b) => Ok(b),
                Reply::Status(status) => Err(FetchError::Status {
                    url: format!("stub://{what}"),
                    status,
                }),
                Reply::Down => Err(FetchError::Unavailable(format!("{what} is down"))),
            }
        }
    }

    /// In-memory upstream. Unconfigured endpoints answer 404.
    #[derive(Default)]
    pub struct StubUpstream {
        pub transit: HashMap<(String, SearchMode), Reply>,
        pub delay_board: Option<Reply>,
        pub forecast: Option<Reply>,
        pub latest: Option<Reply>,
        pub queries: Mutex<Vec<TransitQuery>>,
        pub forecast_calls: Mutex<u32>,
    }

    impl StubUpstream {
        pub fn with_transit(mut self, to: &str, mode: SearchMode, reply: Reply) -> Self {
            self.transit.insert((to.to_string(), mode), reply);
            self
        }

        pub fn queries(&self) -> Vec<TransitQuery> {
            self.queries.lock().unwrap().clone()
        }

        pub fn forecast_calls(&self) -> u32 {
            *self.forecast_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Upstream for StubUpstream {
        async fn transit_search(&self, query: &TransitQuery) -> Result<String> {
            self.queries.lock().unwrap().push(query.clone());
            self.transit
                .get(&(query.to.clone(), query.mode))
                .cloned()
                .unwrap_or(Reply::Status(404))
                .into_result("transit")
        }

        async fn delay_board(&self) -> Result<String> {
            self.delay_board
                .clone()
                .unwrap_or(Reply::Status(404))
                .into_result("delay-board")
        }

        async fn forecast(&self) -> Result<String> {
            *self.forecast_calls.lock().unwrap() += 1;
            self.forecast
                .clone()
                .unwrap_or(Reply::Status(404))
                .into_result("forecast")
        }

        async fn latest_update(&self) -> Result<String> {
            self.latest
                .clone()
                .unwrap_or(Reply::Status(404))
                .into_result("latest")
        }
    }

    pub fn context(upstream: StubUpstream) -> (TempDir, Arc<StubUpstream>, FetchContext) {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::in_dir(dir.path());
        let upstream = Arc::new(upstream);
        let ctx = FetchContext::new(
            upstream.clone(),
            store,
            Arc::new(EkiboardConfig::default()),
        );
        (dir, upstream, ctx)
    }

    pub fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// Search result page with one direct train.
    pub fn route_page(dep: &str, arr: &str, line: &str, bound: &str) -> String {
        format!(
            r#"<html><body><div id="route01"><div class="routeDetail">
<div class="station"><ul class="time"><li>{dep}発</li></ul></div>
<div class="fareSection"><ul class="info"><li class="transport"><div>{line}<span class="destination">{bound}</span></div></li></ul></div>
<div class="station"><ul class="time"><li>{arr}着</li></ul></div>
</div></div></body></html>"#
        )
    }

    pub fn banner_page(text: &str) -> String {
        format!(r#"<html><body><p class="attention">{text}</p></body></html>"#)
    }
}
