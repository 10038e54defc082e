use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::Result;

/// Question asked of the transit search page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Trains leaving at or after the given time.
    Departure,
    LastTrain,
    FirstTrain,
}

impl SearchMode {
    /// Value of the `type` query parameter.
    pub fn type_param(self) -> &'static str {
        match self {
            Self::Departure => "1",
            Self::LastTrain => "2",
            Self::FirstTrain => "3",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Departure => "departure",
            Self::LastTrain => "last_train",
            Self::FirstTrain => "first_train",
        }
    }
}

/// Parameters that never change between searches.
const FIXED_PARAMS: &[(&str, &str)] = &[
    ("ticket", "ic"),
    ("expkind", "1"),
    ("ws", "3"),
    ("s", "0"),
    ("shin", "0"),
    ("via", ""),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitQuery {
    pub from: String,
    pub to: String,
    pub at: NaiveDateTime,
    pub mode: SearchMode,
}

impl TransitQuery {
    /// Query string pairs, minutes split into tens and units.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("from", self.from.clone()),
            ("to", self.to.clone()),
            ("y", self.at.year().to_string()),
            ("m", format!("{:02}", self.at.month())),
            ("d", format!("{:02}", self.at.day())),
            ("hh", format!("{:02}", self.at.hour())),
            ("m1", (self.at.minute() / 10).to_string()),
            ("m2", (self.at.minute() % 10).to_string()),
            ("type", self.mode.type_param().to_string()),
        ];
        params.extend(FIXED_PARAMS.iter().map(|(k, v)| (*k, v.to_string())));
        params
    }
}

/// Everything the fetch tasks need from the outside world, as raw bodies.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Transit search result page (HTML).
    async fn transit_search(&self, query: &TransitQuery) -> Result<String>;

    /// Delay-board page (HTML with an embedded JSON payload).
    async fn delay_board(&self) -> Result<String>;

    /// Forecast document (JSON).
    async fn forecast(&self) -> Result<String>;

    /// Upstream "latest update" timestamp (plain text).
    async fn latest_update(&self) -> Result<String>;
}
