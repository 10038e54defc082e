//! `ekiboard-fetch`: the four fetch tasks and the upstream they talk to.
//!
//! Tasks never return errors: every outcome is logged and summarised as a
//! [`TaskReport`], so one failing task cannot stop the next one in a cycle.

pub mod error;
pub mod http;
pub mod tasks;
pub mod upstream;

pub use error::{FetchError, Result};
pub use http::HttpUpstream;
pub use tasks::{
    fetch_departure, fetch_first_last, fetch_operation, fetch_weather, FetchContext, TaskReport,
};
pub use upstream::{SearchMode, TransitQuery, Upstream};
