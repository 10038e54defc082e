//! `ekiboard-core`: data model, configuration and shared helpers for the
//! station board feeder.
//!
//! Every other crate in the workspace depends on this one. It owns no I/O
//! beyond config loading.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use config::EkiboardConfig;
pub use error::{CoreError, Result};
pub use types::{
    ByDestination, DepartureSnapshot, DepartureTag, FirstLastInfo, FirstLastSnapshot,
    OperationEntry, OperationSnapshot, OperationStatus, RouteInfo, RouteSegment, TrainTimes,
    WeatherSnapshot,
};
