//! `ekiboard-store`: the on-disk snapshot files shared with the renderer.
//!
//! One JSON document per record type, always replaced atomically
//! (write to a sibling temp file, then rename). Readers never lock.

pub mod error;
pub mod snapshot;
pub mod weather_cache;

pub use error::{Result, StoreError};
pub use snapshot::{SnapshotKind, SnapshotStore};
pub use weather_cache::{lookup_weather, WeatherLookup};
