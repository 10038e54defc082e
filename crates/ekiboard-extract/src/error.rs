//! Error types for the ekiboard-extract crate.
//!
//! Every variant is a *hard* failure: the page or document existed but did
//! not have the shape we rely on. Soft outcomes ("no route", "no delays")
//! are ordinary values, not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// A structural anchor the extractor depends on is missing.
    #[error("page structure changed: {0}")]
    PageStructureChanged(String),

    /// A required field is absent from an otherwise recognised structure.
    #[error("missing field: {0}")]
    MissingField(String),

    /// Embedded or standalone JSON failed to parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The itinerary lists fewer than two stations.
    #[error("itinerary has {found} station(s), need at least 2")]
    NotEnoughStations { found: usize },

    /// An itinerary was present but none of its segments could be parsed.
    #[error("itinerary present but no segment could be parsed")]
    NoSegments,

    /// A CSS selector failed to compile.
    #[error("invalid selector: {0}")]
    Selector(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_enough_stations() {
        let err = ExtractError::NotEnoughStations { found: 1 };
        assert_eq!(err.to_string(), "itinerary has 1 station(s), need at least 2");
    }

    #[test]
    fn display_structure_changed() {
        let err = ExtractError::PageStructureChanged("__NEXT_DATA__ not found".into());
        assert_eq!(err.to_string(), "page structure changed: __NEXT_DATA__ not found");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExtractError>();
    }
}
