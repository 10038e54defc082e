//! `ekiboard-extract`: turns raw upstream responses into board records.
//!
//! Each extractor is a pure function of the response body. Malformed input
//! never panics: it produces either a documented empty value (no route, no
//! delays) or an [`ExtractError`].
//!
//! | Source                   | Extractor                              | Record            |
//! |--------------------------|----------------------------------------|-------------------|
//! | transit search page      | [`route::extract_departure`]           | `RouteInfo`       |
//! | transit search page      | [`route::extract_first_last`]          | `TrainTimes`      |
//! | delay-board page         | [`delay_board::extract_delay_board`]   | `OperationStatus` |
//! | JMA forecast document    | [`weather::extract_weather`]           | `WeatherSnapshot` |

pub mod delay_board;
pub mod error;
pub mod lexicon;
pub mod route;
pub mod weather;

mod html;

pub use delay_board::{extract_delay_board, DelayBoard};
pub use error::{ExtractError, Result};
pub use route::{extract_departure, extract_first_last, Notice, RouteOutcome};
pub use weather::{extract_weather, parse_forecast};
