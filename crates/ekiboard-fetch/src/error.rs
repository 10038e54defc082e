use ekiboard_extract::ExtractError;
use ekiboard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body-decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },

    /// Upstream could not be reached for a reason other than `reqwest`.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Snapshot store error: {0}")]
    Store(#[from] StoreError),
}

impl FetchError {
    /// True when the request never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Unavailable(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "HTTP_ERROR",
            Self::Status { .. } => "BAD_STATUS",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Extract(_) => "EXTRACT_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
