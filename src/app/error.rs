use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreshetError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch failed: {url} returned status {status}")]
    Fetch { url: String, status: u16 },

    #[error("Unrecognized feed document: {0}")]
    Format(String),

    #[error("Transform step failed: {0}")]
    Transform(String),

    #[error("Scrape failed: {0}")]
    Scrape(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(i64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FreshetError {
    /// True for failures scoped to a single item's rewrite, which skip the
    /// item instead of aborting the feed's refresh.
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform(_) | Self::Scrape(_))
    }
}

pub type Result<T> = std::result::Result<T, FreshetError>;
