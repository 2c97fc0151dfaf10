use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} returned by {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// True for failures below HTTP (DNS, connect, timeout, body read).
    pub fn is_transport(&self) -> bool {
        matches!(self, ScanError::HttpError(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
