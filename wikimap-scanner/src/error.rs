use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    StatusError { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid page title: {0}")]
    InvalidTitle(String),

    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("API error: {info} (code: {code})")]
    ApiError { code: String, info: String },

    #[error("No results: {0}")]
    NoResults(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
