//! Error types shared by the scraper, checker and output stages

use thiserror::Error;

/// Errors raised anywhere in the scrape-parse-check pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connect, proxy handshake, TLS, body read)
    #[error("{0}")]
    Http(reqwest::Error),

    /// The request did not complete within its timeout
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status
    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The check endpoint answered with a body we could not interpret
    #[error("invalid check response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A host that is not four dot-separated integers reached the natural sort
    #[error("host is not an IPv4 literal: {host}")]
    MalformedHost { host: String },

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("geolocation error: {0}")]
    Geo(String),

    /// The tracing subscriber could not be built or installed
    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("concurrency limiter closed")]
    LimiterClosed,
}

impl Error {
    /// Short category name used when logging a recovered failure
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Http(_) => "http",
            Error::Timeout => "timeout",
            Error::HttpStatus { .. } => "status",
            Error::Io(_) => "io",
            Error::InvalidResponse(_) => "invalid_response",
            Error::Json(_) => "json",
            Error::MalformedHost { .. } => "malformed_host",
            Error::Config(_) => "config",
            Error::Geo(_) => "geo",
            Error::Logging(_) => "logging",
            Error::LimiterClosed => "limiter",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if let Some(status) = err.status() {
            Error::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            Error::Http(err)
        }
    }
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;
