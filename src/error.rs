/// Everything that can go wrong while running the authorization check.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("missing required environment variable {0}")]
    MissingConfig(&'static str),
    #[error("invalid value for {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },
    #[error("invalid url given")]
    InvalidUrl,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] oauth2::http::header::InvalidHeaderValue),
    #[error("timed out waiting for the authorization redirect")]
    CallbackTimeout,
    #[error("callback listener stopped before an authorization code arrived")]
    ListenerClosed,
    #[error("an IO error occured: {0}")]
    IO(#[from] std::io::Error),
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
