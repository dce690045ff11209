use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-success HTTP status. Carries the response body, or
    /// `Request failed: {status}` when the body was empty.
    #[error("{0}")]
    RequestFailed(String),
    #[error("could not reach the attendance server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
