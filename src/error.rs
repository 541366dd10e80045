//! Crate-wide error taxonomy.
//!
//! Kinds mirror the policy in the design docs: transient transport errors
//! are retried by callers before ever reaching here; what lands in
//! [`Error`] is either exhausted-retry transport, venue rejection, or a
//! genuine programming/config problem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required secret: {0}")]
    MissingSecret(String),

    #[error("ingest error ({venue}): {message}")]
    Ingest { venue: String, message: String },

    #[error("matching error: {0}")]
    Matching(String),

    #[error("venue rejected order: {0}")]
    VenueRejected(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("risk rejected intent: {0}")]
    RiskRejected(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
