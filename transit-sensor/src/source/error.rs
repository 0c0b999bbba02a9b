//! Source error types.

/// Errors a departure source reports instead of an absent payload.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection, TLS or request-building failure.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the access token.
    #[error("unauthorized (status {status})")]
    Unauthorized { status: u16 },

    /// The backend needs a credential but none was supplied.
    #[error("no credential available for {backend}")]
    MissingCredential { backend: &'static str },

    /// Client configuration could not be turned into a working client.
    #[error("invalid client configuration: {0}")]
    Config(String),
}
