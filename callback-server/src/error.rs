use thiserror::Error;

/// Errors raised while starting the callback server
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackError {
    /// The listening socket could not be bound
    #[error("Failed to bind callback server: {0}")]
    Bind(String),

    /// No routable local address could be determined for the callback URL
    #[error("Failed to detect local IP address")]
    NoLocalAddress,
}
