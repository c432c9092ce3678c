//! Error types for the upnp-client crate.

use std::fmt;

use callback_server::CallbackError;
use soap_client::SoapError;
use thiserror::Error;
use upnp_description::DescriptionError;

/// Errors returned by [`UpnpClient`](crate::UpnpClient) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpnpError {
    /// The service is not listed in the device description
    #[error("Service {0} not provided by device")]
    NoService(String),

    /// The action is not declared by the service
    #[error("Action {0} not implemented by service")]
    NoAction(String),

    /// No event-capable service owns the variable
    #[error("Variable {0} does not generate event messages")]
    NoEvents(String),

    /// The device answered an action with a fault
    #[error("({error_code}) {description}")]
    Fault {
        /// HTTP status of the fault response
        status: u16,
        /// UPnP error code
        error_code: u16,
        description: String,
    },

    #[error("Subscription error (HTTP {status})")]
    Subscribe { status: u16 },

    #[error("Subscription renewal error (HTTP {status})")]
    SubscriptionRenewal { status: u16 },

    #[error("Unsubscription error (HTTP {status})")]
    Unsubscribe { status: u16 },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// A document or response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// A non-success status where no more specific kind applies
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Callback server error: {0}")]
    CallbackServer(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stable, machine-checkable identifier of an [`UpnpError`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoService,
    NoAction,
    NoEvents,
    Upnp,
    Subscribe,
    SubscribeRenew,
    Unsubscribe,
    Network,
    Parse,
    HttpStatus,
    CallbackServer,
    Configuration,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoService => "NO_SERVICE",
            ErrorCode::NoAction => "NO_ACTION",
            ErrorCode::NoEvents => "NO_EVENTS",
            ErrorCode::Upnp => "UPNP",
            ErrorCode::Subscribe => "SUBSCRIBE",
            ErrorCode::SubscribeRenew => "SUBSCRIBE_RENEW",
            ErrorCode::Unsubscribe => "UNSUBSCRIBE",
            ErrorCode::Network => "NETWORK",
            ErrorCode::Parse => "PARSE",
            ErrorCode::HttpStatus => "HTTP_STATUS",
            ErrorCode::CallbackServer => "CALLBACK_SERVER",
            ErrorCode::Configuration => "CONFIGURATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UpnpError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UpnpError::NoService(_) => ErrorCode::NoService,
            UpnpError::NoAction(_) => ErrorCode::NoAction,
            UpnpError::NoEvents(_) => ErrorCode::NoEvents,
            UpnpError::Fault { .. } => ErrorCode::Upnp,
            UpnpError::Subscribe { .. } => ErrorCode::Subscribe,
            UpnpError::SubscriptionRenewal { .. } => ErrorCode::SubscribeRenew,
            UpnpError::Unsubscribe { .. } => ErrorCode::Unsubscribe,
            UpnpError::Network(_) => ErrorCode::Network,
            UpnpError::Parse(_) => ErrorCode::Parse,
            UpnpError::HttpStatus(_) => ErrorCode::HttpStatus,
            UpnpError::CallbackServer(_) => ErrorCode::CallbackServer,
            UpnpError::Configuration(_) => ErrorCode::Configuration,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpnpError::Fault { status, .. }
            | UpnpError::Subscribe { status }
            | UpnpError::SubscriptionRenewal { status }
            | UpnpError::Unsubscribe { status }
            | UpnpError::HttpStatus(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<SoapError> for UpnpError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::Network(msg) => UpnpError::Network(msg),
            SoapError::Parse(msg) => UpnpError::Parse(msg),
            SoapError::HttpStatus(status) => UpnpError::HttpStatus(status),
            SoapError::Fault(fault) => UpnpError::Fault {
                status: fault.status,
                error_code: fault.error_code,
                description: fault.description,
            },
        }
    }
}

impl From<DescriptionError> for UpnpError {
    fn from(err: DescriptionError) -> Self {
        UpnpError::Parse(err.to_string())
    }
}

impl From<CallbackError> for UpnpError {
    fn from(err: CallbackError) -> Self {
        UpnpError::CallbackServer(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UpnpError>;
