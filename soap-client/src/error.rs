//! Error types for the SOAP client

use thiserror::Error;

/// Structured fault returned by a device for a failed action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpFault {
    /// HTTP status of the response that carried the fault
    pub status: u16,
    /// UPnP error code from the fault detail (e.g. 401 Invalid Action)
    pub error_code: u16,
    /// Human-readable description from the fault detail
    pub description: String,
}

/// Errors that can occur during SOAP and GENA communication
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// Non-success HTTP status without a decodable fault body
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// SOAP fault returned by the device
    #[error("SOAP fault: ({}) {}", .0.error_code, .0.description)]
    Fault(UpnpFault),
}
