//! SOAP client for UPnP device communication
//!
//! This crate provides a minimal async SOAP client for invoking actions on
//! UPnP services. It also issues the GENA `SUBSCRIBE`/`UNSUBSCRIBE` requests
//! used for event subscriptions. All requests go through an
//! [`HttpTransport`], so the protocol logic can be driven without a network.

mod envelope;
mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod transport;

pub use envelope::{
    build_action_envelope, decode_action_response, decode_fault, ActionArgs, ArgValue,
};
pub use error::{SoapError, UpnpFault};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use url::Url;

/// Response from a UPnP subscription request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResponse {
    /// Subscription ID returned by the device
    pub sid: String,
    /// Actual timeout granted by the device (in seconds)
    pub timeout_seconds: u32,
}

/// A minimal SOAP client for UPnP device communication
#[derive(Clone)]
pub struct SoapClient {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for SoapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapClient").finish_non_exhaustive()
    }
}

impl SoapClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch a document with a plain `GET`.
    ///
    /// # Errors
    ///
    /// `SoapError::HttpStatus` for a non-success response.
    pub async fn get(&self, url: &Url) -> Result<String, SoapError> {
        debug!(%url, "GET");
        let response = self.transport.send(HttpRequest::new("GET", url.clone())).await?;
        if !response.is_success() {
            return Err(SoapError::HttpStatus(response.status));
        }
        Ok(response.body)
    }

    /// Invoke `action` and return the values of the declared `outputs`.
    ///
    /// # Arguments
    /// * `control_url` - Control URL of the service
    /// * `service_type` - Service type URN, used for the namespace and SOAPACTION header
    /// * `action` - Action name
    /// * `args` - Input arguments in the order they should be sent
    /// * `outputs` - Output argument names to extract from the response
    pub async fn call(
        &self,
        control_url: &Url,
        service_type: &str,
        action: &str,
        args: &ActionArgs,
        outputs: &[&str],
    ) -> Result<HashMap<String, String>, SoapError> {
        let body = build_action_envelope(service_type, action, args);
        let soap_action = format!("\"{}#{}\"", service_type, action);

        debug!(%control_url, %soap_action, "Invoking SOAP action");

        let request = HttpRequest::new("POST", control_url.clone())
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("Content-Length", body.len().to_string())
            .header("SOAPACTION", soap_action)
            .body(body);

        let response = self.transport.send(request).await?;

        // A fault can arrive with any status
        if let Some(fault) = decode_fault(response.status, &response.body) {
            debug!(action, error_code = fault.error_code, "SOAP fault");
            return Err(SoapError::Fault(fault));
        }
        if !response.is_success() {
            return Err(SoapError::HttpStatus(response.status));
        }

        decode_action_response(&response.body, action, outputs)
    }

    /// Subscribe to UPnP events for a service event URL
    ///
    /// # Arguments
    /// * `event_url` - Event subscription URL of the service
    /// * `callback_url` - URL where events should be sent
    /// * `timeout_seconds` - Requested subscription timeout in seconds
    ///
    /// # Returns
    /// A `SubscriptionResponse` containing the SID and actual timeout
    pub async fn subscribe(
        &self,
        event_url: &Url,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, SoapError> {
        debug!(%event_url, callback_url, "SUBSCRIBE");

        let request = HttpRequest::new("SUBSCRIBE", event_url.clone())
            .header("CALLBACK", format!("<{}>", callback_url))
            .header("NT", "upnp:event")
            .header("TIMEOUT", format!("Second-{}", timeout_seconds));

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(SoapError::HttpStatus(response.status));
        }

        let sid = response
            .header("SID")
            .map(str::trim)
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| SoapError::Parse("Missing SID header in SUBSCRIBE response".to_string()))?
            .to_string();

        Ok(SubscriptionResponse {
            sid,
            timeout_seconds: granted_timeout(&response, timeout_seconds),
        })
    }

    /// Renew an existing UPnP subscription
    ///
    /// # Returns
    /// The actual timeout granted by the device
    pub async fn renew_subscription(
        &self,
        event_url: &Url,
        sid: &str,
        timeout_seconds: u32,
    ) -> Result<u32, SoapError> {
        debug!(%event_url, sid, "SUBSCRIBE renewal");

        let request = HttpRequest::new("SUBSCRIBE", event_url.clone())
            .header("SID", sid)
            .header("TIMEOUT", format!("Second-{}", timeout_seconds));

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(SoapError::HttpStatus(response.status));
        }

        Ok(granted_timeout(&response, timeout_seconds))
    }

    /// Unsubscribe from UPnP events
    pub async fn unsubscribe(&self, event_url: &Url, sid: &str) -> Result<(), SoapError> {
        debug!(%event_url, sid, "UNSUBSCRIBE");

        let request = HttpRequest::new("UNSUBSCRIBE", event_url.clone()).header("SID", sid);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(SoapError::HttpStatus(response.status));
        }

        Ok(())
    }
}

fn granted_timeout(response: &HttpResponse, requested: u32) -> u32 {
    response
        .header("TIMEOUT")
        .and_then(parse_timeout_header)
        .unwrap_or(requested)
}

/// Parse a `Second-N` TIMEOUT header value.
///
/// Returns `None` for `Second-infinite` and anything unparseable.
pub fn parse_timeout_header(value: &str) -> Option<u32> {
    let value = value.trim();
    let prefix = value.get(..7)?;
    if !prefix.eq_ignore_ascii_case("Second-") {
        return None;
    }
    value[7..].trim().parse::<u32>().ok()
}
