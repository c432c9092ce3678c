//! Service identifier normalization.

use std::borrow::Cow;

/// Namespace prepended to bare service names.
pub const DEFAULT_SERVICE_ID_NAMESPACE: &str = "urn:upnp-org:serviceId:";

/// Expand a bare service name to its fully-qualified service ID.
///
/// An ID that already contains a `:` is returned unchanged, so the function
/// is idempotent.
///
/// ```
/// use upnp_client::resolve_service_id;
///
/// assert_eq!(resolve_service_id("AVTransport"), "urn:upnp-org:serviceId:AVTransport");
/// assert_eq!(resolve_service_id("urn:x:serviceId:Y"), "urn:x:serviceId:Y");
/// ```
pub fn resolve_service_id(service_id: &str) -> Cow<'_, str> {
    if service_id.contains(':') {
        Cow::Borrowed(service_id)
    } else {
        Cow::Owned(format!("{}{}", DEFAULT_SERVICE_ID_NAMESPACE, service_id))
    }
}
