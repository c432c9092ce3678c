//! Action invocation against a service control URL.

use std::collections::HashMap;
use std::sync::Arc;

use soap_client::{ActionArgs, SoapClient};
use tracing::debug;

use crate::cache::DescriptionCache;
use crate::error::{Result, UpnpError};
use crate::service_id::resolve_service_id;

/// Invokes declared actions and returns their raw textual outputs.
pub struct ActionInvoker {
    cache: Arc<DescriptionCache>,
    soap: SoapClient,
}

impl ActionInvoker {
    pub fn new(cache: Arc<DescriptionCache>, soap: SoapClient) -> Self {
        Self { cache, soap }
    }

    /// Invoke `action` on the service and return its declared outputs.
    ///
    /// # Errors
    ///
    /// - `UpnpError::NoService` if the device does not list the service
    /// - `UpnpError::NoAction` if the service does not declare the action
    /// - `UpnpError::Fault` if the device answers with a fault envelope
    pub async fn invoke(
        &self,
        service_id: &str,
        action: &str,
        args: &ActionArgs,
    ) -> Result<HashMap<String, String>> {
        let service_id = resolve_service_id(service_id);
        let description = self.cache.service_description(&service_id).await?;
        let spec = description
            .action(action)
            .ok_or_else(|| UpnpError::NoAction(action.to_string()))?;
        let service = self.cache.service_ref(&service_id).await?;

        debug!(service_id = %service_id, action, "Invoking action");

        let outputs = spec.output_names();
        let result = self
            .soap
            .call(&service.control_url, &service.service_type, action, args, &outputs)
            .await?;

        Ok(result)
    }
}
