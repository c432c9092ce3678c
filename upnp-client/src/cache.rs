//! Fetch-once cache of device and service descriptions.

use std::sync::Arc;

use dashmap::DashMap;
use soap_client::SoapClient;
use tokio::sync::OnceCell;
use tracing::debug;
use upnp_description::{DeviceDescription, ServiceDescription, ServiceRef};
use url::Url;

use crate::error::{Result, UpnpError};
use crate::service_id::resolve_service_id;

/// Lazily fetched, never invalidated descriptions of one device.
///
/// Concurrent callers asking for the same document share a single fetch.
pub struct DescriptionCache {
    device_url: Url,
    soap: SoapClient,
    device: OnceCell<Arc<DeviceDescription>>,
    services: DashMap<String, Arc<OnceCell<Arc<ServiceDescription>>>>,
}

impl DescriptionCache {
    pub fn new(device_url: Url, soap: SoapClient) -> Self {
        Self {
            device_url,
            soap,
            device: OnceCell::new(),
            services: DashMap::new(),
        }
    }

    pub fn device_url(&self) -> &Url {
        &self.device_url
    }

    pub async fn device_description(&self) -> Result<Arc<DeviceDescription>> {
        self.device
            .get_or_try_init(|| async {
                debug!(url = %self.device_url, "Fetching device description");
                let xml = self.soap.get(&self.device_url).await?;
                let description = DeviceDescription::from_xml(&xml, &self.device_url)?;
                debug!(
                    device_type = description.device_type.as_deref().unwrap_or("unknown"),
                    services = description.services.len(),
                    "Parsed device description"
                );
                Ok::<_, UpnpError>(Arc::new(description))
            })
            .await
            .cloned()
    }

    pub async fn has_service(&self, service_id: &str) -> Result<bool> {
        let service_id = resolve_service_id(service_id);
        Ok(self.device_description().await?.has_service(&service_id))
    }

    /// The service entry of the device description.
    ///
    /// # Errors
    ///
    /// `UpnpError::NoService` if the device does not list the service.
    pub async fn service_ref(&self, service_id: &str) -> Result<ServiceRef> {
        let service_id = resolve_service_id(service_id);
        self.device_description()
            .await?
            .service(&service_id)
            .cloned()
            .ok_or_else(|| UpnpError::NoService(service_id.into_owned()))
    }

    /// The description of a service, fetched on first use.
    ///
    /// # Errors
    ///
    /// `UpnpError::NoService` if the device does not list the service.
    pub async fn service_description(&self, service_id: &str) -> Result<Arc<ServiceDescription>> {
        let service = self.service_ref(service_id).await?;

        let cell = self
            .services
            .entry(service.service_id.clone())
            .or_default()
            .clone();

        cell.get_or_try_init(|| async {
            debug!(service_id = %service.service_id, url = %service.scpd_url, "Fetching service description");
            let xml = self.soap.get(&service.scpd_url).await?;
            Ok::<_, UpnpError>(Arc::new(ServiceDescription::from_xml(&xml)?))
        })
        .await
        .cloned()
    }

    /// First service, in device description order, whose state table
    /// declares `variable`.
    ///
    /// Variables that do not send events only count when
    /// `include_non_evented` is set. Returns `Ok(None)` when no service
    /// qualifies.
    pub async fn find_service_owning_variable(
        &self,
        variable: &str,
        include_non_evented: bool,
    ) -> Result<Option<String>> {
        let device = self.device_description().await?;

        for service in &device.services {
            let description = self.service_description(&service.service_id).await?;
            if description.owns_variable(variable, include_non_evented) {
                return Ok(Some(service.service_id.clone()));
            }
        }

        Ok(None)
    }
}
