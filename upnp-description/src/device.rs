//! Device description parsing.
//!
//! This module handles parsing the UPnP device description XML published at
//! the device URL into a [`DeviceDescription`] with absolute URLs.

use serde::Deserialize;
use url::Url;

use crate::error::{DescriptionError, Result};
use crate::url_resolver::resolve_url;

/// UPnP device description root element.
#[derive(Debug, Deserialize)]
struct Root {
    #[serde(rename = "URLBase")]
    url_base: Option<String>,
    device: RawDevice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    device_type: Option<String>,
    friendly_name: Option<String>,
    manufacturer: Option<String>,
    #[serde(rename = "manufacturerURL")]
    manufacturer_url: Option<String>,
    model_name: Option<String>,
    model_number: Option<String>,
    model_description: Option<String>,
    #[serde(rename = "UDN")]
    udn: Option<String>,
    icon_list: Option<RawIconList>,
    service_list: Option<RawServiceList>,
}

#[derive(Debug, Deserialize)]
struct RawIconList {
    #[serde(rename = "icon", default)]
    icons: Vec<RawIcon>,
}

#[derive(Debug, Deserialize)]
struct RawIcon {
    mimetype: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    depth: Option<u32>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawServiceList {
    #[serde(rename = "service", default)]
    services: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawService {
    service_type: String,
    service_id: String,
    #[serde(rename = "SCPDURL")]
    scpd_url: String,
    #[serde(rename = "controlURL")]
    control_url: String,
    #[serde(rename = "eventSubURL")]
    event_sub_url: String,
}

/// Identity and capabilities of a UPnP device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// Device type URN, e.g. `urn:schemas-upnp-org:device:MediaRenderer:1`
    pub device_type: Option<String>,
    pub friendly_name: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_url: Option<String>,
    pub model_name: Option<String>,
    pub model_number: Option<String>,
    pub model_description: Option<String>,
    /// Unique device name, e.g. `uuid:4d696e69-444c-164e-9d41-b827eb54e939`
    pub udn: Option<String>,
    /// Icons in document order
    pub icons: Vec<Icon>,
    /// Services in document order, unique by `service_id`
    pub services: Vec<ServiceRef>,
}

/// An icon advertised by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub mimetype: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub depth: Option<u32>,
    /// Absolute icon URL
    pub url: Url,
}

/// Where to find and how to address one service of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    /// Fully-qualified service identifier, e.g. `urn:upnp-org:serviceId:AVTransport`
    pub service_id: String,
    /// Service type URN, used as the SOAP action namespace
    pub service_type: String,
    /// Absolute URL of the service description document
    pub scpd_url: Url,
    /// Absolute URL for action invocation
    pub control_url: Url,
    /// Absolute URL for event subscriptions
    pub event_sub_url: Url,
}

impl DeviceDescription {
    /// Parse a device description document.
    ///
    /// Relative URLs are resolved against the document's `URLBase` when it has
    /// one, otherwise against `base_url` (the URL the document was fetched from).
    ///
    /// # Errors
    ///
    /// Returns `DescriptionError::Parse` if the XML is malformed or lacks the
    /// `device` element, and `DescriptionError::InvalidUrl` if a contained URL
    /// cannot be resolved.
    pub fn from_xml(xml: &str, base_url: &Url) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| DescriptionError::Parse(format!("Failed to parse device XML: {}", e)))?;

        let base = match root.url_base.as_deref().map(str::trim) {
            Some(url_base) if !url_base.is_empty() => resolve_url(base_url, url_base)?,
            _ => base_url.clone(),
        };

        let device = root.device;
        let icons = device
            .icon_list
            .map(|list| list.icons)
            .unwrap_or_default()
            .into_iter()
            .map(|icon| {
                Ok(Icon {
                    mimetype: icon.mimetype,
                    width: icon.width,
                    height: icon.height,
                    depth: icon.depth,
                    url: resolve_url(&base, &icon.url)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut services: Vec<ServiceRef> = Vec::new();
        for raw in device.service_list.map(|list| list.services).unwrap_or_default() {
            let service_id = raw.service_id.trim().to_string();
            if services.iter().any(|s| s.service_id == service_id) {
                continue;
            }
            services.push(ServiceRef {
                service_id,
                service_type: raw.service_type.trim().to_string(),
                scpd_url: resolve_url(&base, &raw.scpd_url)?,
                control_url: resolve_url(&base, &raw.control_url)?,
                event_sub_url: resolve_url(&base, &raw.event_sub_url)?,
            });
        }

        Ok(Self {
            device_type: device.device_type,
            friendly_name: device.friendly_name,
            manufacturer: device.manufacturer,
            manufacturer_url: device.manufacturer_url,
            model_name: device.model_name,
            model_number: device.model_number,
            model_description: device.model_description,
            udn: device.udn,
            icons,
            services,
        })
    }

    /// Look up a service by its fully-qualified identifier.
    pub fn service(&self, service_id: &str) -> Option<&ServiceRef> {
        self.services.iter().find(|s| s.service_id == service_id)
    }

    /// Check whether the device exposes the given service.
    pub fn has_service(&self, service_id: &str) -> bool {
        self.service(service_id).is_some()
    }

    /// Service identifiers in document order.
    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.service_id.as_str())
    }
}
