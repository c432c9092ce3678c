//! UPnP description parsing
//!
//! This crate turns the two XML documents a UPnP device publishes into
//! structured models:
//!
//! - the device description (`<root><device>…</device></root>`), parsed by
//!   [`DeviceDescription::from_xml`], which lists the device identity, its
//!   icons and the services it exposes;
//! - a service description (`<scpd>…</scpd>`), parsed by
//!   [`ServiceDescription::from_xml`], which lists the invocable actions and
//!   the state variable table.
//!
//! XML has no way to tell a one-element list from a scalar, so every list
//! section (icons, services, actions, arguments, state variables, allowed
//! values) is normalized to a `Vec` right here at the parse boundary.
//!
//! # Example
//!
//! ```
//! use upnp_description::DeviceDescription;
//! use url::Url;
//!
//! let xml = r#"<root xmlns="urn:schemas-upnp-org:device-1-0">
//!   <device>
//!     <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
//!     <friendlyName>Kitchen</friendlyName>
//!     <UDN>uuid:1234</UDN>
//!     <serviceList>
//!       <service>
//!         <serviceType>urn:schemas-upnp-org:service:RenderingControl:1</serviceType>
//!         <serviceId>urn:upnp-org:serviceId:RenderingControl</serviceId>
//!         <SCPDURL>/rc.xml</SCPDURL>
//!         <controlURL>/rc/control</controlURL>
//!         <eventSubURL>/rc/event</eventSubURL>
//!       </service>
//!     </serviceList>
//!   </device>
//! </root>"#;
//!
//! let base = Url::parse("http://192.168.1.20:49152/description.xml").unwrap();
//! let device = DeviceDescription::from_xml(xml, &base).unwrap();
//! let service = device.service("urn:upnp-org:serviceId:RenderingControl").unwrap();
//! assert_eq!(service.control_url.as_str(), "http://192.168.1.20:49152/rc/control");
//! ```

pub mod device;
mod error;
pub mod service;
mod url_resolver;

pub use device::{DeviceDescription, Icon, ServiceRef};
pub use error::{DescriptionError, Result};
pub use service::{ActionSpec, AllowedValueRange, ArgumentSpec, ServiceDescription, StateVariableSpec};
pub use url_resolver::resolve_url;
