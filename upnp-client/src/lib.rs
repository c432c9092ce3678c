//! # UPnP Client - async control point for a single UPnP device
//!
//! Given the URL of a device description, [`UpnpClient`] fetches and caches
//! the device and service descriptions, invokes SOAP actions and manages GENA
//! event subscriptions:
//!
//! ```rust,no_run
//! use upnp_client::{ActionArgs, EventListener, UpnpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), upnp_client::UpnpError> {
//!     let client = UpnpClient::new("http://192.168.1.20:1400/xml/device_description.xml")?;
//!
//!     // "AVTransport" expands to "urn:upnp-org:serviceId:AVTransport"
//!     let info = client
//!         .call("AVTransport", "GetTransportInfo", &ActionArgs::new().arg("InstanceID", 0u32))
//!         .await?;
//!     println!("State: {:?}", info.get("CurrentTransportState"));
//!
//!     let (listener, mut events) = EventListener::channel();
//!     client.subscribe("AVTransport", listener).await?;
//!     while let Some(event) = events.recv().await {
//!         println!("[{:?}] {} = {:?}", event.instance_id, event.name, event.value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Fetch-once descriptions**: each document is requested at most once per client
//! - **Shared subscriptions**: one SUBSCRIBE per service however many listeners join
//! - **Automatic renewal**: subscriptions are renewed before the device expires them
//! - **Per-variable listeners**: [`UpnpClient::on`] finds the service owning a variable
//! - **LastChange expansion**: AVTransport/RenderingControl style events arrive per instance
//!
//! ## Architecture
//!
//! ```text
//! upnp-client (UpnpClient facade)
//!     ↓
//! description cache / action invoker / subscription manager
//!     ↓                       ↓                  ↓
//! upnp-description      soap-client      callback-server
//! ```

mod cache;
mod client;
mod config;
mod error;
pub mod events;
mod invoker;
mod service_id;
pub mod subscription;
mod variables;

pub use client::UpnpClient;
pub use config::ClientConfig;
pub use error::{ErrorCode, Result, UpnpError};
pub use events::{format_duration, parse_duration, EventValue, StateEvent};
pub use service_id::{resolve_service_id, DEFAULT_SERVICE_ID_NAMESPACE};
pub use subscription::{renewal_delay, EventListener, SubscriptionFailure};

// Re-export the building blocks callers need alongside the client
pub use soap_client::{ActionArgs, ArgValue, HttpRequest, HttpResponse, HttpTransport};
pub use upnp_description::{
    ActionSpec, ArgumentSpec, DeviceDescription, ServiceDescription, ServiceRef, StateVariableSpec,
};

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
