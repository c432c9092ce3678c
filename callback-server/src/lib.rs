//! UPnP callback server for receiving event notifications.
//!
//! This crate provides a lightweight HTTP server for handling GENA `NOTIFY`
//! requests. It knows nothing about subscriptions or services: every
//! notification is forwarded as a [`NotificationPayload`] and the consumer
//! decides which subscription, if any, it belongs to.
//!
//! # Overview
//!
//! - [`CallbackServer`]: binds an ephemeral local port, accepts `NOTIFY`
//!   requests on any path and acknowledges them.
//! - [`EventRouter`]: forwards each notification to an unbounded channel in
//!   arrival order.
//! - [`NotificationPayload`]: subscription ID plus raw XML body.
//!
//! # Example
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use callback_server::{CallbackServer, NotificationPayload};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callback_server::CallbackError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
//!
//!     let server = CallbackServer::bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), None, tx).await?;
//!     println!("Callback server listening at: {}", server.base_url());
//!
//!     while let Some(notification) = rx.recv().await {
//!         println!("Event for {}: {}", notification.subscription_id, notification.event_xml);
//!     }
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

mod error;
pub mod router;
mod server;

pub use error::CallbackError;
pub use router::{EventRouter, NotificationPayload};
pub use server::{detect_local_ip, CallbackServer};
