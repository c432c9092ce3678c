//! HTTP server for receiving UPnP event notifications.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warp::http::{Method, StatusCode};
use warp::Filter;

use crate::error::CallbackError;
use crate::router::{EventRouter, NotificationPayload};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// HTTP callback server for receiving UPnP event notifications.
///
/// The server binds an ephemeral port and accepts `NOTIFY` requests on any
/// path. Requests carrying a `SID` header are acknowledged with `200 OK` and
/// forwarded through an [`EventRouter`], whether or not the SID is still
/// known to the consumer.
///
/// # Example
///
/// ```no_run
/// use std::net::{IpAddr, Ipv4Addr};
/// use tokio::sync::mpsc;
/// use callback_server::{CallbackServer, NotificationPayload};
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
///
///     let server = CallbackServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), None, tx)
///         .await
///         .expect("Failed to create callback server");
///
///     println!("Server listening at: {}", server.base_url());
///
///     while let Some(notification) = rx.recv().await {
///         println!("Received event for subscription: {}", notification.subscription_id);
///     }
/// }
/// ```
pub struct CallbackServer {
    /// Address the socket is bound to
    local_addr: SocketAddr,
    /// The base URL advertised to devices
    base_url: String,
    event_router: EventRouter,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the server to an ephemeral port on `bind_ip` and start serving.
    ///
    /// The advertised address is `advertised_ip` when given, `bind_ip` when it
    /// is a concrete address, and otherwise the address of the interface used
    /// for outbound traffic.
    ///
    /// # Errors
    ///
    /// `CallbackError::Bind` if the socket cannot be bound and
    /// `CallbackError::NoLocalAddress` if no advertised address can be found.
    pub async fn bind(
        bind_ip: IpAddr,
        advertised_ip: Option<IpAddr>,
        event_sender: mpsc::UnboundedSender<NotificationPayload>,
    ) -> Result<Self, CallbackError> {
        let advertised_ip = match advertised_ip {
            Some(ip) => ip,
            None if !bind_ip.is_unspecified() => bind_ip,
            None => detect_local_ip().ok_or(CallbackError::NoLocalAddress)?,
        };

        let event_router = EventRouter::new(event_sender);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let (local_addr, server) = warp::serve(routes(event_router.clone()))
            .try_bind_with_graceful_shutdown(SocketAddr::new(bind_ip, 0), async move {
                let _ = shutdown_rx.await;
            })
            .map_err(|e| CallbackError::Bind(e.to_string()))?;

        let base_url = format!("http://{}", SocketAddr::new(advertised_ip, local_addr.port()));
        info!(%local_addr, %base_url, "Callback server listening");

        let server_handle = tokio::spawn(server);

        Ok(Self {
            local_addr,
            base_url,
            event_router,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Base URL devices should send notifications to, as `http://<ip>:<port>`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn router(&self) -> &EventRouter {
        &self.event_router
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.server_handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!(local_addr = %self.local_addr, "Callback server did not stop in time, aborting");
                handle.abort();
            }
        }

        info!(local_addr = %self.local_addr, "Callback server stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Detect the local IP address used for outbound connections.
///
/// This uses a UDP socket connection to determine the routing decision. No
/// data is actually sent.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let local_addr = socket.local_addr().ok()?;
    Some(local_addr.ip())
}

/// The NOTIFY endpoint, accepting any path.
fn routes(
    router: EventRouter,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("sid"))
        .and(warp::header::optional::<String>("nt"))
        .and(warp::header::optional::<String>("nts"))
        .and(warp::body::bytes())
        .and_then(
            move |method: Method,
                  path: warp::path::FullPath,
                  sid: Option<String>,
                  nt: Option<String>,
                  nts: Option<String>,
                  body: Bytes| {
                let router = router.clone();
                async move {
                    if method.as_str() != "NOTIFY" {
                        return Err(warp::reject::custom(MethodNotAllowed));
                    }

                    debug!(path = path.as_str(), bytes = body.len(), "Incoming NOTIFY");

                    if !validate_upnp_headers(&sid, &nt, &nts) {
                        warn!(path = path.as_str(), "Rejecting NOTIFY with invalid UPnP headers");
                        return Err(warp::reject::custom(InvalidUpnpHeaders));
                    }
                    let sid = sid.ok_or_else(|| warp::reject::custom(InvalidUpnpHeaders))?;

                    let event_xml = String::from_utf8_lossy(&body).into_owned();
                    router.route_event(sid.trim().to_string(), event_xml);

                    Ok::<_, warp::Rejection>(warp::reply::with_status("", StatusCode::OK))
                }
            },
        )
        .recover(handle_rejection)
}

/// Validate UPnP event notification headers.
///
/// The SID header is required. NT and NTS are checked only when both are
/// present.
fn validate_upnp_headers(sid: &Option<String>, nt: &Option<String>, nts: &Option<String>) -> bool {
    match sid {
        Some(sid) if !sid.trim().is_empty() => {}
        _ => return false,
    }

    if let (Some(nt_val), Some(nts_val)) = (nt, nts) {
        if nt_val.trim() != "upnp:event" || nts_val.trim() != "upnp:propchange" {
            return false;
        }
    }

    true
}

#[derive(Debug)]
struct InvalidUpnpHeaders;

impl warp::reject::Reject for InvalidUpnpHeaders {}

#[derive(Debug)]
struct MethodNotAllowed;

impl warp::reject::Reject for MethodNotAllowed {}

async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if err.find::<InvalidUpnpHeaders>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid UPnP headers")
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message, code))
}
