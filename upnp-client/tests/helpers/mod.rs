//! Test helpers: a fake renderer served through the in-memory transport

#![allow(dead_code)]

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use soap_client::testing::FakeTransport;
use soap_client::HttpResponse;
use tokio::sync::mpsc;
use upnp_client::{ClientConfig, StateEvent, UpnpClient};
use url::Url;

pub const DEVICE_URL: &str = "http://192.168.1.20:1400/xml/device_description.xml";
pub const DEVICE_PATH: &str = "/xml/device_description.xml";
pub const AVT_SCPD: &str = "/AVTransport/scpd.xml";
pub const RC_SCPD: &str = "/RenderingControl/scpd.xml";
pub const AVT_CONTROL: &str = "/AVTransport/control";
pub const RC_CONTROL: &str = "/RenderingControl/control";
pub const AVT_EVENT: &str = "/AVTransport/event";
pub const RC_EVENT: &str = "/RenderingControl/event";

pub const AVT_ID: &str = "urn:upnp-org:serviceId:AVTransport";
pub const RC_ID: &str = "urn:upnp-org:serviceId:RenderingControl";

/// Load a fixture from the fixtures directory
pub fn fixture(filename: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(filename);

    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", filename, e))
}

/// A transport serving the renderer descriptions, with GENA endpoints
/// accepting every request.
pub fn fake_renderer() -> FakeTransport {
    let transport = FakeTransport::new();
    transport.route("GET", DEVICE_PATH, HttpResponse::ok(fixture("device_description.xml")));
    transport.route("GET", AVT_SCPD, HttpResponse::ok(fixture("av_transport.xml")));
    transport.route("GET", RC_SCPD, HttpResponse::ok(fixture("rendering_control.xml")));

    accept_subscriptions(&transport, AVT_EVENT, "uuid:sub-avt", 300);
    accept_subscriptions(&transport, RC_EVENT, "uuid:sub-rc", 300);
    transport.route("UNSUBSCRIBE", AVT_EVENT, HttpResponse::new(200));
    transport.route("UNSUBSCRIBE", RC_EVENT, HttpResponse::new(200));
    transport
}

/// Answer SUBSCRIBE requests on `path`: new subscriptions get
/// `<sid_prefix>-<n>`, renewals echo their SID.
pub fn accept_subscriptions(transport: &FakeTransport, path: &str, sid_prefix: &str, granted: u32) {
    let counter = Arc::new(AtomicUsize::new(0));
    let sid_prefix = sid_prefix.to_string();
    transport.route_with("SUBSCRIBE", path, move |request| {
        let sid = match request.header_value("SID") {
            Some(sid) => sid.to_string(),
            None => format!("{}-{}", sid_prefix, counter.fetch_add(1, Ordering::SeqCst) + 1),
        };
        Ok(HttpResponse::new(200)
            .with_header("SID", sid)
            .with_header("TIMEOUT", format!("Second-{}", granted)))
    });
}

/// Requests on `path` that renew an existing subscription.
pub fn renewals(transport: &FakeTransport, path: &str) -> usize {
    transport
        .requests_to("SUBSCRIBE", path)
        .iter()
        .filter(|r| r.header_value("SID").is_some())
        .count()
}

/// Requests on `path` that create a subscription.
pub fn initial_subscribes(transport: &FakeTransport, path: &str) -> usize {
    transport
        .requests_to("SUBSCRIBE", path)
        .iter()
        .filter(|r| r.header_value("CALLBACK").is_some())
        .count()
}

/// Configuration keeping the callback server on the loopback interface.
pub fn loopback_config() -> ClientConfig {
    ClientConfig::default().with_callback_bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub fn client_with(transport: &FakeTransport, config: ClientConfig) -> UpnpClient {
    UpnpClient::with_transport(Url::parse(DEVICE_URL).unwrap(), config, Arc::new(transport.clone()))
        .expect("Failed to create client")
}

pub fn client(transport: &FakeTransport) -> UpnpClient {
    client_with(transport, loopback_config())
}

/// Send a GENA NOTIFY to the client's callback server.
pub async fn send_notify(callback_url: &str, sid: &str, body: &str) -> u16 {
    reqwest::Client::new()
        .request(reqwest::Method::from_bytes(b"NOTIFY").unwrap(), callback_url)
        .header("SID", sid)
        .header("NT", "upnp:event")
        .header("NTS", "upnp:propchange")
        .header("SEQ", "0")
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .body(body.to_string())
        .send()
        .await
        .expect("Failed to send NOTIFY")
        .status()
        .as_u16()
}

/// A propertyset with one plain property.
pub fn property_set(name: &str, value: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property><{name}>{value}</{name}></e:property></e:propertyset>"#,
        name = name,
        value = value
    )
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<StateEvent>) -> StateEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event channel closed")
}

/// Assert nothing arrives within a short grace period.
pub async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<StateEvent>) {
    if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(150), rx.recv()).await {
        panic!("Unexpected event: {:?}", event);
    }
}
