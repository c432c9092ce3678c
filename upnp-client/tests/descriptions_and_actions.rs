//! Description caching and action invocation against a fake renderer.

mod helpers;

use helpers::*;
use rstest::rstest;
use soap_client::HttpResponse;
use upnp_client::{ActionArgs, ErrorCode, UpnpError};

const TRANSPORT_INFO_RESPONSE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:GetTransportInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
      <CurrentTransportState>PLAYING</CurrentTransportState>
      <CurrentTransportStatus>OK</CurrentTransportStatus>
      <CurrentSpeed>1</CurrentSpeed>
      <VendorExtra>ignored</VendorExtra>
    </u:GetTransportInfoResponse>
  </s:Body>
</s:Envelope>"#;

const TRANSITION_FAULT: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>701</errorCode>
          <errorDescription>Transition not available</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

#[tokio::test]
async fn test_descriptions_are_fetched_once() {
    let transport = fake_renderer();
    let client = client(&transport);

    let (first, second) = tokio::join!(client.device_description(), client.device_description());
    let device = first.unwrap();
    second.unwrap();
    assert_eq!(device.friendly_name.as_deref(), Some("Living Room Renderer"));
    assert_eq!(device.service_ids().collect::<Vec<_>>(), vec![RC_ID, AVT_ID]);

    assert!(client.has_service("AVTransport").await.unwrap());
    assert!(!client.has_service("ContentDirectory").await.unwrap());

    let (a, b) = tokio::join!(
        client.service_description("AVTransport"),
        client.service_description(AVT_ID)
    );
    assert!(a.unwrap().action("GetTransportInfo").is_some());
    b.unwrap();
    client.service_description("AVTransport").await.unwrap();

    assert_eq!(transport.count("GET", DEVICE_PATH), 1);
    assert_eq!(transport.count("GET", AVT_SCPD), 1);
    assert_eq!(transport.count("GET", RC_SCPD), 0);
}

#[tokio::test]
async fn test_unknown_service_description() {
    let transport = fake_renderer();
    let client = client(&transport);

    let err = client.service_description("ContentDirectory").await.unwrap_err();
    assert_eq!(
        err,
        UpnpError::NoService("urn:upnp-org:serviceId:ContentDirectory".to_string())
    );
    assert_eq!(err.code(), ErrorCode::NoService);
}

#[tokio::test]
async fn test_device_description_http_error() {
    let transport = soap_client::testing::FakeTransport::new();
    transport.route("GET", DEVICE_PATH, HttpResponse::new(503));
    let client = client(&transport);

    assert_eq!(
        client.device_description().await.unwrap_err(),
        UpnpError::HttpStatus(503)
    );
}

#[rstest]
#[case("Mute", false, Some(AVT_ID))]
#[case("Mute", true, Some(RC_ID))]
#[case("LastChange", false, Some(RC_ID))]
#[case("TransportState", false, None)]
#[case("TransportState", true, Some(AVT_ID))]
#[case("Brightness", true, None)]
#[tokio::test]
async fn test_variable_service_lookup(
    #[case] variable: &str,
    #[case] include_non_evented: bool,
    #[case] expected: Option<&str>,
) {
    let transport = fake_renderer();
    let client = client(&transport);

    let owner = client
        .variable_service_id(variable, include_non_evented)
        .await
        .unwrap();
    assert_eq!(owner.as_deref(), expected);
}

#[tokio::test]
async fn test_call_returns_declared_outputs() {
    let transport = fake_renderer();
    transport.route("POST", AVT_CONTROL, HttpResponse::ok(TRANSPORT_INFO_RESPONSE));
    let client = client(&transport);

    let result = client
        .call("AVTransport", "GetTransportInfo", &ActionArgs::new().arg("InstanceID", 0u32))
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result["CurrentTransportState"], "PLAYING");
    assert_eq!(result["CurrentTransportStatus"], "OK");
    assert_eq!(result["CurrentSpeed"], "1");
    assert!(!result.contains_key("VendorExtra"));

    let requests = transport.requests_to("POST", AVT_CONTROL);
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].header_value("SOAPACTION"),
        Some("\"urn:schemas-upnp-org:service:AVTransport:1#GetTransportInfo\"")
    );
    let body = requests[0].body.as_deref().unwrap();
    assert!(body.contains("<InstanceID>0</InstanceID>"));
    assert!(body.contains("xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\""));
}

#[tokio::test]
async fn test_call_without_outputs() {
    let transport = fake_renderer();
    transport.route(
        "POST",
        RC_CONTROL,
        HttpResponse::ok(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:SetVolumeResponse xmlns:u="urn:schemas-upnp-org:service:RenderingControl:1"/></s:Body></s:Envelope>"#,
        ),
    );
    let client = client(&transport);

    let args = ActionArgs::new()
        .arg("InstanceID", 0u32)
        .arg("Channel", "Master")
        .arg("DesiredVolume", 25u16);
    let result = client.call("RenderingControl", "SetVolume", &args).await.unwrap();

    assert!(result.is_empty());
    let body = transport.requests_to("POST", RC_CONTROL)[0].body.clone().unwrap();
    assert!(body.contains("<DesiredVolume>25</DesiredVolume>"));
}

#[tokio::test]
async fn test_call_unknown_action_sends_nothing() {
    let transport = fake_renderer();
    let client = client(&transport);

    let err = client
        .call("AVTransport", "Seek", &ActionArgs::new())
        .await
        .unwrap_err();

    assert_eq!(err, UpnpError::NoAction("Seek".to_string()));
    assert_eq!(transport.count("POST", AVT_CONTROL), 0);
}

#[tokio::test]
async fn test_call_unknown_service() {
    let transport = fake_renderer();
    let client = client(&transport);

    let err = client
        .call("ContentDirectory", "Browse", &ActionArgs::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoService);
}

#[rstest]
#[case(500)]
#[case(200)]
#[tokio::test]
async fn test_call_fault(#[case] status: u16) {
    let transport = fake_renderer();
    transport.route(
        "POST",
        AVT_CONTROL,
        HttpResponse::new(status).with_body(TRANSITION_FAULT),
    );
    let client = client(&transport);

    let err = client
        .call(
            "AVTransport",
            "Play",
            &ActionArgs::new().arg("InstanceID", 0u32).arg("Speed", "1"),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        UpnpError::Fault {
            status,
            error_code: 701,
            description: "Transition not available".to_string(),
        }
    );
    assert_eq!(err.code(), ErrorCode::Upnp);
    assert_eq!(err.to_string(), "(701) Transition not available");
}

#[tokio::test]
async fn test_call_http_error_without_fault() {
    let transport = fake_renderer();
    transport.route("POST", AVT_CONTROL, HttpResponse::new(500).with_body("Internal error"));
    let client = client(&transport);

    let err = client
        .call("AVTransport", "Stop", &ActionArgs::new().arg("InstanceID", 0u32))
        .await
        .unwrap_err();
    assert_eq!(err, UpnpError::HttpStatus(500));
}
