//! Watch a UPnP renderer - prints its services and streams its events
//!
//! Describes the device, reads the current transport state, then prints
//! every AVTransport and RenderingControl event until Ctrl+C.
//!
//! Run with: cargo run -p upnp-client --example watch_device -- <device description URL>
//! Set RUST_LOG=upnp_client=debug to see the protocol traffic.

use upnp_client::{ActionArgs, EventListener, EventValue, UpnpClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(device_url) = std::env::args().nth(1) else {
        eprintln!("Usage: watch_device <device description URL>");
        std::process::exit(2);
    };

    let client = UpnpClient::new(&device_url)?;
    let device = client.device_description().await?;

    println!(
        "{} ({})",
        device.friendly_name.as_deref().unwrap_or("Unnamed device"),
        device.device_type.as_deref().unwrap_or("unknown device type")
    );
    for service in &device.services {
        println!("  - {}", service.service_id);
    }

    if client.has_service("AVTransport").await? {
        let info = client
            .call("AVTransport", "GetTransportInfo", &ActionArgs::new().arg("InstanceID", 0u32))
            .await?;
        if let Some(state) = info.get("CurrentTransportState") {
            println!("Transport state: {}", state);
        }
    }

    let (listener, mut events) = EventListener::channel();
    for service_id in ["AVTransport", "RenderingControl"] {
        if client.has_service(service_id).await? {
            client.subscribe(service_id, listener.clone()).await?;
            println!("Subscribed to {}", service_id);
        }
    }

    if !client.has_subscriptions().await {
        println!("Device has no services to watch");
        return Ok(());
    }

    let mut failures = client.subscription_failures();
    println!("\nListening for events, press Ctrl+C to stop\n");

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                let value = match &event.value {
                    EventValue::Text(text) => text.clone(),
                    EventValue::Seconds(seconds) => upnp_client::format_duration(*seconds),
                    EventValue::List(items) => items.join(", "),
                };
                match event.instance_id {
                    Some(instance) => println!("[{}] {} = {}", instance, event.name, value),
                    None => println!("{} = {}", event.name, value),
                }
            }
            Ok(failure) = failures.recv() => {
                eprintln!("Lost subscription to {}: {}", failure.service_id, failure.error);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.unsubscribe_all().await?;
    println!("Unsubscribed");

    Ok(())
}
