//! The `UpnpClient` facade.

use std::collections::HashMap;
use std::sync::Arc;

use soap_client::{ActionArgs, HttpTransport, ReqwestTransport, SoapClient, SoapError};
use tokio::sync::broadcast;
use tracing::debug;
use upnp_description::{DeviceDescription, ServiceDescription};
use url::Url;

use crate::cache::DescriptionCache;
use crate::config::ClientConfig;
use crate::error::{Result, UpnpError};
use crate::invoker::ActionInvoker;
use crate::subscription::{EventListener, SubscriptionFailure, SubscriptionManager};
use crate::variables::VariableRegistry;

/// Control point for a single UPnP device.
///
/// Descriptions are fetched on first use and cached for the lifetime of the
/// client. Event subscriptions share one callback server that runs only
/// while at least one subscription exists.
///
/// # Example
///
/// ```no_run
/// use upnp_client::{ActionArgs, EventListener, UpnpClient};
///
/// # async fn run() -> upnp_client::Result<()> {
/// let client = UpnpClient::new("http://192.168.1.20:1400/xml/device_description.xml")?;
///
/// let volume = client
///     .call(
///         "RenderingControl",
///         "GetVolume",
///         &ActionArgs::new().arg("InstanceID", 0u32).arg("Channel", "Master"),
///     )
///     .await?;
/// println!("Volume: {:?}", volume.get("CurrentVolume"));
///
/// let (listener, mut events) = EventListener::channel();
/// client.on("TransportState", listener, false).await?;
/// while let Some(event) = events.recv().await {
///     println!("{} = {:?}", event.name, event.value);
/// }
/// # Ok(())
/// # }
/// ```
pub struct UpnpClient {
    config: ClientConfig,
    cache: Arc<DescriptionCache>,
    invoker: ActionInvoker,
    subscriptions: SubscriptionManager,
    variables: Arc<VariableRegistry>,
    /// Subscribed on behalf of variable listeners, fans events out by name
    variable_dispatcher: EventListener,
}

impl UpnpClient {
    /// Create a client for the device description at `device_url` with the
    /// default configuration.
    pub fn new(device_url: &str) -> Result<Self> {
        Self::with_config(device_url, ClientConfig::default())
    }

    pub fn with_config(device_url: &str, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(
            &config.user_agent,
            config.connect_timeout,
            config.request_timeout,
        )
        .map_err(|e| match e {
            SoapError::Network(msg) => UpnpError::Configuration(msg),
            other => other.into(),
        })?;

        Self::with_transport(parse_device_url(device_url)?, config, Arc::new(transport))
    }

    /// Create a client issuing its requests through `transport`.
    pub fn with_transport(
        device_url: Url,
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let soap = SoapClient::new(transport);
        let cache = Arc::new(DescriptionCache::new(device_url, soap.clone()));
        let invoker = ActionInvoker::new(Arc::clone(&cache), soap.clone());
        let subscriptions = SubscriptionManager::new(soap, Arc::clone(&cache), config.clone());

        let variables = Arc::new(VariableRegistry::new());
        let registry = Arc::clone(&variables);
        let variable_dispatcher = EventListener::new(move |event| registry.emit(event));

        Ok(Self {
            config,
            cache,
            invoker,
            subscriptions,
            variables,
            variable_dispatcher,
        })
    }

    pub fn device_url(&self) -> &Url {
        self.cache.device_url()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The device description, fetched once.
    pub async fn device_description(&self) -> Result<Arc<DeviceDescription>> {
        self.cache.device_description().await
    }

    pub async fn has_service(&self, service_id: &str) -> Result<bool> {
        self.cache.has_service(service_id).await
    }

    /// The description of a service, fetched once per service.
    ///
    /// # Errors
    ///
    /// `UpnpError::NoService` if the device does not list the service.
    pub async fn service_description(&self, service_id: &str) -> Result<Arc<ServiceDescription>> {
        self.cache.service_description(service_id).await
    }

    /// First service, in device description order, declaring `variable`.
    pub async fn variable_service_id(
        &self,
        variable: &str,
        include_non_evented: bool,
    ) -> Result<Option<String>> {
        self.cache
            .find_service_owning_variable(variable, include_non_evented)
            .await
    }

    /// Invoke an action and return its declared outputs as raw text.
    pub async fn call(
        &self,
        service_id: &str,
        action: &str,
        args: &ActionArgs,
    ) -> Result<HashMap<String, String>> {
        self.invoker.invoke(service_id, action, args).await
    }

    /// Register `listener` for every event of a service.
    pub async fn subscribe(&self, service_id: &str, listener: EventListener) -> Result<()> {
        self.subscriptions.subscribe(service_id, listener).await
    }

    /// Remove a listener registered with [`subscribe`](Self::subscribe).
    ///
    /// When the device rejects the UNSUBSCRIBE request the error is returned
    /// but the subscription is still dropped locally, so retrying is a no-op.
    pub async fn unsubscribe(&self, service_id: &str, listener: &EventListener) -> Result<()> {
        self.subscriptions.unsubscribe(service_id, listener).await
    }

    /// Register `listener` for changes of one state variable.
    ///
    /// The owning service is subscribed on first use. Variables that do not
    /// send events are only considered when `include_non_evented` is set.
    ///
    /// # Errors
    ///
    /// `UpnpError::NoEvents` if no service declares the variable, or any
    /// error of the underlying subscribe, in which case the registration is
    /// rolled back.
    pub async fn on(
        &self,
        variable: &str,
        listener: EventListener,
        include_non_evented: bool,
    ) -> Result<()> {
        let service_id = self
            .variable_service_id(variable, include_non_evented)
            .await?
            .ok_or_else(|| UpnpError::NoEvents(variable.to_string()))?;

        let added = self.variables.add(&service_id, variable, listener.clone());
        debug!(variable, service_id = %service_id, added, "Variable listener registered");

        if let Err(err) = self
            .subscriptions
            .subscribe(&service_id, self.variable_dispatcher.clone())
            .await
        {
            if added {
                self.variables.remove(variable, &listener);
            }
            return Err(err);
        }

        Ok(())
    }

    /// Remove a variable listener.
    ///
    /// Returns `false` if the listener was not registered. The owning service
    /// is unsubscribed once none of its variables has listeners left.
    pub async fn off(&self, variable: &str, listener: &EventListener) -> Result<bool> {
        let Some(service_id) = self.variables.remove(variable, listener) else {
            return Ok(false);
        };

        if !self.variables.service_has_listeners(&service_id) {
            self.subscriptions
                .unsubscribe(&service_id, &self.variable_dispatcher)
                .await?;
        }

        Ok(true)
    }

    /// Number of listeners registered for `variable` through [`on`](Self::on).
    pub fn variable_listener_count(&self, variable: &str) -> usize {
        self.variables.listener_count(variable)
    }

    /// Drop every variable listener and every subscription without sending
    /// UNSUBSCRIBE.
    pub async fn remove_all_listeners(&self) {
        self.variables.clear();
        self.subscriptions.clear_all().await;
    }

    pub async fn has_subscriptions(&self) -> bool {
        self.subscriptions.has_subscriptions().await
    }

    pub async fn is_subscribed(&self, service_id: &str) -> bool {
        self.subscriptions.is_subscribed(service_id).await
    }

    pub async fn listener_count(&self, service_id: &str) -> usize {
        self.subscriptions.listener_count(service_id).await
    }

    /// Drop every subscription locally without notifying the device.
    pub async fn clear_subscriptions(&self) {
        self.subscriptions.clear_all().await;
    }

    /// Send UNSUBSCRIBE for every subscription and drop them all.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        self.subscriptions.unsubscribe_all().await
    }

    /// Receiver of subscriptions lost because a renewal failed.
    pub fn subscription_failures(&self) -> broadcast::Receiver<SubscriptionFailure> {
        self.subscriptions.failures()
    }

    /// URL advertised to devices while the callback server runs.
    pub async fn callback_url(&self) -> Option<String> {
        self.subscriptions.callback_url().await
    }
}

fn parse_device_url(device_url: &str) -> Result<Url> {
    Url::parse(device_url)
        .map_err(|e| UpnpError::Configuration(format!("Invalid device URL {}: {}", device_url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_device_url() {
        match UpnpClient::new("not a url") {
            Err(UpnpError::Configuration(msg)) => assert!(msg.contains("Invalid device URL")),
            other => panic!("Expected configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ClientConfig::default().with_failure_channel_capacity(0);
        assert!(matches!(
            UpnpClient::with_config("http://192.168.1.20:1400/xml/device_description.xml", config),
            Err(UpnpError::Configuration(_))
        ));
    }

    #[test]
    fn test_new_keeps_device_url() {
        let client = UpnpClient::new("http://192.168.1.20:1400/xml/device_description.xml").unwrap();
        assert_eq!(client.device_url().host_str(), Some("192.168.1.20"));
        assert_eq!(client.config().subscription_timeout_secs(), 300);
    }
}
