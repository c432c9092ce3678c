//! Subscription lifecycle management.
//!
//! One GENA subscription is held per service, shared by every listener
//! registered for that service. The callback server runs while at least one
//! subscription exists or is being established, and each subscription owns a
//! renewal task re-armed after every successful renewal.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use callback_server::{CallbackServer, NotificationPayload};
use dashmap::DashMap;
use soap_client::{SoapClient, SoapError};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::listener::EventListener;
use crate::cache::DescriptionCache;
use crate::config::ClientConfig;
use crate::error::{Result, UpnpError};
use crate::events::decode_notification;
use crate::service_id::resolve_service_id;

/// A subscription lost outside of any caller's request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFailure {
    pub service_id: String,
    pub error: UpnpError,
}

/// Delay before renewing a subscription granted for `granted`.
pub fn renewal_delay(granted: Duration, margin: Duration, floor: Duration) -> Duration {
    granted.saturating_sub(margin).max(floor)
}

struct Subscription {
    sid: String,
    event_url: Url,
    listeners: Vec<EventListener>,
    renewal: Option<JoinHandle<()>>,
}

struct RunningListener {
    server: CallbackServer,
    callback_url: String,
    dispatcher: JoinHandle<()>,
}

impl RunningListener {
    async fn stop(self) {
        self.dispatcher.abort();
        self.server.shutdown().await;
        info!(callback_url = %self.callback_url, "Event listener stopped");
    }
}

#[derive(Default)]
struct ListenerSlot {
    running: Option<RunningListener>,
    /// Subscribe requests in flight that rely on the running listener
    pending: usize,
}

struct Inner {
    soap: SoapClient,
    cache: Arc<DescriptionCache>,
    config: ClientConfig,
    records: RwLock<HashMap<String, Subscription>>,
    service_locks: DashMap<String, Arc<Mutex<()>>>,
    listener: Mutex<ListenerSlot>,
    failures: broadcast::Sender<SubscriptionFailure>,
}

/// Owns the subscriptions of one client and the callback server they share.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    pub fn new(soap: SoapClient, cache: Arc<DescriptionCache>, config: ClientConfig) -> Self {
        let (failures, _) = broadcast::channel(config.failure_channel_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                soap,
                cache,
                config,
                records: RwLock::new(HashMap::new()),
                service_locks: DashMap::new(),
                listener: Mutex::new(ListenerSlot::default()),
                failures,
            }),
        }
    }

    /// Register `listener` for the events of a service.
    ///
    /// The first listener of a service creates the subscription; later ones
    /// join it without any network traffic. Registering the same listener
    /// twice has no effect.
    ///
    /// # Errors
    ///
    /// - `UpnpError::NoService` if the device does not list the service
    /// - `UpnpError::Subscribe` if the device rejects the SUBSCRIBE request
    pub async fn subscribe(&self, service_id: &str, listener: EventListener) -> Result<()> {
        let service_id = resolve_service_id(service_id).into_owned();
        let lock = self.inner.service_lock(&service_id);
        let _guard = lock.lock().await;

        {
            let mut records = self.inner.records.write().await;
            if let Some(record) = records.get_mut(&service_id) {
                if !record.listeners.contains(&listener) {
                    record.listeners.push(listener);
                }
                return Ok(());
            }
        }

        let service = self.inner.cache.service_ref(&service_id).await?;
        let callback_url = self.inner.acquire_listener().await?;

        let response = match self
            .inner
            .soap
            .subscribe(
                &service.event_sub_url,
                &callback_url,
                self.inner.config.subscription_timeout_secs(),
            )
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.inner.release_listener().await;
                return Err(status_error(err, |status| UpnpError::Subscribe { status }));
            }
        };

        info!(
            service_id = %service_id,
            sid = %response.sid,
            timeout = response.timeout_seconds,
            "Subscribed"
        );

        let renewal = self
            .inner
            .schedule_renewal(service_id.clone(), response.timeout_seconds);
        self.inner.records.write().await.insert(
            service_id,
            Subscription {
                sid: response.sid,
                event_url: service.event_sub_url,
                listeners: vec![listener],
                renewal: Some(renewal),
            },
        );
        self.inner.release_listener().await;

        Ok(())
    }

    /// Remove `listener` from a service.
    ///
    /// Removing the last listener cancels the renewal and sends UNSUBSCRIBE.
    /// The local subscription is dropped even when the device rejects the
    /// request, rather than kept for another attempt: calling `unsubscribe`
    /// again after an error is a no-op.
    ///
    /// # Errors
    ///
    /// `UpnpError::Unsubscribe` if the device rejects the UNSUBSCRIBE request.
    pub async fn unsubscribe(&self, service_id: &str, listener: &EventListener) -> Result<()> {
        let service_id = resolve_service_id(service_id).into_owned();
        let lock = self.inner.service_lock(&service_id);
        let _guard = lock.lock().await;

        let removed = {
            let mut records = self.inner.records.write().await;
            let Some(record) = records.get_mut(&service_id) else {
                return Ok(());
            };
            let Some(index) = record.listeners.iter().position(|l| l == listener) else {
                return Ok(());
            };
            record.listeners.remove(index);
            if !record.listeners.is_empty() {
                return Ok(());
            }
            records.remove(&service_id)
        };

        let Some(mut record) = removed else {
            return Ok(());
        };
        if let Some(renewal) = record.renewal.take() {
            renewal.abort();
        }

        let result = self
            .inner
            .soap
            .unsubscribe(&record.event_url, &record.sid)
            .await;
        info!(service_id = %service_id, sid = %record.sid, ok = result.is_ok(), "Unsubscribed");

        self.inner.stop_listener_if_idle().await;
        result.map_err(|err| status_error(err, |status| UpnpError::Unsubscribe { status }))
    }

    /// Drop every subscription without notifying the device and stop the
    /// callback server.
    pub async fn clear_all(&self) {
        let mut slot = self.inner.listener.lock().await;

        let drained: Vec<Subscription> = self
            .inner
            .records
            .write()
            .await
            .drain()
            .map(|(_, record)| record)
            .collect();
        for renewal in drained.iter().filter_map(|r| r.renewal.as_ref()) {
            renewal.abort();
        }
        info!(count = drained.len(), "Cleared subscriptions");

        if slot.pending == 0 {
            if let Some(running) = slot.running.take() {
                running.stop().await;
            }
        }
    }

    /// Send UNSUBSCRIBE for every subscription, then stop the callback
    /// server.
    ///
    /// Every subscription is dropped locally. The first failure is returned
    /// after all requests have been attempted.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        let service_ids: Vec<String> = self.inner.records.read().await.keys().cloned().collect();
        let mut first_error = None;

        for service_id in service_ids {
            let lock = self.inner.service_lock(&service_id);
            let _guard = lock.lock().await;

            let Some(mut record) = self.inner.records.write().await.remove(&service_id) else {
                continue;
            };
            if let Some(renewal) = record.renewal.take() {
                renewal.abort();
            }

            if let Err(err) = self.inner.soap.unsubscribe(&record.event_url, &record.sid).await {
                let error = status_error(err, |status| UpnpError::Unsubscribe { status });
                warn!(service_id = %service_id, %error, "UNSUBSCRIBE failed");
                first_error.get_or_insert(error);
            }
        }

        self.inner.stop_listener_if_idle().await;
        first_error.map_or(Ok(()), Err)
    }

    pub async fn has_subscriptions(&self) -> bool {
        !self.inner.records.read().await.is_empty()
    }

    pub async fn is_subscribed(&self, service_id: &str) -> bool {
        let service_id = resolve_service_id(service_id);
        self.inner.records.read().await.contains_key(service_id.as_ref())
    }

    /// Number of listeners registered for a service.
    pub async fn listener_count(&self, service_id: &str) -> usize {
        let service_id = resolve_service_id(service_id);
        self.inner
            .records
            .read()
            .await
            .get(service_id.as_ref())
            .map(|r| r.listeners.len())
            .unwrap_or(0)
    }

    /// URL sent in CALLBACK headers while the callback server runs.
    pub async fn callback_url(&self) -> Option<String> {
        self.inner
            .listener
            .lock()
            .await
            .running
            .as_ref()
            .map(|running| running.callback_url.clone())
    }

    /// Receiver of renewal failures.
    pub fn failures(&self) -> broadcast::Receiver<SubscriptionFailure> {
        self.inner.failures.subscribe()
    }
}

impl Inner {
    fn service_lock(&self, service_id: &str) -> Arc<Mutex<()>> {
        self.service_locks
            .entry(service_id.to_string())
            .or_default()
            .clone()
    }

    /// Start the callback server if needed and hold it open for one
    /// subscribe request.
    async fn acquire_listener(self: &Arc<Self>) -> Result<String> {
        let mut slot = self.listener.lock().await;

        if slot.running.is_none() {
            slot.running = Some(self.start_listener().await?);
        }
        slot.pending += 1;

        Ok(slot
            .running
            .as_ref()
            .map(|running| running.callback_url.clone())
            .unwrap_or_default())
    }

    async fn release_listener(&self) {
        {
            let mut slot = self.listener.lock().await;
            slot.pending = slot.pending.saturating_sub(1);
        }
        self.stop_listener_if_idle().await;
    }

    async fn start_listener(self: &Arc<Self>) -> Result<RunningListener> {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = CallbackServer::bind(
            self.config.callback_bind_ip,
            self.config.callback_advertise_ip,
            tx,
        )
        .await?;

        let callback_url = format!("{}/", server.base_url());
        let dispatcher = tokio::spawn(run_dispatcher(Arc::downgrade(self), rx));
        info!(%callback_url, "Event listener started");

        Ok(RunningListener {
            server,
            callback_url,
            dispatcher,
        })
    }

    async fn stop_listener_if_idle(&self) {
        let mut slot = self.listener.lock().await;
        if slot.pending > 0 || !self.records.read().await.is_empty() {
            return;
        }
        if let Some(running) = slot.running.take() {
            running.stop().await;
        }
    }

    fn schedule_renewal(self: &Arc<Self>, service_id: String, granted_secs: u32) -> JoinHandle<()> {
        let delay = renewal_delay(
            Duration::from_secs(granted_secs.into()),
            self.config.renewal_margin,
            self.config.renewal_floor,
        );
        debug!(service_id = %service_id, ?delay, "Renewal scheduled");

        let inner = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.renew(&service_id).await;
            }
        })
    }

    /// Runs inside the renewal task of the subscription, so the task handle
    /// stored in the record is only ever replaced or dropped here, never
    /// aborted.
    async fn renew(self: &Arc<Self>, service_id: &str) {
        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;

        let target = self
            .records
            .read()
            .await
            .get(service_id)
            .map(|r| (r.sid.clone(), r.event_url.clone()));
        let Some((sid, event_url)) = target else {
            return;
        };

        match self
            .soap
            .renew_subscription(&event_url, &sid, self.config.subscription_timeout_secs())
            .await
        {
            Ok(granted) => {
                let renewal = self.schedule_renewal(service_id.to_string(), granted);
                let mut records = self.records.write().await;
                match records.get_mut(service_id) {
                    Some(record) if record.sid == sid => record.renewal = Some(renewal),
                    _ => renewal.abort(),
                }
                debug!(service_id, sid = %sid, timeout = granted, "Subscription renewed");
            }
            Err(err) => {
                let error = status_error(err, |status| UpnpError::SubscriptionRenewal { status });
                warn!(service_id, sid = %sid, %error, "Subscription renewal failed");

                self.records.write().await.remove(service_id);
                let _ = self.failures.send(SubscriptionFailure {
                    service_id: service_id.to_string(),
                    error,
                });
                self.stop_listener_if_idle().await;
            }
        }
    }

    async fn dispatch(&self, payload: NotificationPayload) {
        let target = {
            let records = self.records.read().await;
            records
                .iter()
                .find(|(_, record)| record.sid == payload.subscription_id)
                .map(|(service_id, record)| (service_id.clone(), record.listeners.clone()))
        };

        let Some((service_id, listeners)) = target else {
            debug!(sid = %payload.subscription_id, "Ignoring notification for unknown subscription");
            return;
        };

        let events = match decode_notification(&payload.event_xml) {
            Ok(events) => events,
            Err(error) => {
                warn!(service_id = %service_id, %error, "Undecodable notification");
                return;
            }
        };

        debug!(
            service_id = %service_id,
            events = events.len(),
            listeners = listeners.len(),
            "Dispatching notification"
        );
        for listener in &listeners {
            for event in &events {
                listener.notify(event);
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for renewal in self.records.get_mut().values().filter_map(|r| r.renewal.as_ref()) {
            renewal.abort();
        }
        if let Some(running) = self.listener.get_mut().running.take() {
            running.dispatcher.abort();
        }
    }
}

async fn run_dispatcher(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<NotificationPayload>) {
    while let Some(payload) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.dispatch(payload).await;
    }
}

fn status_error(err: SoapError, on_status: impl FnOnce(u16) -> UpnpError) -> UpnpError {
    match err {
        SoapError::HttpStatus(status) => on_status(status),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(300, 30, 30, 270)]
    #[case(1800, 30, 30, 1770)]
    #[case(45, 30, 30, 30)]
    #[case(0, 30, 30, 30)]
    #[case(10, 30, 5, 5)]
    fn test_renewal_delay(
        #[case] granted: u64,
        #[case] margin: u64,
        #[case] floor: u64,
        #[case] expected: u64,
    ) {
        assert_eq!(
            renewal_delay(
                Duration::from_secs(granted),
                Duration::from_secs(margin),
                Duration::from_secs(floor)
            ),
            Duration::from_secs(expected)
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error(SoapError::HttpStatus(412), |status| UpnpError::SubscriptionRenewal { status }),
            UpnpError::SubscriptionRenewal { status: 412 }
        );
        assert_eq!(
            status_error(SoapError::Network("refused".into()), |status| UpnpError::Subscribe { status }),
            UpnpError::Network("refused".into())
        );
    }

    proptest! {
        #[test]
        fn prop_renewal_delay_is_max_of_remaining_and_floor(
            granted in 0u64..100_000,
            margin in 0u64..10_000,
            floor in 1u64..10_000,
        ) {
            let delay = renewal_delay(
                Duration::from_secs(granted),
                Duration::from_secs(margin),
                Duration::from_secs(floor),
            );
            let expected = std::cmp::max(granted.saturating_sub(margin), floor);
            prop_assert_eq!(delay, Duration::from_secs(expected));
        }
    }
}
