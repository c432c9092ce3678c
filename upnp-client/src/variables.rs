//! Per-variable listener registry behind `UpnpClient::on`/`off`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::events::StateEvent;
use crate::subscription::EventListener;

struct Registration {
    service_id: String,
    listeners: Vec<EventListener>,
}

/// Maps state variable names to the listeners interested in them.
#[derive(Default)]
pub struct VariableRegistry {
    entries: RwLock<HashMap<String, Registration>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `variable`, owned by `service_id`.
    ///
    /// Returns `false` if the listener was already registered.
    pub fn add(&self, service_id: &str, variable: &str, listener: EventListener) -> bool {
        let mut entries = self.entries.write();
        let registration = entries
            .entry(variable.to_string())
            .or_insert_with(|| Registration {
                service_id: service_id.to_string(),
                listeners: Vec::new(),
            });

        if registration.listeners.contains(&listener) {
            return false;
        }
        registration.listeners.push(listener);
        true
    }

    /// Remove `listener` from `variable`.
    ///
    /// Returns the owning service when the listener was registered.
    pub fn remove(&self, variable: &str, listener: &EventListener) -> Option<String> {
        let mut entries = self.entries.write();
        let registration = entries.get_mut(variable)?;
        let index = registration.listeners.iter().position(|l| l == listener)?;
        registration.listeners.remove(index);

        let service_id = registration.service_id.clone();
        if registration.listeners.is_empty() {
            entries.remove(variable);
        }
        Some(service_id)
    }

    /// Whether any variable of `service_id` still has listeners.
    pub fn service_has_listeners(&self, service_id: &str) -> bool {
        self.entries
            .read()
            .values()
            .any(|registration| registration.service_id == service_id)
    }

    pub fn listener_count(&self, variable: &str) -> usize {
        self.entries
            .read()
            .get(variable)
            .map(|registration| registration.listeners.len())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Deliver `event` to the listeners of its variable, in registration order.
    pub fn emit(&self, event: &StateEvent) {
        let listeners = match self.entries.read().get(&event.name) {
            Some(registration) => registration.listeners.clone(),
            None => return,
        };

        for listener in &listeners {
            listener.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventValue;

    const AVT: &str = "urn:upnp-org:serviceId:AVTransport";

    fn event(name: &str) -> StateEvent {
        StateEvent {
            instance_id: Some(0),
            name: name.to_string(),
            value: EventValue::Text("PLAYING".to_string()),
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = VariableRegistry::new();
        let listener = EventListener::new(|_| {});

        assert!(registry.add(AVT, "TransportState", listener.clone()));
        assert!(!registry.add(AVT, "TransportState", listener.clone()));
        assert_eq!(registry.listener_count("TransportState"), 1);
    }

    #[test]
    fn test_remove_reports_owner_and_cleans_up() {
        let registry = VariableRegistry::new();
        let a = EventListener::new(|_| {});
        let b = EventListener::new(|_| {});

        registry.add(AVT, "TransportState", a.clone());
        registry.add(AVT, "CurrentTrackDuration", b.clone());

        assert_eq!(registry.remove("TransportState", &b), None);
        assert_eq!(registry.remove("TransportState", &a).as_deref(), Some(AVT));
        assert_eq!(registry.listener_count("TransportState"), 0);
        assert!(registry.service_has_listeners(AVT));

        registry.remove("CurrentTrackDuration", &b);
        assert!(!registry.service_has_listeners(AVT));
    }

    #[test]
    fn test_emit_only_reaches_matching_variable() {
        let registry = VariableRegistry::new();
        let (state_listener, mut state_rx) = EventListener::channel();
        let (duration_listener, mut duration_rx) = EventListener::channel();

        registry.add(AVT, "TransportState", state_listener);
        registry.add(AVT, "CurrentTrackDuration", duration_listener);

        registry.emit(&event("TransportState"));
        registry.emit(&event("Volume"));

        assert_eq!(state_rx.try_recv().unwrap().name, "TransportState");
        assert!(state_rx.try_recv().is_err());
        assert!(duration_rx.try_recv().is_err());
    }

    #[test]
    fn test_clear() {
        let registry = VariableRegistry::new();
        registry.add(AVT, "TransportState", EventListener::new(|_| {}));
        registry.clear();
        assert!(!registry.service_has_listeners(AVT));
    }
}
