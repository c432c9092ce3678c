//! Event subscriptions and their listeners.

mod listener;
mod manager;

pub use listener::EventListener;
pub use manager::{renewal_delay, SubscriptionFailure, SubscriptionManager};
