//! Configuration types for the upnp-client crate

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::UpnpError;

/// Configuration for an [`UpnpClient`](crate::UpnpClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// User-Agent header sent with every request
    /// Default: `"<os>/<arch> UPnP/1.1 upnp-client/<version>"`
    pub user_agent: String,

    /// TCP connect timeout
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Whole-request timeout
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// Lifetime requested in SUBSCRIBE and renewal requests
    /// Default: 300 seconds
    pub subscription_timeout: Duration,

    /// How long before expiry a renewal is sent
    /// Default: 30 seconds
    pub renewal_margin: Duration,

    /// Lower bound of the renewal delay
    /// Default: 30 seconds
    pub renewal_floor: Duration,

    /// Address the callback server binds to
    /// Default: 0.0.0.0
    pub callback_bind_ip: IpAddr,

    /// Address advertised in CALLBACK headers, detected when unset
    /// Default: None
    pub callback_advertise_ip: Option<IpAddr>,

    /// Buffer size of the subscription failure broadcast channel
    /// Default: 16
    pub failure_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            subscription_timeout: Duration::from_secs(300),
            renewal_margin: Duration::from_secs(30),
            renewal_floor: Duration::from_secs(30),
            callback_bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            callback_advertise_ip: None,
            failure_channel_capacity: 16,
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "{}/{} UPnP/1.1 {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), UpnpError> {
        if self.subscription_timeout.as_secs() == 0 {
            return Err(UpnpError::Configuration(
                "Subscription timeout must be at least one second".to_string(),
            ));
        }

        if self.renewal_floor.is_zero() {
            return Err(UpnpError::Configuration(
                "Renewal floor must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(UpnpError::Configuration(
                "HTTP timeouts must be greater than 0".to_string(),
            ));
        }

        if self.failure_channel_capacity == 0 {
            return Err(UpnpError::Configuration(
                "Failure channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(UpnpError::Configuration(
                "User agent must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Requested subscription lifetime in whole seconds, as sent in `TIMEOUT`.
    pub fn subscription_timeout_secs(&self) -> u32 {
        u32::try_from(self.subscription_timeout.as_secs()).unwrap_or(u32::MAX)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_http_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    pub fn with_subscription_timeout(mut self, timeout: Duration) -> Self {
        self.subscription_timeout = timeout;
        self
    }

    pub fn with_renewal(mut self, margin: Duration, floor: Duration) -> Self {
        self.renewal_margin = margin;
        self.renewal_floor = floor;
        self
    }

    pub fn with_callback_bind_ip(mut self, ip: IpAddr) -> Self {
        self.callback_bind_ip = ip;
        self
    }

    pub fn with_callback_advertise_ip(mut self, ip: IpAddr) -> Self {
        self.callback_advertise_ip = Some(ip);
        self
    }

    pub fn with_failure_channel_capacity(mut self, capacity: usize) -> Self {
        self.failure_channel_capacity = capacity;
        self
    }
}
