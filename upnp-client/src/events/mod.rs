//! State-change events decoded from GENA notifications.

mod codec;
mod coerce;
mod time;

pub use codec::decode_notification;
pub use coerce::{coerce_value, EventValue};
pub use time::{format_duration, parse_duration};

/// One changed state variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEvent {
    /// Instance the change applies to, for `LastChange` based services
    pub instance_id: Option<u32>,
    /// State variable name
    pub name: String,
    pub value: EventValue,
}
