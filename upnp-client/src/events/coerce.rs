//! Typed values for well-known evented variables.

use super::time::parse_duration;

/// Value carried by a [`StateEvent`](super::StateEvent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValue {
    /// Raw text, for every variable without a known type
    Text(String),
    /// A duration converted to whole seconds
    Seconds(u32),
    /// A comma-separated list split into its tokens
    List(Vec<String>),
}

impl EventValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_seconds(&self) -> Option<u32> {
        match self {
            EventValue::Seconds(seconds) => Some(*seconds),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            EventValue::List(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Coercion {
    Duration,
    CommaList,
}

const COERCIONS: &[(&str, Coercion)] = &[
    ("CurrentMediaDuration", Coercion::Duration),
    ("CurrentTrackDuration", Coercion::Duration),
    ("CurrentTransportActions", Coercion::CommaList),
    ("PossiblePlaybackStorageMedia", Coercion::CommaList),
];

/// Convert the raw text of `variable` into its typed value.
///
/// A duration that cannot be parsed stays as text.
pub fn coerce_value(variable: &str, raw: &str) -> EventValue {
    let coercion = COERCIONS
        .iter()
        .find(|(name, _)| *name == variable)
        .map(|(_, coercion)| *coercion);

    match coercion {
        Some(Coercion::Duration) => parse_duration(raw)
            .map(EventValue::Seconds)
            .unwrap_or_else(|| EventValue::Text(raw.to_string())),
        Some(Coercion::CommaList) => {
            EventValue::List(raw.split(',').map(|token| token.to_string()).collect())
        }
        None => EventValue::Text(raw.to_string()),
    }
}
