//! SOAP envelope encoding and decoding.

use std::collections::HashMap;
use std::fmt;

use quick_xml::escape::escape;
use xmltree::{Element, XMLNode};

use crate::error::{SoapError, UpnpFault};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// A single action argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Sent as an empty element
    Null,
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => Ok(()),
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::Integer(v) => write!(f, "{}", v),
            ArgValue::Unsigned(v) => write!(f, "{}", v),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

macro_rules! arg_value_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(impl From<$t> for ArgValue {
            fn from(value: $t) -> Self {
                ArgValue::$variant(<$target>::from(value))
            }
        })*
    };
}

arg_value_from_int!(Integer, i64: i8, i16, i32, i64);
arg_value_from_int!(Unsigned, u64: u8, u16, u32, u64);

/// Ordered arguments for an action invocation.
///
/// An argument added without a value is left out of the envelope entirely,
/// while [`ArgValue::Null`] produces an empty element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArgs {
    entries: Vec<(String, Option<ArgValue>)>,
}

impl ActionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.entries.push((name.into(), Some(value.into())));
        self
    }

    /// Append an argument that may have no value.
    pub fn maybe(mut self, name: impl Into<String>, value: Option<impl Into<ArgValue>>) -> Self {
        self.entries.push((name.into(), value.map(Into::into)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arguments that will be sent, with their textual representation.
    pub fn rendered(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v.to_string())))
    }
}

impl<K, V> FromIterator<(K, V)> for ActionArgs
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}

/// Build the SOAP envelope invoking `action` on a service of `service_type`.
pub fn build_action_envelope(service_type: &str, action: &str, args: &ActionArgs) -> String {
    let mut payload = String::new();
    for (name, value) in args.rendered() {
        payload.push_str(&format!("<{name}>{}</{name}>", escape(value.as_str())));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="{ENVELOPE_NS}" s:encodingStyle="{ENCODING_STYLE}"><s:Body><u:{action} xmlns:u="{service_type}">{payload}</u:{action}></s:Body></s:Envelope>"#,
        service_type = escape(service_type),
    )
}

/// Extract the declared outputs from an action response envelope.
///
/// Outputs missing from the response are missing from the result. A fault
/// envelope is reported as [`SoapError::Fault`] even on a success status.
pub fn decode_action_response(
    xml: &str,
    action: &str,
    outputs: &[&str],
) -> Result<HashMap<String, String>, SoapError> {
    let envelope = Element::parse(xml.as_bytes()).map_err(|e| SoapError::Parse(e.to_string()))?;
    let body = envelope
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if body.get_child("Fault").is_some() {
        return Err(decode_fault(200, xml)
            .map(SoapError::Fault)
            .unwrap_or(SoapError::Parse("Undecodable SOAP fault".to_string())));
    }

    let response_name = format!("{}Response", action);
    let response = body
        .get_child(response_name.as_str())
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))?;

    Ok(outputs
        .iter()
        .filter_map(|name| {
            response.get_child(*name).map(|child| {
                let text = child.get_text().map(|t| t.into_owned()).unwrap_or_default();
                (name.to_string(), text)
            })
        })
        .collect())
}

/// Decode a fault envelope into its UPnP error code and description.
///
/// Returns `None` when the body is not a fault envelope or has no usable
/// error code.
pub fn decode_fault(status: u16, xml: &str) -> Option<UpnpFault> {
    let envelope = Element::parse(xml.as_bytes()).ok()?;
    let detail = envelope.get_child("Body")?.get_child("Fault")?.get_child("detail")?;
    let error = child_ignore_case(detail, "UPnPError")?;

    let error_code = error.get_child("errorCode")?.get_text()?.trim().parse::<u16>().ok()?;
    let description = error
        .get_child("errorDescription")
        .and_then(|d| d.get_text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    Some(UpnpFault {
        status,
        error_code,
        description,
    })
}

fn child_ignore_case<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(e) if e.name.eq_ignore_ascii_case(name) => Some(e),
        _ => None,
    })
}
