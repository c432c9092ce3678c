//! Decoding of GENA notification bodies.

use xmltree::{Element, XMLNode};

use super::coerce::coerce_value;
use super::StateEvent;
use crate::error::{Result, UpnpError};

const LAST_CHANGE: &str = "LastChange";

/// Decode a `e:propertyset` notification body into state events.
///
/// Each plain property becomes one event without an instance. A
/// `LastChange` property is unescaped and expanded into one event per
/// changed variable of every `InstanceID` it lists.
pub fn decode_notification(xml: &str) -> Result<Vec<StateEvent>> {
    let root = parse(xml)?;
    if root.name != "propertyset" {
        return Err(UpnpError::Parse(format!(
            "Expected propertyset, found {}",
            root.name
        )));
    }

    let mut events = Vec::new();
    for property in child_elements(&root).filter(|e| e.name == "property") {
        for variable in child_elements(property) {
            let text = variable.get_text().map(|t| t.into_owned()).unwrap_or_default();

            if variable.name == LAST_CHANGE {
                events.extend(decode_last_change(&text)?);
            } else {
                events.push(StateEvent {
                    instance_id: None,
                    value: coerce_value(&variable.name, &text),
                    name: variable.name.clone(),
                });
            }
        }
    }

    Ok(events)
}

/// Expand the nested `<Event><InstanceID val="..">` document of a
/// `LastChange` property.
fn decode_last_change(document: &str) -> Result<Vec<StateEvent>> {
    if document.trim().is_empty() {
        return Ok(Vec::new());
    }

    let event = parse(document)?;
    let mut events = Vec::new();

    for instance in child_elements(&event).filter(|e| e.name == "InstanceID") {
        let instance_id = instance
            .attributes
            .get("val")
            .and_then(|val| val.trim().parse::<u32>().ok());

        for change in child_elements(instance) {
            let raw = match change.attributes.get("val") {
                Some(val) => val.clone(),
                None => change.get_text().map(|t| t.into_owned()).unwrap_or_default(),
            };
            events.push(StateEvent {
                instance_id,
                value: coerce_value(&change.name, &raw),
                name: change.name.clone(),
            });
        }
    }

    Ok(events)
}

fn parse(xml: &str) -> Result<Element> {
    Element::parse(xml.trim().as_bytes()).map_err(|e| UpnpError::Parse(e.to_string()))
}

fn child_elements(parent: &Element) -> impl Iterator<Item = &Element> {
    parent.children.iter().filter_map(|node| match node {
        XMLNode::Element(element) => Some(element),
        _ => None,
    })
}
