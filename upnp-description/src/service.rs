//! Service description (SCPD) parsing.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{DescriptionError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scpd {
    action_list: Option<RawActionList>,
    service_state_table: Option<RawStateTable>,
}

#[derive(Debug, Deserialize)]
struct RawActionList {
    #[serde(rename = "action", default)]
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    name: String,
    argument_list: Option<RawArgumentList>,
}

#[derive(Debug, Deserialize)]
struct RawArgumentList {
    #[serde(rename = "argument", default)]
    arguments: Vec<RawArgument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArgument {
    name: String,
    direction: String,
    related_state_variable: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStateTable {
    #[serde(rename = "stateVariable", default)]
    variables: Vec<RawStateVariable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStateVariable {
    #[serde(rename = "@sendEvents")]
    send_events: Option<String>,
    name: String,
    data_type: Option<String>,
    default_value: Option<String>,
    allowed_value_list: Option<RawAllowedValueList>,
    allowed_value_range: Option<RawAllowedValueRange>,
}

#[derive(Debug, Deserialize)]
struct RawAllowedValueList {
    #[serde(rename = "allowedValue", default)]
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAllowedValueRange {
    minimum: Option<String>,
    maximum: Option<String>,
    step: Option<String>,
}

/// Actions and state variables of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescription {
    /// Actions keyed by action name
    pub actions: HashMap<String, ActionSpec>,
    /// State variables keyed by variable name
    pub state_variables: HashMap<String, StateVariableSpec>,
}

/// Declared arguments of an action, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: String,
    /// Input arguments in declaration order
    pub inputs: Vec<ArgumentSpec>,
    /// Output arguments in declaration order
    pub outputs: Vec<ArgumentSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub related_state_variable: Option<String>,
}

/// One entry of the service state table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariableSpec {
    pub name: String,
    /// Declared UPnP data type (`string`, `ui4`, `boolean`, ...)
    pub data_type: Option<String>,
    pub default_value: Option<String>,
    /// Whether changes are announced through eventing. Defaults to `true`.
    pub send_events: bool,
    /// Enumerated values, empty when the variable is not an enumeration
    pub allowed_values: Vec<String>,
    pub allowed_value_range: Option<AllowedValueRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedValueRange {
    pub minimum: Option<String>,
    pub maximum: Option<String>,
    pub step: Option<String>,
}

impl ServiceDescription {
    /// Parse a service description document.
    ///
    /// # Errors
    ///
    /// Returns `DescriptionError::Parse` if the XML is malformed.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let scpd: Scpd = quick_xml::de::from_str(xml)
            .map_err(|e| DescriptionError::Parse(format!("Failed to parse service XML: {}", e)))?;

        let actions = scpd
            .action_list
            .map(|list| list.actions)
            .unwrap_or_default()
            .into_iter()
            .map(|raw| {
                let spec = ActionSpec::from_raw(raw);
                (spec.name.clone(), spec)
            })
            .collect();

        let state_variables = scpd
            .service_state_table
            .map(|table| table.variables)
            .unwrap_or_default()
            .into_iter()
            .map(|raw| {
                let spec = StateVariableSpec::from_raw(raw);
                (spec.name.clone(), spec)
            })
            .collect();

        Ok(Self {
            actions,
            state_variables,
        })
    }

    pub fn action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    pub fn state_variable(&self, name: &str) -> Option<&StateVariableSpec> {
        self.state_variables.get(name)
    }

    /// Check whether the service owns `variable`, optionally counting
    /// variables that do not send events.
    pub fn owns_variable(&self, variable: &str, include_non_evented: bool) -> bool {
        self.state_variables
            .get(variable)
            .map(|v| v.send_events || include_non_evented)
            .unwrap_or(false)
    }
}

impl ActionSpec {
    fn from_raw(raw: RawAction) -> Self {
        let mut spec = ActionSpec {
            name: raw.name.trim().to_string(),
            ..Default::default()
        };

        for arg in raw.argument_list.map(|list| list.arguments).unwrap_or_default() {
            let argument = ArgumentSpec {
                name: arg.name.trim().to_string(),
                related_state_variable: arg.related_state_variable,
            };
            if arg.direction.trim().eq_ignore_ascii_case("in") {
                spec.inputs.push(argument);
            } else {
                spec.outputs.push(argument);
            }
        }

        spec
    }

    /// Names of the output arguments, in declaration order.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|a| a.name.as_str()).collect()
    }
}

impl StateVariableSpec {
    fn from_raw(raw: RawStateVariable) -> Self {
        let send_events = !matches!(
            raw.send_events.as_deref().map(str::trim),
            Some(flag) if flag.eq_ignore_ascii_case("no")
        );

        StateVariableSpec {
            name: raw.name.trim().to_string(),
            data_type: raw.data_type,
            default_value: raw.default_value,
            send_events,
            allowed_values: raw
                .allowed_value_list
                .map(|list| list.values)
                .unwrap_or_default(),
            allowed_value_range: raw.allowed_value_range.map(|range| AllowedValueRange {
                minimum: range.minimum,
                maximum: range.maximum,
                step: range.step,
            }),
        }
    }
}
