//! Schema type system for blockflow blocks
//!
//! This module provides:
//! - `BlockSchema` with ordered input ports, output labels and option controls
//! - `ControlType` UI control variants with type-appropriate defaults
//! - `ValueType` declared value types and their control mapping

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// The universal port/option value type. Everything flowing through ports,
/// options, caches and combination grids is a JSON value.
pub type Value = serde_json::Value;

/// Named argument mapping handed to compute functions. `serde_json::Map`
/// keeps keys sorted, which makes cache keys deterministic.
pub type ArgMap = serde_json::Map<String, Value>;

// =============================================================================
// CONTROL TYPES
// =============================================================================

/// UI control kind bound to an option
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ControlType {
    Checkbox = 0,
    #[default]
    Input = 1,
    Integer = 2,
    Number = 3,
    Select = 4,
    Slider = 5,
    Display = 6,
}

impl ControlType {
    /// Type-appropriate default value for a control. A select defaults to its
    /// first item when one exists.
    pub fn default_value(self, items: Option<&[Value]>) -> Value {
        match self {
            ControlType::Checkbox => Value::Bool(false),
            ControlType::Input | ControlType::Display => Value::String(String::new()),
            ControlType::Integer => Value::from(0),
            ControlType::Number | ControlType::Slider => Value::from(0.0),
            ControlType::Select => items
                .and_then(|items| items.first().cloned())
                .unwrap_or_else(|| Value::String(String::new())),
        }
    }
}

/// Declared value type of a descriptor parameter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ValueType {
    Bool = 0,
    Int = 1,
    Float = 2,
    Str = 3,
    #[default]
    Any = 4,
}

impl ValueType {
    /// Resolve the control type for an `auto`-typed option from the
    /// parameter's declared value type. Anything without a dedicated control
    /// falls back to a free-text input.
    pub fn control(self) -> ControlType {
        match self {
            ValueType::Bool => ControlType::Checkbox,
            ValueType::Int => ControlType::Integer,
            ValueType::Float => ControlType::Number,
            ValueType::Str | ValueType::Any => ControlType::Input,
        }
    }
}

// =============================================================================
// PORTS
// =============================================================================

/// Port labels for a single parameter. A variadic parameter may expand into
/// several labeled ports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortLabels {
    Single(Arc<str>),
    Variadic(SmallVec<[Arc<str>; 4]>),
}

impl PortLabels {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> {
        match self {
            PortLabels::Single(label) => std::slice::from_ref(label).iter(),
            PortLabels::Variadic(labels) => labels.iter(),
        }
    }
}

/// An input port (or group of ports, for variadic parameters) bound to a
/// function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPort {
    pub param: Arc<str>,
    pub labels: PortLabels,
}

// =============================================================================
// OPTIONS
// =============================================================================

/// A user-configurable control bound to a function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Parameter the option feeds. Display-only options carry a synthetic
    /// parameter name and never reach the compute function.
    pub param: Arc<str>,
    /// Label shown by (and queried from) the hosting editor
    pub label: Arc<str>,
    #[serde(rename = "type")]
    pub control: ControlType,
    /// Default value for the control
    pub value: Value,
    /// Items for select controls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Arc<[Value]>>,
}

impl OptionSpec {
    pub fn display(label: &str, text: &str) -> Self {
        OptionSpec {
            param: Arc::from(label),
            label: Arc::from(label),
            control: ControlType::Display,
            value: Value::String(text.to_string()),
            items: None,
        }
    }

    /// Whether the option feeds a parameter of the compute function
    pub fn is_display(&self) -> bool {
        self.control == ControlType::Display
    }
}

// =============================================================================
// BLOCK SCHEMA
// =============================================================================

/// Declarative schema of a block: everything the hosting editor needs to
/// render and wire a node, derived once per adapted function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSchema {
    pub name: Arc<str>,
    pub category: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<Arc<str>>,
    /// Parameter -> port labels, in declaration order, options excluded
    pub inputs: Vec<InputPort>,
    /// Ordered output port labels
    pub outputs: Vec<Arc<str>>,
    /// Ordered option controls
    pub options: Vec<OptionSpec>,
}

impl BlockSchema {
    /// Look up the option bound to a parameter
    pub fn option(&self, param: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|opt| opt.param.as_ref() == param)
    }

    /// All input port labels in declaration order
    pub fn input_labels(&self) -> impl Iterator<Item = &Arc<str>> {
        self.inputs.iter().flat_map(|input| input.labels.iter())
    }
}
