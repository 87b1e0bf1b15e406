//! Port-value provider boundary
//!
//! The hosting editor owns the live values of input ports and option
//! controls; blocks reach them only through `PortProvider`. This trait is
//! the single point of contact with the host.

use ahash::AHashMap;
use blockflow_schema::Value;

/// Host-side access to a block's live port and option values
pub trait PortProvider {
    /// Value of a named input port; `None` when the port is unconnected
    fn input(&self, label: &str) -> Option<Value>;

    /// Value of a named option control; `None` when the host has no value,
    /// in which case the schema default applies
    fn option(&self, label: &str) -> Option<Value>;

    /// Publish a value on a named output port
    fn set_output(&mut self, label: &str, value: Value);
}

/// Map-backed provider for tests and headless hosts
#[derive(Debug, Default)]
pub struct MemoryPorts {
    inputs: AHashMap<String, Value>,
    options: AHashMap<String, Value>,
    outputs: AHashMap<String, Value>,
}

impl MemoryPorts {
    pub fn new() -> Self {
        MemoryPorts::default()
    }

    pub fn set_input(&mut self, label: &str, value: Value) -> &mut Self {
        self.inputs.insert(label.to_string(), value);
        self
    }

    pub fn set_option(&mut self, label: &str, value: Value) -> &mut Self {
        self.options.insert(label.to_string(), value);
        self
    }

    /// Value most recently published on an output port
    pub fn output(&self, label: &str) -> Option<&Value> {
        self.outputs.get(label)
    }
}

impl PortProvider for MemoryPorts {
    fn input(&self, label: &str) -> Option<Value> {
        self.inputs.get(label).cloned()
    }

    fn option(&self, label: &str) -> Option<Value> {
        self.options.get(label).cloned()
    }

    fn set_output(&mut self, label: &str, value: Value) {
        self.outputs.insert(label.to_string(), value);
    }
}
