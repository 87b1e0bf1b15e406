//! Shared execution types
//!
//! `Args` carries the resolved values a block invocation hands to its compute
//! function; `Outputs` is the declared-arity result. The output count of a
//! function is fixed by its conversion into `Outputs`: a unit return yields
//! zero outputs, a single value one, a tuple or vector as many as it holds.

use crate::types::{ArgMap, Value};
use std::sync::Arc;

/// Resolved arguments for one compute invocation: flattened variadic values
/// in port order plus named input/option values
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: ArgMap,
}

impl Args {
    pub fn from_named(named: ArgMap) -> Self {
        Args {
            positional: Vec::new(),
            named,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }
}

/// Ordered output values produced by a compute function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs(Vec<Value>);

impl Outputs {
    /// A bare/None-style return: zero outputs
    pub fn none() -> Self {
        Outputs(Vec::new())
    }

    pub fn single(value: Value) -> Self {
        Outputs(vec![value])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<()> for Outputs {
    fn from((): ()) -> Self {
        Outputs::none()
    }
}

impl From<Value> for Outputs {
    fn from(value: Value) -> Self {
        Outputs::single(value)
    }
}

impl From<(Value, Value)> for Outputs {
    fn from((a, b): (Value, Value)) -> Self {
        Outputs(vec![a, b])
    }
}

impl From<(Value, Value, Value)> for Outputs {
    fn from((a, b, c): (Value, Value, Value)) -> Self {
        Outputs(vec![a, b, c])
    }
}

impl From<Vec<Value>> for Outputs {
    fn from(values: Vec<Value>) -> Self {
        Outputs(values)
    }
}

/// A wrapped compute function. Failures inside user code surface as opaque
/// `anyhow` errors and are captured at the node-execution boundary.
pub type ComputeFn = Arc<dyn Fn(&Args) -> anyhow::Result<Outputs> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_arity_matches_return_shape() {
        assert_eq!(Outputs::from(()).len(), 0);
        assert_eq!(Outputs::from(Value::from(42)).len(), 1);
        assert_eq!(Outputs::from((Value::from(1), Value::from(2))).len(), 2);
        assert_eq!(
            Outputs::from((Value::from(1), Value::from(2), Value::from(3))).len(),
            3
        );
        assert_eq!(Outputs::from(vec![Value::Null; 5]).len(), 5);
    }

    #[test]
    fn null_is_still_one_output() {
        // Returning an explicit null value is one output; only a unit return
        // yields zero.
        assert_eq!(Outputs::from(Value::Null).len(), 1);
    }
}
