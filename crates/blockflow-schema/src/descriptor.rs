//! Explicit function descriptors
//!
//! Adapted functions are paired with a descriptor declaring their parameters
//! and output arity once at registration time. The builder derives the whole
//! port/option schema from this declaration; nothing is discovered at run
//! time.

use crate::errors::SchemaError;
use crate::types::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single declared parameter of a compute function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: Arc<str>,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub variadic: bool,
}

impl ParamSpec {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        ParamSpec {
            name: Arc::from(name),
            value_type,
            default: None,
            variadic: false,
        }
    }

    pub fn with_default(name: &str, value_type: ValueType, default: Value) -> Self {
        ParamSpec {
            name: Arc::from(name),
            value_type,
            default: Some(default),
            variadic: false,
        }
    }

    pub fn variadic(name: &str) -> Self {
        ParamSpec {
            name: Arc::from(name),
            value_type: ValueType::Any,
            default: None,
            variadic: true,
        }
    }

    /// Whether the parameter must be supplied by the caller
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.variadic
    }
}

/// Statically-declared signature of a compute function: ordered parameters
/// plus the declared number of outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<Arc<str>>,
    pub params: Vec<ParamSpec>,
    pub output_arity: usize,
}

impl FunctionDescriptor {
    /// Start a descriptor with no parameters and a single output
    pub fn new(name: &str) -> Self {
        FunctionDescriptor {
            name: Arc::from(name),
            docstring: None,
            params: Vec::new(),
            output_arity: 1,
        }
    }

    pub fn docstring(mut self, docs: &str) -> Self {
        self.docstring = Some(Arc::from(docs));
        self
    }

    pub fn param(mut self, name: &str, value_type: ValueType) -> Self {
        self.params.push(ParamSpec::new(name, value_type));
        self
    }

    pub fn param_with_default(mut self, name: &str, value_type: ValueType, default: Value) -> Self {
        self.params
            .push(ParamSpec::with_default(name, value_type, default));
        self
    }

    pub fn variadic_param(mut self, name: &str) -> Self {
        self.params.push(ParamSpec::variadic(name));
        self
    }

    /// Declare the number of output values the function produces
    pub fn outputs(mut self, arity: usize) -> Self {
        self.output_arity = arity;
        self
    }

    /// Look up a parameter by name
    pub fn find_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name.as_ref() == name)
    }

    /// Check declaration invariants: unique parameter names and at most one
    /// variadic parameter
    pub fn validate(&self) -> Result<(), SchemaError> {
        let variadic_count = self.params.iter().filter(|p| p.variadic).count();
        if variadic_count > 1 {
            return Err(SchemaError::InvalidDescriptor(format!(
                "function '{}' declares {} variadic parameters, at most one is allowed",
                self.name, variadic_count
            )));
        }
        for (idx, param) in self.params.iter().enumerate() {
            if self.params[..idx].iter().any(|p| p.name == param.name) {
                return Err(SchemaError::InvalidDescriptor(format!(
                    "function '{}' declares parameter '{}' more than once",
                    self.name, param.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_builder_collects_params_in_order() {
        let desc = FunctionDescriptor::new("analyze")
            .param("data", ValueType::Any)
            .param_with_default("threshold", ValueType::Float, Value::from(0.5))
            .outputs(2);

        assert_eq!(desc.params.len(), 2);
        assert_eq!(desc.params[0].name.as_ref(), "data");
        assert!(desc.params[0].is_required());
        assert!(!desc.params[1].is_required());
        assert_eq!(desc.output_arity, 2);
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn duplicate_params_are_rejected() {
        let desc = FunctionDescriptor::new("f")
            .param("x", ValueType::Int)
            .param("x", ValueType::Float);
        assert!(desc.validate().is_err());
    }

    #[test]
    fn two_variadic_params_are_rejected() {
        let desc = FunctionDescriptor::new("f")
            .variadic_param("sources")
            .variadic_param("more");
        assert!(desc.validate().is_err());
    }
}
