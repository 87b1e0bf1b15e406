//! Behavior modifiers
//!
//! A modifier rewraps a block's compute function, changing how one
//! invocation maps onto calls of the underlying function. Modifier
//! parameters surface as option controls, so the wrapping is rebuilt from
//! the live option values on every execution.

use std::sync::Arc;

use blockflow_combine::{combine, CombineSpec, DataItem};
use blockflow_schema::{
    ArgMap, Args, ComputeFn, FunctionDescriptor, Outputs, ParamSpec, Value, ValueType,
};

use crate::errors::{FlowError, Result};

/// Rewraps a compute function with altered invocation semantics
pub trait Modifier: Send + Sync {
    /// Stable identifier, used in cache keys and provenance
    fn name(&self) -> &str;

    /// Parameters the modifier accepts, in display order
    fn params(&self) -> Vec<ParamSpec>;

    /// Signature of the wrapped function as seen by the block's ports
    fn wrapped_descriptor(&self, inner: &FunctionDescriptor) -> FunctionDescriptor;

    /// Wrap `compute` according to the supplied parameter values
    fn apply(
        &self,
        params: &ArgMap,
        inner: &FunctionDescriptor,
        compute: ComputeFn,
    ) -> Result<ComputeFn>;
}

/// Fans the wrapped function out over data sources and parameter grids.
///
/// The wrapped block gains one input port per data parameter plus a
/// `param_grids` port, and returns a single list: one element per
/// source/grid combination, each a `[provenance, value]` pair unless
/// `return_params` is off.
pub struct CombinationModifier {
    data_params: Vec<String>,
}

impl CombinationModifier {
    pub fn new(data_params: &[&str]) -> Self {
        CombinationModifier {
            data_params: data_params.iter().map(|&p| p.to_string()).collect(),
        }
    }

    fn combine_spec(&self, params: &ArgMap) -> Result<CombineSpec> {
        let mut spec = CombineSpec::new(self.data_params.clone());

        match params.get("zip_data") {
            None | Some(Value::Null) => {}
            Some(Value::Bool(zip)) => spec = spec.zip_all(*zip),
            Some(Value::Array(flags)) => {
                let flags = flags
                    .iter()
                    .map(|flag| {
                        flag.as_u64()
                            .and_then(|f| u32::try_from(f).ok())
                            .ok_or_else(|| {
                                FlowError::ModifierParam(
                                    "zip_data".to_string(),
                                    format!("flag '{flag}' is not a small non-negative integer"),
                                )
                            })
                    })
                    .collect::<Result<Vec<u32>>>()?;
                spec = spec.zip_flags(flags);
            }
            Some(other) => {
                return Err(FlowError::ModifierParam(
                    "zip_data".to_string(),
                    format!("expected a boolean or a list of group flags, got {other}"),
                ));
            }
        }

        spec = spec.zip_with_params(bool_param(params, "zip_data_with_params", false)?);
        spec.record_params = bool_param(params, "add_new_params", true)?;

        if let Some(suffix) = params.get("custom_suffix") {
            match suffix {
                Value::Null => {}
                Value::String(s) if s.is_empty() => {}
                Value::String(s) => spec = spec.suffix(s),
                other => {
                    return Err(FlowError::ModifierParam(
                        "custom_suffix".to_string(),
                        format!("expected a string, got {other}"),
                    ));
                }
            }
        }

        Ok(spec)
    }
}

impl Modifier for CombinationModifier {
    fn name(&self) -> &str {
        "data_combination"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            // bool, or a per-source list of zip group flags
            ParamSpec::with_default("zip_data", ValueType::Any, Value::Bool(false)),
            ParamSpec::with_default("zip_data_with_params", ValueType::Bool, Value::Bool(false)),
            ParamSpec::with_default("add_new_params", ValueType::Bool, Value::Bool(true)),
            ParamSpec::with_default("return_params", ValueType::Bool, Value::Bool(true)),
            ParamSpec::with_default("custom_suffix", ValueType::Str, Value::String(String::new())),
        ]
    }

    fn wrapped_descriptor(&self, inner: &FunctionDescriptor) -> FunctionDescriptor {
        let mut wrapped = FunctionDescriptor::new(inner.name.as_ref()).outputs(1);
        if let Some(docs) = &inner.docstring {
            wrapped = wrapped.docstring(docs);
        }
        for param in &self.data_params {
            wrapped = wrapped.param(param, ValueType::Any);
        }
        wrapped.param_with_default("param_grids", ValueType::Any, Value::Array(Vec::new()))
    }

    fn apply(
        &self,
        params: &ArgMap,
        inner: &FunctionDescriptor,
        compute: ComputeFn,
    ) -> Result<ComputeFn> {
        let spec = self.combine_spec(params)?;
        let return_params = bool_param(params, "return_params", true)?;
        let data_params = self.data_params.clone();
        let inner_params = inner.params.clone();
        let func_name = inner.name.to_string();

        Ok(Arc::new(move |args: &Args| {
            let sources: Vec<Vec<Value>> = data_params
                .iter()
                .map(|param| source_items(args.get(param)))
                .collect();
            let grids = grid_entries(args.get("param_grids"));

            let mut call = |named: &ArgMap| -> anyhow::Result<Value> {
                let outputs = compute(&Args::from_named(named.clone()))?;
                Ok(collapse_outputs(outputs))
            };
            let items = combine(
                &spec,
                &inner_params,
                &func_name,
                &sources,
                &grids,
                &mut call,
            )?;

            let values: Vec<Value> = if return_params {
                items.into_iter().map(DataItem::into_value).collect()
            } else {
                items.into_iter().map(|item| item.value).collect()
            };
            Ok(Outputs::single(Value::Array(values)))
        }))
    }
}

fn bool_param(params: &ArgMap, name: &str, default: bool) -> Result<bool> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(FlowError::ModifierParam(
            name.to_string(),
            format!("expected a boolean, got {other}"),
        )),
    }
}

/// Items of one data source port: a list contributes its elements, a single
/// value a singleton, an unconnected port nothing
fn source_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// Grid entries from the `param_grids` port: a single mapping or a list of
/// mappings; anything else contributes nothing
fn grid_entries(value: Option<&Value>) -> Vec<ArgMap> {
    match value {
        Some(Value::Object(entry)) => vec![entry.clone()],
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| entry.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Collapse a multi-output return into the single value the combination
/// engine tracks per call
fn collapse_outputs(outputs: Outputs) -> Value {
    let mut values = outputs.into_values();
    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inner_descriptor() -> FunctionDescriptor {
        FunctionDescriptor::new("scale")
            .param("data", ValueType::Any)
            .param_with_default("factor", ValueType::Int, json!(1))
    }

    fn scale_fn() -> ComputeFn {
        Arc::new(|args: &Args| {
            let data = args.get("data").and_then(Value::as_i64).unwrap_or(0);
            let factor = args.get("factor").and_then(Value::as_i64).unwrap_or(1);
            Ok(Outputs::single(json!(data * factor)))
        })
    }

    fn apply_default(modifier: &CombinationModifier) -> ComputeFn {
        modifier
            .apply(&ArgMap::new(), &inner_descriptor(), scale_fn())
            .unwrap()
    }

    #[test]
    fn wrapped_descriptor_exposes_data_and_grid_ports() {
        let modifier = CombinationModifier::new(&["data"]);
        let wrapped = modifier.wrapped_descriptor(&inner_descriptor());

        let names: Vec<&str> = wrapped.params.iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(names, ["data", "param_grids"]);
        assert_eq!(wrapped.output_arity, 1);
    }

    #[test]
    fn fans_out_over_source_and_grids() {
        let modifier = CombinationModifier::new(&["data"]);
        let wrapped = apply_default(&modifier);

        let mut named = ArgMap::new();
        named.insert("data".to_string(), json!([1, 2]));
        named.insert(
            "param_grids".to_string(),
            json!([{"factor": 10}, {"factor": 100}]),
        );

        let outputs = wrapped(&Args::from_named(named)).unwrap();
        assert_eq!(outputs.len(), 1);
        let results = outputs.values()[0].as_array().unwrap();
        assert_eq!(results.len(), 4);

        // each result is a [provenance, value] pair with the grid parameter
        // recorded under the function-name suffix
        assert_eq!(results[0], json!([{"factor_scale": 10}, 10]));
        assert_eq!(results[3], json!([{"factor_scale": 100}, 200]));
    }

    #[test]
    fn return_params_off_yields_plain_values() {
        let modifier = CombinationModifier::new(&["data"]);
        let mut params = ArgMap::new();
        params.insert("return_params".to_string(), json!(false));
        let wrapped = modifier
            .apply(&params, &inner_descriptor(), scale_fn())
            .unwrap();

        let mut named = ArgMap::new();
        named.insert("data".to_string(), json!([3, 4]));
        let outputs = wrapped(&Args::from_named(named)).unwrap();
        assert_eq!(outputs.values()[0], json!([3, 4]));
    }

    #[test]
    fn single_value_source_is_a_singleton() {
        let modifier = CombinationModifier::new(&["data"]);
        let wrapped = apply_default(&modifier);

        let mut named = ArgMap::new();
        named.insert("data".to_string(), json!(5));
        // the defaulted grid parameter still shows up in provenance
        let outputs = wrapped(&Args::from_named(named)).unwrap();
        assert_eq!(outputs.values()[0], json!([[{"factor_scale": 1}, 5]]));
    }

    #[test]
    fn bad_zip_flags_are_rejected() {
        let modifier = CombinationModifier::new(&["a", "b"]);
        let mut params = ArgMap::new();
        params.insert("zip_data".to_string(), json!("everything"));

        let err = modifier
            .apply(&params, &inner_descriptor(), scale_fn())
            .err()
            .unwrap();
        assert!(matches!(err, FlowError::ModifierParam(name, _) if name == "zip_data"));
    }

    #[test]
    fn custom_suffix_renames_provenance_keys() {
        let modifier = CombinationModifier::new(&["data"]);
        let mut params = ArgMap::new();
        params.insert("custom_suffix".to_string(), json!("run1"));
        let wrapped = modifier
            .apply(&params, &inner_descriptor(), scale_fn())
            .unwrap();

        let mut named = ArgMap::new();
        named.insert("data".to_string(), json!([1]));
        named.insert("param_grids".to_string(), json!({"factor": 2}));
        let outputs = wrapped(&Args::from_named(named)).unwrap();
        assert_eq!(outputs.values()[0], json!([[{"factor_run1": 2}, 2]]));
    }
}
