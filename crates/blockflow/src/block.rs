//! Executable blocks
//!
//! A `Block` pairs the declarative schema with everything needed to run the
//! adapted function: the inner descriptor, the option specs feeding its
//! parameters, an optional behavior modifier and the compute function
//! itself. Execution resolves live port/option values, optionally consults
//! the cache and publishes one value per declared output.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use blockflow_logger as logger;
use blockflow_schema::{ArgMap, Args, BlockSchema, ComputeFn, FunctionDescriptor, OptionSpec,
    PortLabels, Value};

use crate::builder::CACHE_OPTION_LABEL;
use crate::cache::CacheStore;
use crate::context::ExecutionContext;
use crate::errors::{FlowError, Result};
use crate::modifier::Modifier;

/// A modifier together with its construction-time parameters and the option
/// specs exposing some of them to the user
pub(crate) struct ModifierBinding {
    pub(crate) modifier: Arc<dyn Modifier>,
    pub(crate) base_params: ArgMap,
    pub(crate) option_specs: Vec<OptionSpec>,
}

/// An adapted function, ready to execute against a port provider
pub struct Block {
    pub(crate) schema: BlockSchema,
    pub(crate) inner_descriptor: FunctionDescriptor,
    /// Options feeding function parameters; display-only and cache options
    /// live in the schema but not here
    pub(crate) option_specs: Vec<OptionSpec>,
    pub(crate) modifier: Option<ModifierBinding>,
    pub(crate) static_compute: ComputeFn,
    pub(crate) static_identity: String,
    pub(crate) cache_default: bool,
    pub(crate) cache_visible: bool,
}

/// How one execution ended
#[derive(Debug)]
pub enum Outcome {
    /// The produced output values, in declared order
    Computed(Vec<Value>),
    /// The compute function failed or produced too few outputs
    Errored(FlowError),
}

impl Outcome {
    pub fn is_err(&self) -> bool {
        matches!(self, Outcome::Errored(_))
    }

    pub fn outputs(&self) -> Option<&[Value]> {
        match self {
            Outcome::Computed(values) => Some(values),
            Outcome::Errored(_) => None,
        }
    }
}

/// Everything recorded about one block execution
#[derive(Debug)]
pub struct ExecutionRecord {
    /// Named input values as resolved from the ports
    pub inputs: ArgMap,
    /// Flattened variadic input values, in port order
    pub positional: Vec<Value>,
    /// Option values as resolved from the controls
    pub options: ArgMap,
    /// Whether the result came from the cache
    pub cached: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl Block {
    pub fn schema(&self) -> &BlockSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Execute the block once.
    ///
    /// Inputs are read from the context's port provider; an unconnected
    /// port contributes a JSON null, so the positional arity always equals
    /// the declared variadic port count. Missing option values fall back to the schema
    /// defaults. A compute failure or an output-arity shortfall ends in an
    /// `Outcome::Errored` record; only cache I/O failures abort with `Err`.
    pub fn execute(&self, ctx: &mut ExecutionContext) -> Result<ExecutionRecord> {
        let mut named = ArgMap::new();
        let mut positional = Vec::new();
        let mut inputs = ArgMap::new();

        for input in &self.schema.inputs {
            match &input.labels {
                PortLabels::Single(label) => {
                    let value = ctx.ports.input(label).unwrap_or(Value::Null);
                    inputs.insert(input.param.to_string(), value.clone());
                    named.insert(input.param.to_string(), value);
                }
                PortLabels::Variadic(labels) => {
                    for label in labels {
                        positional.push(ctx.ports.input(label).unwrap_or(Value::Null));
                    }
                }
            }
        }

        let mut options = ArgMap::new();
        for spec in &self.option_specs {
            let value = ctx
                .ports
                .option(&spec.label)
                .unwrap_or_else(|| spec.value.clone());
            options.insert(spec.param.to_string(), value.clone());
            named.insert(spec.param.to_string(), value);
        }

        let use_cache = if self.cache_visible {
            ctx.ports
                .option(CACHE_OPTION_LABEL)
                .and_then(|v| v.as_bool())
                .unwrap_or(self.cache_default)
        } else {
            self.cache_default
        };

        let (compute, identity) = self.resolve_compute(ctx)?;
        let args = Args { positional, named };

        logger::spinner_start(&format!("Running {}", self.schema.name));
        let started_at = Utc::now();
        let timer = Instant::now();

        let computed = match self.invoke(&compute, &identity, &args, ctx.cache, use_cache) {
            Ok(done) => done,
            Err(err) => {
                logger::spinner_error(&format!("{} failed: {err}", self.schema.name));
                return Err(err);
            }
        };
        let elapsed = timer.elapsed();

        let (result, cached) = match computed {
            Ok((values, cached)) => (Ok(values), cached),
            Err(err) => (Err(err), false),
        };

        let declared = self.schema.outputs.len();
        let outcome = match result {
            Ok(values) if values.len() < declared => Outcome::Errored(FlowError::ShapeMismatch {
                declared,
                produced: values.len(),
            }),
            Ok(values) => {
                // excess values beyond the declared arity are dropped
                for (label, value) in self.schema.outputs.iter().zip(&values) {
                    ctx.ports.set_output(label, value.clone());
                }
                Outcome::Computed(values)
            }
            Err(err) => Outcome::Errored(err),
        };

        match &outcome {
            Outcome::Computed(_) => logger::spinner_success(&format!(
                "{} finished in {}",
                self.schema.name,
                logger::format_duration(elapsed.as_nanos())
            )),
            Outcome::Errored(err) => {
                logger::spinner_error(&format!("{} failed: {err}", self.schema.name));
            }
        }

        Ok(ExecutionRecord {
            inputs,
            positional: args.positional,
            options,
            cached,
            started_at,
            elapsed,
            outcome,
        })
    }

    /// Build the effective compute function and its cache identity. With a
    /// live modifier the wrapping is rebuilt from the current option values;
    /// otherwise the statically-prepared function is used.
    fn resolve_compute(&self, ctx: &mut ExecutionContext) -> Result<(ComputeFn, String)> {
        let Some(binding) = &self.modifier else {
            return Ok((self.static_compute.clone(), self.static_identity.clone()));
        };

        let mut params = binding.base_params.clone();
        for spec in &binding.option_specs {
            let value = ctx
                .ports
                .option(&spec.label)
                .unwrap_or_else(|| spec.value.clone());
            params.insert(spec.param.to_string(), value);
        }

        let compute = binding
            .modifier
            .apply(&params, &self.inner_descriptor, self.static_compute.clone())?;
        let identity = modifier_identity(
            &self.inner_descriptor,
            binding.modifier.name(),
            &params,
        )?;
        Ok((compute, identity))
    }

    /// Cache lookup, compute, cache store. Compute failures come back in the
    /// inner result so the caller can record them; cache failures propagate.
    #[allow(clippy::type_complexity)]
    fn invoke(
        &self,
        compute: &ComputeFn,
        identity: &str,
        args: &Args,
        cache: Option<&CacheStore>,
        use_cache: bool,
    ) -> Result<std::result::Result<(Vec<Value>, bool), FlowError>> {
        let store = cache.filter(|_| use_cache);
        let key = match store {
            Some(store) => Some(store.key(identity, args)?),
            None => None,
        };

        if let (Some(store), Some(key)) = (store, key.as_deref()) {
            if let Some(Value::Array(values)) = store.get(key)? {
                logger::debug(&format!("cache hit for {}", self.schema.name));
                return Ok(Ok((values, true)));
            }
        }

        let values = match compute(args) {
            Ok(outputs) => outputs.into_values(),
            Err(err) => return Ok(Err(FlowError::Compute(err))),
        };

        if let (Some(store), Some(key)) = (store, key.as_deref()) {
            store.put(key, &Value::Array(values.clone()))?;
        }
        Ok(Ok((values, false)))
    }
}

/// Cache identity of a modifier-wrapped function: the inner function name,
/// the modifier name and the full modifier parameter map
pub(crate) fn modifier_identity(
    inner: &FunctionDescriptor,
    modifier_name: &str,
    params: &ArgMap,
) -> Result<String> {
    Ok(format!(
        "{}::{}::{}",
        inner.name,
        modifier_name,
        serde_json::to_string(params)?
    ))
}
