//! Block synthesis
//!
//! `BlockBuilder` turns a `FunctionDescriptor` plus an optional
//! `BlockConfig` into an executable `Block`: parameters become input ports
//! unless configured as options, outputs get labels clamped to the declared
//! arity, and option controls are assembled in a fixed order (cache toggle,
//! documentation, function options, modifier options).

use std::sync::Arc;

use smallvec::SmallVec;

use blockflow_logger as logger;
use blockflow_schema::{
    ArgMap, Args, BlockConfig, BlockSchema, ComputeFn, ControlType, FunctionDescriptor, InputPort,
    OptionConfig, OptionSpec, Outputs, ParamSpec, PortLabels, SchemaError, Value,
};

use crate::block::{modifier_identity, Block, ModifierBinding};
use crate::errors::{FlowError, Result};
use crate::modifier::Modifier;

/// Label of the synthesized cache toggle option
pub const CACHE_OPTION_LABEL: &str = "Cache Block";

/// Builds a `Block` from a function descriptor and declarative configuration
pub struct BlockBuilder {
    descriptor: FunctionDescriptor,
    compute: ComputeFn,
    config: BlockConfig,
    category: Option<String>,
    cache: bool,
    cache_visible: bool,
    show_docs: bool,
    modifier: Option<(Arc<dyn Modifier>, ArgMap, Vec<String>)>,
}

impl BlockBuilder {
    pub fn new(descriptor: FunctionDescriptor, compute: ComputeFn) -> Self {
        BlockBuilder {
            descriptor,
            compute,
            config: BlockConfig::default(),
            category: None,
            cache: true,
            cache_visible: true,
            show_docs: true,
            modifier: None,
        }
    }

    /// Adapt a plain closure; the output arity comes from the return shape's
    /// `Outputs` conversion
    pub fn from_fn<F, O>(descriptor: FunctionDescriptor, func: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Into<Outputs>,
    {
        let compute: ComputeFn = Arc::new(move |args| func(args).map(Into::into));
        BlockBuilder::new(descriptor, compute)
    }

    pub fn config(mut self, config: BlockConfig) -> Self {
        self.config = config;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Default cache setting; overridden by the config and, when the toggle
    /// is visible, by the user
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache_visible(mut self, visible: bool) -> Self {
        self.cache_visible = visible;
        self
    }

    /// Whether to render the docstring as display options
    pub fn show_docs(mut self, show: bool) -> Self {
        self.show_docs = show;
        self
    }

    /// Attach a behavior modifier. `base_params` fixes modifier parameters at
    /// build time; parameters named in `visible` surface as option controls
    /// instead and are resolved per execution.
    pub fn modifier(
        mut self,
        modifier: Arc<dyn Modifier>,
        base_params: ArgMap,
        visible: &[&str],
    ) -> Self {
        self.modifier = Some((
            modifier,
            base_params,
            visible.iter().map(|&name| name.to_string()).collect(),
        ));
        self
    }

    pub fn build(self) -> Result<Block> {
        self.descriptor.validate()?;

        let port_descriptor = match &self.modifier {
            Some((modifier, _, _)) => modifier.wrapped_descriptor(&self.descriptor),
            None => self.descriptor.clone(),
        };

        let name: Arc<str> = match &self.config.block_name {
            Some(name) => Arc::from(name.as_str()),
            None => Arc::from(format!("{}_block", self.descriptor.name)),
        };
        let category: Arc<str> = self
            .config
            .category
            .as_deref()
            .or(self.category.as_deref())
            .map_or_else(|| Arc::from("Uncategorized"), Arc::from);
        let docstring: Option<Arc<str>> = self
            .config
            .docstring
            .as_deref()
            .map(Arc::from)
            .or_else(|| port_descriptor.docstring.clone());
        let cache_default = self.config.cache.unwrap_or(self.cache);

        let inputs = build_inputs(&port_descriptor, &self.config);
        let outputs = build_outputs(&port_descriptor, &self.config);

        let mut schema_options = Vec::new();
        let mut function_options = Vec::new();

        if self.cache_visible {
            schema_options.push(OptionSpec {
                param: Arc::from("__cache__"),
                label: Arc::from(CACHE_OPTION_LABEL),
                control: ControlType::Checkbox,
                value: Value::Bool(cache_default),
                items: None,
            });
        }

        if self.show_docs {
            if let Some(docs) = docstring.as_deref().filter(|d| !d.is_empty()) {
                let ruler = "-".repeat(9);
                schema_options.push(OptionSpec::display(
                    "display_line_1",
                    &format!("{ruler} Documentation {ruler}"),
                ));
                schema_options.push(OptionSpec::display("display_option", docs));
                schema_options.push(OptionSpec::display("display_line_2", &"-".repeat(38)));
            }
        }

        for opt_config in &self.config.options {
            let Some(param) = port_descriptor.find_param(&opt_config.param) else {
                logger::debug(&format!(
                    "option '{}' matches no parameter of '{}', skipping",
                    opt_config.param, port_descriptor.name
                ));
                continue;
            };
            if param.variadic {
                return Err(FlowError::Schema(SchemaError::InvalidOption(
                    opt_config.param.clone(),
                    "variadic parameters cannot be options".to_string(),
                )));
            }
            let spec = option_spec(opt_config, param, None);
            function_options.push(spec.clone());
            schema_options.push(spec);
        }

        let mut binding = None;
        let mut static_compute = self.compute;
        let mut static_identity = self.descriptor.name.to_string();

        if let Some((modifier, base_params, visible)) = self.modifier {
            if visible.is_empty() {
                // fully-fixed modifier: wrap once at build time
                static_identity =
                    modifier_identity(&self.descriptor, modifier.name(), &base_params)?;
                static_compute = modifier.apply(&base_params, &self.descriptor, static_compute)?;
            } else {
                let declared = modifier.params();
                let mut modifier_options = Vec::new();

                schema_options.push(OptionSpec::display(
                    "display_line_3",
                    "== Modifier parameters ==",
                ));
                for name in &visible {
                    let Some(param) = declared.iter().find(|p| p.name.as_ref() == name.as_str())
                    else {
                        return Err(FlowError::ModifierParam(
                            name.clone(),
                            format!("modifier '{}' has no such parameter", modifier.name()),
                        ));
                    };
                    let opt_config = self
                        .config
                        .modifier_options
                        .iter()
                        .find(|opt| opt.param == *name)
                        .cloned()
                        .unwrap_or_else(|| OptionConfig::new(name));
                    let spec = option_spec(&opt_config, param, base_params.get(name.as_str()));
                    modifier_options.push(spec.clone());
                    schema_options.push(spec);
                }
                schema_options.push(OptionSpec::display("display_line_4", &"=".repeat(19)));

                binding = Some(ModifierBinding {
                    modifier,
                    base_params,
                    option_specs: modifier_options,
                });
            }
        }

        Ok(Block {
            schema: BlockSchema {
                name,
                category,
                docstring,
                inputs,
                outputs,
                options: schema_options,
            },
            inner_descriptor: self.descriptor,
            option_specs: function_options,
            modifier: binding,
            static_compute,
            static_identity,
            cache_default,
            cache_visible: self.cache_visible,
        })
    }
}

/// Parameters become input ports unless configured as options. A variadic
/// parameter expands into one port per matching `input_names` key; with no
/// matches it keeps a single port under its own name.
fn build_inputs(descriptor: &FunctionDescriptor, config: &BlockConfig) -> Vec<InputPort> {
    descriptor
        .params
        .iter()
        .filter(|param| !config.is_option(&param.name))
        .map(|param| {
            let labels = if param.variadic {
                let labels: SmallVec<[Arc<str>; 4]> = config
                    .input_names
                    .iter()
                    .filter(|(key, _)| key.starts_with(param.name.as_ref()))
                    .map(|(_, label)| Arc::from(label.as_str()))
                    .collect();
                if labels.is_empty() {
                    PortLabels::Variadic([Arc::clone(&param.name)].into_iter().collect())
                } else {
                    PortLabels::Variadic(labels)
                }
            } else {
                let label = config
                    .input_names
                    .get(param.name.as_ref())
                    .map_or_else(|| Arc::clone(&param.name), |name| Arc::from(name.as_str()));
                PortLabels::Single(label)
            };
            InputPort {
                param: Arc::clone(&param.name),
                labels,
            }
        })
        .collect()
}

/// Configured labels clamped to the declared arity, padded with `output_N`
fn build_outputs(descriptor: &FunctionDescriptor, config: &BlockConfig) -> Vec<Arc<str>> {
    (0..descriptor.output_arity)
        .map(|idx| {
            config
                .output_names
                .get(idx)
                .map_or_else(|| Arc::from(format!("output_{}", idx + 1)), |name| {
                    Arc::from(name.as_str())
                })
        })
        .collect()
}

/// Resolve one option control: explicit control type or the parameter's
/// mapped default, value from config, then a binding override, then the
/// parameter default, then the control's own default
fn option_spec(config: &OptionConfig, param: &ParamSpec, binding: Option<&Value>) -> OptionSpec {
    let control = config.control.unwrap_or_else(|| param.value_type.control());
    let items: Option<Arc<[Value]>> = config
        .items
        .as_deref()
        .map(|items| items.to_vec().into());
    let value = config
        .value
        .clone()
        .or_else(|| binding.cloned())
        .or_else(|| param.default.clone())
        .unwrap_or_else(|| control.default_value(items.as_deref()));

    OptionSpec {
        param: Arc::clone(&param.name),
        label: Arc::from(config.label()),
        control,
        value,
        items,
    }
}
