//! Declarative block configuration
//!
//! A `BlockConfig` refines the schema derived from a function descriptor:
//! custom block/port names, which parameters become options, output labels,
//! docstring overrides and the cache default. Configs can be loaded from a
//! JSON file placed next to the host application and merged with
//! programmatic overrides; unrecognized keys are ignored.

use crate::errors::SchemaError;
use crate::types::{ControlType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration of a single option control
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionConfig {
    /// Parameter the option binds to
    pub param: String,
    /// UI label override; defaults to the parameter name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicit control type; absent means `auto` (resolved from the
    /// parameter's declared value type)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlType>,
    /// Default value override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Items for select controls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
}

impl OptionConfig {
    pub fn new(param: &str) -> Self {
        OptionConfig {
            param: param.to_string(),
            ..Default::default()
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.param)
    }
}

/// Declarative configuration for one block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Parameter name -> port label. For a variadic parameter, every key
    /// prefixed by the parameter's name contributes one labeled port, in
    /// lexicographic key order regardless of the order in the JSON file
    /// (`parts_10` sorts before `parts_2`; use zero-padded or alphabetic
    /// suffixes when more than nine ports are needed).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_names: BTreeMap<String, String>,
    /// Ordered output labels; clamped/padded to the declared output arity
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_names: Vec<String>,
    /// Parameters exposed as option controls instead of input ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionConfig>,
    /// Options for the behavior modifier's visible parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifier_options: Vec<OptionConfig>,
    /// Cache default override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
}

impl BlockConfig {
    pub fn new() -> Self {
        BlockConfig::default()
    }

    /// Load a config from a JSON file. A missing file is not an error; it
    /// yields the empty config, matching the optional per-function
    /// `<name>.json` convention.
    pub fn from_json_file(path: &Path) -> Result<Self, SchemaError> {
        if !path.exists() {
            return Ok(BlockConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Overlay `overrides` on top of `self`: set fields and non-empty
    /// collections in `overrides` win.
    pub fn merge(mut self, overrides: BlockConfig) -> Self {
        if overrides.block_name.is_some() {
            self.block_name = overrides.block_name;
        }
        if overrides.category.is_some() {
            self.category = overrides.category;
        }
        if overrides.docstring.is_some() {
            self.docstring = overrides.docstring;
        }
        self.input_names.extend(overrides.input_names);
        if !overrides.output_names.is_empty() {
            self.output_names = overrides.output_names;
        }
        if !overrides.options.is_empty() {
            self.options = overrides.options;
        }
        if !overrides.modifier_options.is_empty() {
            self.modifier_options = overrides.modifier_options;
        }
        if overrides.cache.is_some() {
            self.cache = overrides.cache;
        }
        self
    }

    /// Whether a parameter is configured as an option
    pub fn is_option(&self, param: &str) -> bool {
        self.options.iter().any(|opt| opt.param == param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_and_ignores_unknown_keys() {
        let config = BlockConfig::from_json_str(
            r#"{
                "block_name": "Generate Combinations Panel",
                "output_names": ["Combinations list of dicts"],
                "input_names": {"params": "Input Dictionary"},
                "options": [
                    {"param": "config_str", "type": "input", "name": "Config"},
                    {"param": "overwrite", "type": "checkbox", "value": false}
                ],
                "some_future_key": 17
            }"#,
        )
        .unwrap();

        assert_eq!(config.block_name.as_deref(), Some("Generate Combinations Panel"));
        assert_eq!(config.input_names.get("params").map(String::as_str), Some("Input Dictionary"));
        assert_eq!(config.options.len(), 2);
        assert_eq!(config.options[0].label(), "Config");
        assert!(config.is_option("overwrite"));
        assert!(!config.is_option("params"));
    }

    #[test]
    fn merge_prefers_overrides() {
        let base = BlockConfig::from_json_str(r#"{"block_name": "a", "cache": true}"#).unwrap();
        let overrides = BlockConfig {
            block_name: Some("b".to_string()),
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.block_name.as_deref(), Some("b"));
        assert_eq!(merged.cache, Some(true));
    }

    #[test]
    fn missing_config_file_yields_empty_config() {
        let config =
            BlockConfig::from_json_file(Path::new("/nonexistent/block.json")).unwrap();
        assert!(config.block_name.is_none());
        assert!(config.options.is_empty());
    }
}
