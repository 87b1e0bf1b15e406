//! Built-in blocks

use std::sync::Arc;

use blockflow_combine::GridExpander;
use blockflow_schema::{
    Args, BlockConfig, ComputeFn, FunctionDescriptor, Outputs, Value, ValueType,
};

use crate::block::Block;
use crate::builder::BlockBuilder;
use crate::errors::Result;

/// The grid-expansion panel: takes a grouped parameter-grid specification on
/// its input port and emits the expanded list of parameter dictionaries.
///
/// With `randomize_seeds` set, every `seed` field in the specification is
/// replaced by a freshly drawn random value before expansion, even when the
/// specification pins it. Pin seeds by leaving randomization off.
pub fn combinations_block(randomize_seeds: bool) -> Result<Block> {
    let descriptor = FunctionDescriptor::new("generate_combinations")
        .docstring("Expand a grouped grid specification into parameter dictionaries")
        .param("params", ValueType::Any);

    let expander = GridExpander::new(randomize_seeds);
    let compute: ComputeFn = Arc::new(move |args: &Args| {
        let spec = args.get("params").cloned().unwrap_or(Value::Null);
        let combos = expander.expand(&spec)?;
        Ok(Outputs::single(Value::Array(combos)))
    });

    let config = BlockConfig::from_json_str(
        r#"{
            "block_name": "Generate Combinations Panel",
            "input_names": {"params": "Input Dictionary"},
            "output_names": ["Combinations list of dicts"]
        }"#,
    )?;

    BlockBuilder::new(descriptor, compute)
        .config(config)
        .category("Parameters")
        .cache(false)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::ports::MemoryPorts;
    use serde_json::json;

    #[test]
    fn expands_the_input_dictionary() {
        let block = combinations_block(false).unwrap();
        let mut ports = MemoryPorts::new();
        ports.set_input(
            "Input Dictionary",
            json!({"x": {"from": 0, "to": 2, "step": 1}}),
        );

        let record = block
            .execute(&mut ExecutionContext::new(&mut ports))
            .unwrap();
        assert!(!record.outcome.is_err());
        assert_eq!(
            ports.output("Combinations list of dicts"),
            Some(&json!([{"x": 0}, {"x": 1}, {"x": 2}]))
        );
    }

    #[test]
    fn panel_schema_uses_configured_labels() {
        let block = combinations_block(false).unwrap();
        assert_eq!(block.name(), "Generate Combinations Panel");

        let inputs: Vec<&str> = block.schema().input_labels().map(|l| l.as_ref()).collect();
        assert_eq!(inputs, ["Input Dictionary"]);
    }
}
