//! Block registry
//!
//! Hosts register their adapted blocks once and look them up by name when
//! the editor instantiates a node.

use ahash::AHashMap;
use std::sync::Arc;

use blockflow_logger as logger;

use crate::block::Block;

/// Name-indexed collection of registered blocks
#[derive(Default)]
pub struct BlockRegistry {
    blocks: AHashMap<Arc<str>, Arc<Block>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        BlockRegistry::default()
    }

    /// Register a block under its schema name, replacing (with a warning) any
    /// previous block of the same name
    pub fn register(&mut self, block: Block) -> Arc<Block> {
        let block = Arc::new(block);
        let name = Arc::clone(&block.schema().name);
        if self
            .blocks
            .insert(Arc::clone(&name), Arc::clone(&block))
            .is_some()
        {
            logger::warn(&format!("block '{name}' was already registered, replacing"));
        }
        block
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Block>> {
        self.blocks.get(name)
    }

    /// Registered block names, sorted for stable display
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.blocks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Blocks in a category, sorted by name
    pub fn by_category(&self, category: &str) -> Vec<&Arc<Block>> {
        let mut blocks: Vec<&Arc<Block>> = self
            .blocks
            .values()
            .filter(|block| block.schema().category.as_ref() == category)
            .collect();
        blocks.sort_by(|a, b| a.schema().name.cmp(&b.schema().name));
        blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BlockBuilder;
    use blockflow_schema::{ComputeFn, FunctionDescriptor, Outputs, Value};
    use std::sync::Arc as StdArc;

    fn block(name: &str, category: &str) -> Block {
        let compute: ComputeFn = StdArc::new(|_| Ok(Outputs::single(Value::Null)));
        BlockBuilder::new(FunctionDescriptor::new(name), compute)
            .category(category)
            .build()
            .unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = BlockRegistry::new();
        registry.register(block("alpha", "Math"));
        registry.register(block("beta", "Math"));
        registry.register(block("gamma", "IO"));

        assert_eq!(registry.len(), 3);
        assert!(registry.get("alpha_block").is_some());
        assert!(registry.get("missing").is_none());

        let math: Vec<&str> = registry
            .by_category("Math")
            .iter()
            .map(|b| b.name())
            .collect();
        assert_eq!(math, ["alpha_block", "beta_block"]);
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = BlockRegistry::new();
        registry.register(block("alpha", "Math"));
        let replacement = registry.register(block("alpha", "IO"));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("alpha_block").map(|b| b.schema().category.as_ref()),
            Some(replacement.schema().category.as_ref())
        );
    }
}
