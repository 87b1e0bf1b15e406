//! Execution context
//!
//! The port-value provider and the cache store are handed to every
//! `Block::execute` call through an explicit context instead of living in
//! ambient session state.

use crate::cache::CacheStore;
use crate::ports::PortProvider;

/// Everything a block needs from its host for one invocation
pub struct ExecutionContext<'a> {
    pub ports: &'a mut dyn PortProvider,
    pub cache: Option<&'a CacheStore>,
}

impl<'a> ExecutionContext<'a> {
    /// Context without a cache store; cache-enabled blocks execute uncached
    pub fn new(ports: &'a mut dyn PortProvider) -> Self {
        ExecutionContext { ports, cache: None }
    }

    pub fn with_cache(ports: &'a mut dyn PortProvider, cache: &'a CacheStore) -> Self {
        ExecutionContext {
            ports,
            cache: Some(cache),
        }
    }
}
